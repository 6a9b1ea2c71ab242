use std::future::Future;

use async_trait::async_trait;
use kv_core::errors::*;
use tokio::sync::mpsc;
use tracing::*;

use crate::broker::{
    Broker,
    Registration,
};
use crate::event::CanonicalEvent;

err_impl! {StreamError,
    #[error("clientID is required")]
    MissingClientId(String),
}

const ERROR_EVENT_NAME: &str = "error";

// One server-sent event on the wire: the event name plus a JSON payload (empty for pings).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

impl Frame {
    pub fn from_event(evt: &CanonicalEvent) -> Frame {
        let data = match &evt.obj {
            None => Ok(String::new()),
            Some(obj) => serde_json::to_string(obj),
        };

        match data {
            Ok(data) => Frame { event: evt.kind.wire_name().into(), data },
            Err(err) => {
                error!("could not serialize {:?} event: {err}", evt.kind);
                Frame {
                    event: ERROR_EVENT_NAME.into(),
                    data: "Error marshalling object".into(),
                }
            },
        }
    }
}

// The write half of one external connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: Frame) -> EmptyResult;
}

#[async_trait]
impl FrameSink for mpsc::Sender<Frame> {
    async fn send_frame(&mut self, frame: Frame) -> EmptyResult {
        self.send(frame).await.map_err(|_| anyhow!("connection closed"))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PumpExit {
    Cancelled,
    SinkClosed,
    BrokerClosed,
}

// Validates the client id and registers it with the broker; an empty id never reaches the
// registry.
pub fn open(broker: &Broker, client_id: &str) -> anyhow::Result<Registration> {
    if client_id.trim().is_empty() {
        bail!(StreamError::missing_client_id(client_id));
    }

    info!("stream client connected: {client_id}");
    Ok(broker.register(client_id))
}

// Pumps events from the client's outbox onto the sink until the connection is cancelled, a write
// fails, or the broker releases the client.  The registration is consumed, so it is always
// deregistered by the time this returns.
pub async fn pump<S, F>(mut registration: Registration, sink: &mut S, cancel: F) -> PumpExit
where
    S: FrameSink + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(cancel);

    let exit = loop {
        let evt = tokio::select! {
            biased;
            _ = &mut cancel => break PumpExit::Cancelled,
            maybe_evt = registration.recv() => match maybe_evt {
                Some(evt) => evt,
                None => break PumpExit::BrokerClosed,
            },
        };

        let frame = Frame::from_event(&evt);
        tokio::select! {
            biased;
            _ = &mut cancel => break PumpExit::Cancelled,
            res = sink.send_frame(frame) => if let Err(err) = res {
                debug!("write to client {} failed: {err}", registration.client_id());
                break PumpExit::SinkClosed;
            },
        }
    };

    info!("stream client disconnected: {} ({exit:?})", registration.client_id());
    drop(registration);
    exit
}
