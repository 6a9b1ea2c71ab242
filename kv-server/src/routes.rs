use std::sync::Arc;

use clap::crate_version;
use kv_core::k8s::ClusterClient;
use kv_core::prelude::*;
use kv_watch::stream::{
    self,
    Frame,
};
use kv_watch::{
    Broker,
    NamespacePolicy,
    NamespaceSnapshot,
    SnapshotAggregator,
    SnapshotError,
    ViewerConfig,
};
use rocket::response::stream::{
    Event,
    EventStream,
};
use rocket::serde::json::Json;
use rocket::{
    Build,
    FromForm,
    Rocket,
    Shutdown,
    State,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::*;

use crate::errors::ApiError;

pub struct AppState {
    broker: Broker,
    client: Arc<dyn ClusterClient>,
    policy: NamespacePolicy,
    aggregator: SnapshotAggregator,
    info: ServerInfo,
}

impl AppState {
    pub fn new(client: Arc<dyn ClusterClient>, config: &ViewerConfig, broker: Broker) -> anyhow::Result<AppState> {
        Ok(AppState {
            broker,
            policy: config.namespace_policy()?,
            aggregator: SnapshotAggregator::new(client.clone(), config),
            info: ServerInfo {
                cluster_host: client.host(),
                version: crate_version!().into(),
                single_namespace: config.single_namespace.clone(),
                namespace_filter: config.namespace_filter.clone(),
            },
            client,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    cluster_host: String,
    version: String,
    single_namespace: String,
    namespace_filter: String,
}

#[derive(Debug, FromForm)]
pub struct UpdatesQuery {
    #[field(name = "clientID")]
    client_id: Option<String>,
}

pub fn build_server(rkt_config: &rocket::Config, state: AppState) -> Rocket<Build> {
    rocket::custom(rkt_config)
        .mount("/", rocket::routes![updates, namespaces, fetch_data, config, health])
        .manage(state)
}

// Each connection gets its own pump task; the rocket side of the connection just drains the
// frames the pump hands it.  The pump is cancelled when rocket shuts down or when the response
// body is dropped (i.e., the browser went away).
#[rocket::get("/updates?<query..>")]
async fn updates(query: UpdatesQuery, state: &State<AppState>, shutdown: Shutdown) -> Result<EventStream![], ApiError> {
    let registration = stream::open(&state.broker, query.client_id.as_deref().unwrap_or_default())?;

    let (mut tx, mut rx) = mpsc::channel::<Frame>(1);
    let conn_tx = tx.clone();
    tokio::spawn(async move {
        let cancel = async move {
            tokio::select! {
                _ = shutdown => (),
                _ = conn_tx.closed() => (),
            }
        };
        let exit = stream::pump(registration, &mut tx, cancel).await;
        debug!("update stream finished: {exit:?}");
    });

    Ok(EventStream! {
        while let Some(frame) = rx.recv().await {
            yield Event::data(frame.data).event(frame.event);
        }
    })
}

#[rocket::get("/namespaces")]
#[instrument(skip_all)]
async fn namespaces(state: &State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let namespaces = state.policy.visible_namespaces(state.client.as_ref()).await?;
    Ok(Json(namespaces))
}

#[rocket::get("/fetchData?<namespace>")]
#[instrument(skip(state))]
async fn fetch_data(namespace: Option<String>, state: &State<AppState>) -> Result<Json<NamespaceSnapshot>, ApiError> {
    let ns = namespace.unwrap_or_default();
    if ns.is_empty() {
        return Err(SnapshotError::empty_namespace(&ns).into());
    }

    // The restriction is checked before the aggregator gets anywhere near the cluster
    state.policy.check(&ns)?;
    let snapshot = state.aggregator.fetch(&ns).await?;
    Ok(Json(snapshot))
}

#[rocket::get("/config")]
fn config(state: &State<AppState>) -> Json<ServerInfo> {
    Json(state.info.clone())
}

#[rocket::get("/health")]
fn health() -> &'static str {
    "OK"
}
