use std::collections::HashMap;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::*;

use crate::event::CanonicalEvent;

pub type SharedEvent = Arc<CanonicalEvent>;

const DROPPED_DELIVERIES_METRIC: &str = "kubeview_dropped_deliveries_total";
const CONNECTED_CLIENTS_METRIC: &str = "kubeview_connected_clients";

struct ClientEntry {
    client_id: String,
    outbox_tx: mpsc::Sender<SharedEvent>,
}

struct BrokerInner {
    clients: Mutex<HashMap<u64, ClientEntry>>,
    next_key: AtomicU64,
    buffer_size: usize,
}

// The broker is the process-wide fan-out hub.  It is constructed once in main and then handed
// (cloned) to the watchers, the heartbeat task, and the stream handlers.
//
// Every registered client gets its own bounded outbox.  Delivery never waits on a client: if an
// outbox is full the event is dropped for that client only, and if the receiving end is gone the
// entry is pruned.  Because sends are non-blocking we can hold the registry lock for the whole
// broadcast, so a broadcast never sees a half-updated registry.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    pub fn new(buffer_size: usize) -> Broker {
        Broker {
            inner: Arc::new(BrokerInner {
                clients: Mutex::new(HashMap::new()),
                next_key: AtomicU64::new(0),
                buffer_size: buffer_size.max(1),
            }),
        }
    }

    // Client ids are caller-chosen metadata, not a uniqueness key; registering the same id twice
    // produces two independent registrations.
    pub fn register(&self, client_id: &str) -> Registration {
        let key = self.inner.next_key.fetch_add(1, Ordering::Relaxed);
        let (outbox_tx, outbox_rx) = mpsc::channel(self.inner.buffer_size);

        let count = {
            let mut clients = self.clients();
            clients.insert(key, ClientEntry { client_id: client_id.into(), outbox_tx });
            clients.len()
        };
        metrics::gauge!(CONNECTED_CLIENTS_METRIC).set(count as f64);
        debug!("registered client {client_id} (key {key}); {count} clients connected");

        Registration {
            key,
            client_id: client_id.into(),
            outbox_rx,
            broker: self.clone(),
        }
    }

    // Returns true if something was actually removed; calling this for a key that isn't (or is no
    // longer) registered is a no-op.
    pub fn deregister(&self, key: u64) -> bool {
        let (removed, count) = {
            let mut clients = self.clients();
            (clients.remove(&key), clients.len())
        };
        match removed {
            Some(entry) => {
                metrics::gauge!(CONNECTED_CLIENTS_METRIC).set(count as f64);
                debug!("deregistered client {} (key {key}); {count} clients connected", entry.client_id);
                true
            },
            None => false,
        }
    }

    // Returns the number of clients the event was queued for.
    pub fn broadcast(&self, evt: CanonicalEvent) -> usize {
        let evt = Arc::new(evt);
        let mut delivered = 0;
        let mut clients = self.clients();

        clients.retain(|key, entry| match entry.outbox_tx.try_send(evt.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            },
            Err(TrySendError::Full(_)) => {
                debug!("outbox for client {} (key {key}) is full, dropping {:?} event", entry.client_id, evt.kind);
                metrics::counter!(DROPPED_DELIVERIES_METRIC).increment(1);
                true
            },
            Err(TrySendError::Closed(_)) => {
                debug!("outbox for client {} (key {key}) is closed, removing it", entry.client_id);
                false
            },
        });

        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients().len()
    }

    pub fn start_heartbeat(&self, interval: Duration) -> JoinHandle<()> {
        let broker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                broker.broadcast(CanonicalEvent::heartbeat());
            }
        })
    }

    // Drops every registry entry; the matching outboxes drain whatever is already queued and
    // then report closed, which ends the stream handlers.
    pub fn shutdown(&self) {
        let drained = std::mem::take(&mut *self.clients());
        info!("broker shutting down, releasing {} clients", drained.len());
        metrics::gauge!(CONNECTED_CLIENTS_METRIC).set(0.0);
    }

    // A panic while holding the lock can't leave the map half-modified (every critical section is
    // a single map operation), so it's safe to keep using it after poisoning.
    fn clients(&self) -> MutexGuard<'_, HashMap<u64, ClientEntry>> {
        self.inner.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// A Registration is the stream handler's view of one registry entry.  It deregisters itself when
// dropped, so every exit path out of a stream handler releases the entry.
pub struct Registration {
    key: u64,
    client_id: String,
    outbox_rx: mpsc::Receiver<SharedEvent>,
    broker: Broker,
}

impl Registration {
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn recv(&mut self) -> Option<SharedEvent> {
        self.outbox_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SharedEvent> {
        self.outbox_rx.try_recv().ok()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.broker.deregister(self.key);
    }
}
