use std::collections::HashMap;
use std::mem::take;
use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::watcher::Event;
use kv_core::k8s::{
    ObjStream,
    sanitize_obj,
};
use kv_core::prelude::*;
use tokio::sync::mpsc;
use tracing::*;

use crate::broker::Broker;
use crate::event::CanonicalEvent;

// A ResourceWatcher turns the kube watch stream for one resource kind into canonical events.
//
// The watcher keeps its own index of every object it has seen (keyed by namespaced name), which
// serves two purposes: the initial list fills it silently, so objects that already existed
// before the watch opened never show up as "added"; and when the underlying watch has to relist
// (e.g., after a desync) we can diff the fresh listing against the index to figure out what
// actually changed in the meantime.
pub struct ResourceWatcher {
    rd: ResourceDescriptor,
    stream: ObjStream,
    broker: Broker,
    redacted_kinds: Arc<Vec<String>>,
    index: HashMap<String, DynamicObject>,
    relist: Option<HashMap<String, DynamicObject>>,
    synced: bool,
    ready_tx: Option<mpsc::Sender<bool>>,
}

impl ResourceWatcher {
    pub fn new(
        rd: ResourceDescriptor,
        stream: ObjStream,
        broker: Broker,
        redacted_kinds: Arc<Vec<String>>,
        ready_tx: mpsc::Sender<bool>,
    ) -> ResourceWatcher {
        ResourceWatcher {
            rd,
            stream,
            broker,
            redacted_kinds,
            index: HashMap::new(),
            relist: None,
            synced: false,
            ready_tx: Some(ready_tx),
        }
    }

    #[instrument(skip_all, fields(resource = %self.rd))]
    pub async fn start(mut self) {
        while let Some(res) = self.stream.next().await {
            match res {
                Ok(evt) => self.handle_event(evt),
                Err(err) if !self.synced => {
                    // We don't retry here; a kind that can't be watched (say, a CRD that isn't
                    // installed) just isn't shown, and the other watchers carry on.
                    error!("could not establish watch for {}, giving up: {err}", self.rd);
                    self.signal_ready(false);
                    return;
                },
                Err(err) => warn!("watcher for {} received error on stream: {err}", self.rd),
            }
        }

        warn!("watch stream for {} ended", self.rd);
        self.signal_ready(false);
    }

    pub(crate) fn handle_event(&mut self, evt: Event<DynamicObject>) {
        match evt {
            Event::Init => {
                debug!("starting (re)list of {}", self.rd);
                self.relist = Some(HashMap::new());
            },
            Event::InitApply(obj) => self.handle_init_apply(obj),
            Event::InitDone => self.handle_init_done(),
            Event::Apply(obj) => self.handle_apply(obj),
            Event::Delete(obj) => self.handle_delete(obj),
        }
    }

    pub(crate) fn is_synced(&self) -> bool {
        self.synced
    }

    pub(crate) fn indexed_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.index.keys().cloned().collect();
        names.sort();
        names
    }

    fn handle_init_apply(&mut self, mut obj: DynamicObject) {
        sanitize_obj(&mut obj, &self.rd, &self.redacted_kinds);
        let ns_name = obj.namespaced_name();

        // Only a relist after the initial sync produces events; anything in the very first
        // listing is part of the starting state.
        if self.synced {
            match self.index.get(&ns_name) {
                None => self.publish(CanonicalEvent::added(obj.clone())),
                Some(old) if old.resource_version() != obj.resource_version() => {
                    self.publish(CanonicalEvent::updated(obj.clone()))
                },
                Some(_) => (),
            }
        }

        match self.relist.as_mut() {
            Some(relist) => {
                relist.insert(ns_name, obj);
            },
            None => {
                // The kube watcher always sends Init first, but if it somehow didn't we still
                // want to keep the index up to date
                self.index.insert(ns_name, obj);
            },
        }
    }

    fn handle_init_done(&mut self) {
        // We're essentially swapping the old index for the new one; anything left in the old
        // index after the swap was deleted while we weren't watching.
        let Some(relist) = self.relist.take() else {
            warn!("received InitDone for {} without a matching Init", self.rd);
            return;
        };
        let old_index = std::mem::replace(&mut self.index, relist);

        if self.synced {
            for (ns_name, obj) in old_index {
                if !self.index.contains_key(&ns_name) {
                    self.publish(CanonicalEvent::deleted(obj));
                }
            }
        } else {
            self.synced = true;
            info!("watch for {} synced with {} objects", self.rd, self.index.len());
            self.signal_ready(true);
        }
    }

    fn handle_apply(&mut self, mut obj: DynamicObject) {
        sanitize_obj(&mut obj, &self.rd, &self.redacted_kinds);
        let ns_name = obj.namespaced_name();
        let evt = match self.index.insert(ns_name, obj.clone()) {
            None => CanonicalEvent::added(obj),
            Some(_) => CanonicalEvent::updated(obj),
        };

        if self.synced {
            self.publish(evt);
        }
    }

    fn handle_delete(&mut self, mut obj: DynamicObject) {
        sanitize_obj(&mut obj, &self.rd, &self.redacted_kinds);
        self.index.remove(&obj.namespaced_name());

        if self.synced {
            self.publish(CanonicalEvent::deleted(obj));
        }
    }

    fn publish(&self, evt: CanonicalEvent) {
        trace!("publishing {:?} for {:?}", evt.kind, evt.namespaced_name());
        self.broker.broadcast(evt);
    }

    // Readiness is only ever signalled once per watcher, whether or not the sync succeeded, so
    // the manager can count exactly one message per watcher.
    fn signal_ready(&mut self, synced: bool) {
        if let Some(tx) = take(&mut self.ready_tx)
            && let Err(err) = tx.try_send(synced)
        {
            warn!("could not signal readiness for {}: {err}", self.rd);
        }
    }
}

#[cfg(test)]
impl ResourceWatcher {
    pub(crate) fn new_from_parts(
        rd: ResourceDescriptor,
        stream: ObjStream,
        broker: Broker,
        index: HashMap<String, DynamicObject>,
        synced: bool,
    ) -> (ResourceWatcher, mpsc::Receiver<bool>) {
        let (ready_tx, ready_rx) = mpsc::channel(1);
        let mut watcher = ResourceWatcher::new(
            rd,
            stream,
            broker,
            Arc::new(vec![SECRET_KIND.into(), CONFIGMAP_KIND.into()]),
            ready_tx,
        );
        watcher.index = index;
        watcher.synced = synced;
        if synced {
            watcher.ready_tx = None;
        }
        (watcher, ready_rx)
    }
}
