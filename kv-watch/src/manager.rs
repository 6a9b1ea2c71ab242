use std::sync::Arc;

use kv_core::k8s::{
    ClusterClient,
    NamespaceScope,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::*;

use crate::broker::Broker;
use crate::config::ViewerConfig;
use crate::watchers::ResourceWatcher;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadyState {
    pub synced: usize,
    pub failed: usize,
}

// The WatchManager owns one watcher task per tracked resource.  Starting it is the only place in
// KubeView where a cluster error is fatal: if we can't talk to the cluster at all there's no point
// in serving anything.  Once the connectivity probe passes, a kind that fails to watch only
// reduces coverage.
pub struct WatchManager {
    expected: usize,
    ready_rx: mpsc::Receiver<bool>,
    ready_state: ReadyState,
    js: JoinSet<()>,
}

impl WatchManager {
    pub async fn start(
        client: Arc<dyn ClusterClient>,
        config: &ViewerConfig,
        broker: Broker,
    ) -> anyhow::Result<WatchManager> {
        client.probe().await?;

        let scope = config.namespace_scope();
        match &scope {
            NamespaceScope::All => info!("setting up resource watchers in all namespaces"),
            NamespaceScope::Single(ns) => info!("setting up resource watchers in single namespace {ns}"),
        }

        let expected = config.tracked_resources.len();
        let (ready_tx, ready_rx) = mpsc::channel(expected.max(1));
        let redacted_kinds = Arc::new(config.redacted_kinds.clone());

        let mut js = JoinSet::new();
        for rd in &config.tracked_resources {
            let stream = client.watch(rd, &scope);
            let watcher =
                ResourceWatcher::new(rd.clone(), stream, broker.clone(), redacted_kinds.clone(), ready_tx.clone());
            js.spawn(watcher.start());
        }
        drop(ready_tx);

        let mut manager = WatchManager {
            expected,
            ready_rx,
            ready_state: ReadyState::default(),
            js,
        };
        manager.wait_ready().await;
        Ok(manager)
    }

    // Blocks until every watcher has either finished its initial list-and-sync or given up.
    pub async fn wait_ready(&mut self) -> ReadyState {
        while self.ready_state.synced + self.ready_state.failed < self.expected {
            match self.ready_rx.recv().await {
                Some(true) => self.ready_state.synced += 1,
                Some(false) => self.ready_state.failed += 1,
                None => break,
            }
        }

        if self.ready_state.failed > 0 {
            warn!(
                "{} of {} resource watches could not be established; continuing with reduced coverage",
                self.ready_state.failed, self.expected
            );
        }
        info!("{} of {} resource watches synced", self.ready_state.synced, self.expected);
        self.ready_state
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub async fn shutdown(&mut self) {
        self.js.shutdown().await;
    }
}
