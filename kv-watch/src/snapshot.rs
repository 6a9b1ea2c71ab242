use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use kv_core::errors::*;
use kv_core::k8s::{
    ClusterClient,
    sanitize_obj,
};
use kv_core::prelude::*;
use serde::Serialize;
use tracing::*;

use crate::config::ViewerConfig;

err_impl! {SnapshotError,
    #[error("namespace is empty")]
    EmptyNamespace(String),
}

// The point-in-time contents of one namespace, keyed by the plural resource name ("pods",
// "deployments", ...).  There is always an entry for every tracked kind, even if it's empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NamespaceSnapshot(BTreeMap<String, Vec<DynamicObject>>);

impl NamespaceSnapshot {
    pub fn get(&self, plural: &str) -> Option<&[DynamicObject]> {
        self.0.get(plural).map(|objs| objs.as_slice())
    }

    pub fn kinds(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn object_count(&self) -> usize {
        self.0.values().map(|objs| objs.len()).sum()
    }
}

// Builds namespace snapshots straight from the cluster, bypassing the watch pipeline.  This is
// best-effort: one kind failing to list (missing CRD, RBAC, whatever) just leaves that kind empty
// in the result instead of failing the whole request.
pub struct SnapshotAggregator {
    client: Arc<dyn ClusterClient>,
    tracked_resources: Vec<ResourceDescriptor>,
    redacted_kinds: Vec<String>,
}

impl SnapshotAggregator {
    pub fn new(client: Arc<dyn ClusterClient>, config: &ViewerConfig) -> SnapshotAggregator {
        SnapshotAggregator {
            client,
            tracked_resources: config.tracked_resources.clone(),
            redacted_kinds: config.redacted_kinds.clone(),
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, ns: &str) -> anyhow::Result<NamespaceSnapshot> {
        if ns.is_empty() {
            bail!(SnapshotError::empty_namespace(ns));
        }

        let results =
            join_all(self.tracked_resources.iter().map(|rd| self.client.list_resources(rd, ns))).await;

        let mut snapshot = BTreeMap::new();
        for (rd, res) in self.tracked_resources.iter().zip(results) {
            let objs = match res {
                Ok(mut objs) => {
                    for obj in objs.iter_mut() {
                        sanitize_obj(obj, rd, &self.redacted_kinds);
                    }
                    objs
                },
                Err(err) => {
                    warn!("failed to get {} in namespace {ns}: {err}", rd.plural());
                    vec![]
                },
            };
            snapshot.insert(rd.plural(), objs);
        }

        let snapshot = NamespaceSnapshot(snapshot);
        debug!("fetched {} objects across {} kinds in namespace {ns}", snapshot.object_count(), snapshot.len());
        Ok(snapshot)
    }
}
