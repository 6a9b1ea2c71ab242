use std::pin::Pin;

use async_trait::async_trait;
use futures::{
    Stream,
    StreamExt,
    TryStreamExt,
};
use kube::api::{
    DynamicObject,
    ListParams,
};
use kube::runtime::watcher::{
    self,
    Event,
    watcher,
};
use kube::runtime::WatchStreamExt;
#[cfg(feature = "mock")]
use mockall::automock;
use tracing::*;

use super::ResourceDescriptor;
use crate::errors::*;
use crate::prelude::*;

pub type ObjStream = Pin<Box<dyn Stream<Item = anyhow::Result<Event<DynamicObject>>> + Send>>;

err_impl! {ClusterError,
    #[error("could not reach the cluster API: {0}")]
    Unreachable(String),
}

// Which namespaces the watchers and snapshot queries are allowed to see; derived from the
// single-namespace restriction in the config (empty restriction means "everything").
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Single(String),
}

impl NamespaceScope {
    pub fn from_restriction(ns: &str) -> NamespaceScope {
        if ns.is_empty() { NamespaceScope::All } else { NamespaceScope::Single(ns.into()) }
    }

    pub fn allows(&self, ns: &str) -> bool {
        match self {
            NamespaceScope::All => true,
            NamespaceScope::Single(allowed) => allowed == ns,
        }
    }
}

// The set of read-only operations KubeView needs from the orchestration API.  Everything that
// talks to the cluster goes through this trait so that the watch pipeline and the snapshot
// aggregator can be exercised against a mock.
#[cfg_attr(feature = "mock", automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    fn host(&self) -> String;
    async fn probe(&self) -> EmptyResult;
    async fn list_namespaces(&self) -> anyhow::Result<Vec<String>>;
    async fn list_resources(&self, rd: &ResourceDescriptor, ns: &str) -> anyhow::Result<Vec<DynamicObject>>;
    fn watch(&self, rd: &ResourceDescriptor, scope: &NamespaceScope) -> ObjStream;
}

pub struct KubeClusterClient {
    client: kube::Client,
    host: String,
}

impl KubeClusterClient {
    // Uses the in-cluster service account when running inside a pod, otherwise falls back to
    // $KUBECONFIG or ~/.kube/config.
    pub async fn try_default() -> anyhow::Result<KubeClusterClient> {
        let config = kube::Config::infer().await?;
        let host = config.cluster_url.to_string();
        info!("kubernetes host: {host}");

        let client = kube::Client::try_from(config)?;
        Ok(KubeClusterClient { client, host })
    }

    pub fn new(client: kube::Client, host: &str) -> KubeClusterClient {
        KubeClusterClient { client, host: host.into() }
    }

    fn api_for(&self, rd: &ResourceDescriptor, scope: &NamespaceScope) -> kube::Api<DynamicObject> {
        let ar = rd.api_resource();
        match scope {
            NamespaceScope::All => kube::Api::all_with(self.client.clone(), &ar),
            NamespaceScope::Single(ns) => kube::Api::namespaced_with(self.client.clone(), ns, &ar),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    fn host(&self) -> String {
        self.host.clone()
    }

    async fn probe(&self) -> EmptyResult {
        let ns_api: kube::Api<corev1::Namespace> = kube::Api::all(self.client.clone());
        match ns_api.list(&ListParams::default().limit(1)).await {
            Ok(_) => {
                info!("validated connection to kubernetes API");
                Ok(())
            },
            Err(err) => Err(ClusterError::unreachable(&err.to_string())),
        }
    }

    async fn list_namespaces(&self) -> anyhow::Result<Vec<String>> {
        let ns_api: kube::Api<corev1::Namespace> = kube::Api::all(self.client.clone());
        let namespaces = ns_api.list(&Default::default()).await?;
        Ok(namespaces.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_resources(&self, rd: &ResourceDescriptor, ns: &str) -> anyhow::Result<Vec<DynamicObject>> {
        let api = self.api_for(rd, &NamespaceScope::Single(ns.into()));
        Ok(api.list(&Default::default()).await?.items)
    }

    fn watch(&self, rd: &ResourceDescriptor, scope: &NamespaceScope) -> ObjStream {
        watcher(self.api_for(rd, scope), watcher::Config::default())
            .default_backoff()
            .map_err(|e| e.into())
            .boxed()
    }
}
