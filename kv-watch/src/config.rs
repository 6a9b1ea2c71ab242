use std::fs::File;
use std::time::Duration;

use kv_core::errors::*;
use kv_core::k8s::NamespaceScope;
use kv_core::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::namespaces::NamespacePolicy;

err_impl! {ConfigError,
    #[error("namespace filter is not a valid regular expression: {0}")]
    InvalidNamespaceFilter(String),
}

fn default_tracked_resources() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new("", "v1", "Pod"),
        ResourceDescriptor::new("", "v1", "Service"),
        ResourceDescriptor::new("", "v1", "Endpoints"),
        ResourceDescriptor::new("apps", "v1", "Deployment"),
        ResourceDescriptor::new("apps", "v1", "ReplicaSet"),
        ResourceDescriptor::new("apps", "v1", "StatefulSet"),
        ResourceDescriptor::new("apps", "v1", "DaemonSet"),
        ResourceDescriptor::new("batch", "v1", "Job"),
        ResourceDescriptor::new("batch", "v1", "CronJob"),
        ResourceDescriptor::new("networking.k8s.io", "v1", "Ingress"),
        ResourceDescriptor::new("", "v1", CONFIGMAP_KIND),
        ResourceDescriptor::new("", "v1", SECRET_KIND),
        ResourceDescriptor::new("", "v1", "PersistentVolumeClaim"),
    ]
}

fn default_redacted_kinds() -> Vec<String> {
    vec![SECRET_KIND.into(), CONFIGMAP_KIND.into()]
}

// The set of tracked resources is fixed for the lifetime of the process; the watch manager and the
// snapshot aggregator both read it from here.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    pub single_namespace: String,
    pub namespace_filter: String,
    pub tracked_resources: Vec<ResourceDescriptor>,
    pub redacted_kinds: Vec<String>,
    pub heartbeat_interval_seconds: u64,
    pub client_buffer_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            single_namespace: String::new(),
            namespace_filter: String::new(),
            tracked_resources: default_tracked_resources(),
            redacted_kinds: default_redacted_kinds(),
            heartbeat_interval_seconds: DEFAULT_HEARTBEAT_INTERVAL.as_secs(),
            client_buffer_size: DEFAULT_CLIENT_BUFFER_SIZE,
        }
    }
}

impl ViewerConfig {
    pub fn load(filename: &str) -> anyhow::Result<ViewerConfig> {
        Ok(serde_yaml::from_reader(File::open(filename)?)?)
    }

    pub fn namespace_scope(&self) -> NamespaceScope {
        NamespaceScope::from_restriction(&self.single_namespace)
    }

    pub fn namespace_policy(&self) -> anyhow::Result<NamespacePolicy> {
        NamespacePolicy::new(&self.single_namespace, &self.namespace_filter)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds.max(1))
    }

    pub fn validate(&self) -> EmptyResult {
        ensure!(!self.tracked_resources.is_empty(), "no tracked resources configured");
        ensure!(self.client_buffer_size > 0, "clientBufferSize must be greater than zero");
        self.namespace_policy()?;
        Ok(())
    }
}
