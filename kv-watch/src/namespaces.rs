use kv_core::errors::*;
use kv_core::k8s::{
    ClusterClient,
    NamespaceScope,
};
use tracing::*;

use crate::config::ConfigError;

err_impl! {NamespaceError,
    #[error("namespace {0} is not allowed by the single-namespace restriction")]
    Forbidden(String),
}

// Decides which namespaces a viewer may see.  The single-namespace restriction is enforced here,
// at the request boundary, before a snapshot request ever gets to the aggregator.
#[derive(Clone, Debug)]
pub struct NamespacePolicy {
    scope: NamespaceScope,
    exclude: Option<Regex>,
}

impl NamespacePolicy {
    pub fn new(single_namespace: &str, namespace_filter: &str) -> anyhow::Result<NamespacePolicy> {
        let exclude = if namespace_filter.is_empty() {
            None
        } else {
            match Regex::new(namespace_filter) {
                Ok(re) => Some(re),
                Err(err) => bail!(ConfigError::invalid_namespace_filter(&format!("{namespace_filter}: {err}"))),
            }
        };

        Ok(NamespacePolicy { scope: NamespaceScope::from_restriction(single_namespace), exclude })
    }

    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    pub fn check(&self, ns: &str) -> EmptyResult {
        if !self.scope.allows(ns) {
            warn!("attempt to load namespace '{ns}' outside of the allowed scope {:?}", self.scope);
            bail!(NamespaceError::forbidden(ns));
        }
        Ok(())
    }

    pub fn is_excluded(&self, ns: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(ns))
    }

    // With a single-namespace restriction we don't even ask the cluster; otherwise it's every
    // namespace that doesn't match the exclusion pattern, sorted by name.
    pub async fn visible_namespaces(&self, client: &dyn ClusterClient) -> anyhow::Result<Vec<String>> {
        match &self.scope {
            NamespaceScope::Single(ns) => Ok(vec![ns.clone()]),
            NamespaceScope::All => {
                let mut namespaces = client.list_namespaces().await?;
                namespaces.retain(|ns| !self.is_excluded(ns));
                namespaces.sort();
                Ok(namespaces)
            },
        }
    }
}
