mod client;
mod descriptor;
mod util;

#[cfg(feature = "mock")]
pub use client::MockClusterClient;
pub use client::{
    ClusterClient,
    ClusterError,
    KubeClusterClient,
    NamespaceScope,
    ObjStream,
};
pub use descriptor::ResourceDescriptor;
pub use util::*;

pub trait KubeResourceExt {
    fn namespaced_name(&self) -> String;
}

#[cfg(test)]
pub mod tests;
