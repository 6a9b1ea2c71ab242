mod broker;
mod config;
mod event;
mod manager;
mod namespaces;
mod snapshot;
pub mod stream;
mod watchers;

pub use crate::broker::{
    Broker,
    Registration,
    SharedEvent,
};
pub use crate::config::{
    ConfigError,
    ViewerConfig,
};
pub use crate::event::{
    CanonicalEvent,
    EventKind,
};
pub use crate::manager::{
    ReadyState,
    WatchManager,
};
pub use crate::namespaces::{
    NamespaceError,
    NamespacePolicy,
};
pub use crate::snapshot::{
    NamespaceSnapshot,
    SnapshotAggregator,
    SnapshotError,
};
pub use crate::watchers::ResourceWatcher;

#[cfg(test)]
mod tests;
