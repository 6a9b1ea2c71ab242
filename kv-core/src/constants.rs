use std::time::Duration;

// Well-known annotations
pub const LAST_APPLIED_CONFIG_ANNOTATION_KEY: &str = "kubectl.kubernetes.io/last-applied-configuration";

// Redaction
pub const REDACTED_MARKER: &str = "*REDACTED*";
pub const REDACTED_DATA_FIELDS: [&str; 3] = ["data", "binaryData", "stringData"];
pub const SECRET_KIND: &str = "Secret";
pub const CONFIGMAP_KIND: &str = "ConfigMap";

// Env vars
pub const PORT_ENV_VAR: &str = "PORT";
pub const SINGLE_NAMESPACE_ENV_VAR: &str = "SINGLE_NAMESPACE";
pub const NAMESPACE_FILTER_ENV_VAR: &str = "NAMESPACE_FILTER";

// Defaults
pub const DEFAULT_PORT: &str = "8000";
pub const DEFAULT_CLIENT_BUFFER_SIZE: usize = 32;

// Timing
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
