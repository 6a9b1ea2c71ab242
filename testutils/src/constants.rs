use kv_core::k8s::ResourceDescriptor;
use lazy_static::lazy_static;

pub const TEST_DEPLOYMENT: &str = "the-deployment";
pub const TEST_POD: &str = "the-pod";
pub const TEST_SERVICE: &str = "the-service";
pub const TEST_SECRET: &str = "the-secret";
pub const TEST_CONFIGMAP: &str = "the-configmap";
pub const TEST_NAMESPACE: &str = "test-namespace";
pub const TEST_CLIENT_ID: &str = "the-client";
pub const TEST_CLUSTER_HOST: &str = "https://kube.example.com:6443";

lazy_static! {
    pub static ref POD_RD: ResourceDescriptor = ResourceDescriptor::new("", "v1", "Pod");
    pub static ref SVC_RD: ResourceDescriptor = ResourceDescriptor::new("", "v1", "Service");
    pub static ref SECRET_RD: ResourceDescriptor = ResourceDescriptor::new("", "v1", "Secret");
    pub static ref DEPL_RD: ResourceDescriptor = ResourceDescriptor::new("apps", "v1", "Deployment");
}
