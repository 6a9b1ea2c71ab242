use kube::api::{
    ApiResource,
    DynamicObject,
    GroupVersionKind,
};
use rstest::fixture;
use serde_json::json;

use crate::constants::*;

// The fixtures below deliberately build their type info from raw GroupVersionKinds instead of
// kv-core's ResourceDescriptor, so they can be used from kv-core's own unit tests.
fn api_resource(group: &str, kind: &str) -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(group, "v1", kind))
}

#[fixture]
pub fn test_pod(#[default(TEST_POD)] name: &str) -> DynamicObject {
    let mut pod = DynamicObject::new(name, &api_resource("", "Pod"))
        .within(TEST_NAMESPACE)
        .data(json!({"spec": {"containers": [{"name": "nginx", "image": "nginx:latest"}]}}));
    pod.metadata.uid = Some(format!("{name}-uid"));
    pod.metadata.resource_version = Some("1".into());
    pod
}

#[fixture]
pub fn test_service(#[default(TEST_SERVICE)] name: &str) -> DynamicObject {
    let mut svc = DynamicObject::new(name, &api_resource("", "Service"))
        .within(TEST_NAMESPACE)
        .data(json!({"spec": {"ports": [{"port": 80}]}}));
    svc.metadata.resource_version = Some("1".into());
    svc
}

#[fixture]
pub fn test_deployment(#[default(TEST_DEPLOYMENT)] name: &str) -> DynamicObject {
    DynamicObject::new(name, &api_resource("apps", "Deployment"))
        .within(TEST_NAMESPACE)
        .data(json!({"spec": {"replicas": 42}}))
}

#[fixture]
pub fn test_secret(#[default(TEST_SECRET)] name: &str) -> DynamicObject {
    DynamicObject::new(name, &api_resource("", "Secret"))
        .within(TEST_NAMESPACE)
        .data(json!({
            "type": "Opaque",
            "data": {"password": "aHVudGVyMg==", "username": "YWRtaW4="},
            "stringData": {"token": "hunter2"},
        }))
}

#[fixture]
pub fn test_configmap(#[default(TEST_CONFIGMAP)] name: &str) -> DynamicObject {
    DynamicObject::new(name, &api_resource("", "ConfigMap"))
        .within(TEST_NAMESPACE)
        .data(json!({
            "data": {"app.properties": "color=blue"},
            "binaryData": {"blob": "AAEC"},
        }))
}
