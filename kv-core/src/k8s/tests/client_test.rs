use assertables::*;
use futures::StreamExt;
use httpmock::Method::*;
use kube::runtime::watcher::Event;
use kv_testutils::*;
use serde_json::json;

use super::*;
use crate::prelude::*;

fn pod_rd() -> ResourceDescriptor {
    ResourceDescriptor::new("", "v1", "Pod")
}

#[rstest]
#[case::all(NamespaceScope::All, "foo", true)]
#[case::single_match(NamespaceScope::Single("foo".into()), "foo", true)]
#[case::single_mismatch(NamespaceScope::Single("foo".into()), "bar", false)]
fn test_namespace_scope_allows(#[case] scope: NamespaceScope, #[case] ns: &str, #[case] expected: bool) {
    assert_eq!(scope.allows(ns), expected);
}

#[rstest]
fn test_namespace_scope_from_restriction() {
    assert_eq!(NamespaceScope::from_restriction(""), NamespaceScope::All);
    assert_eq!(NamespaceScope::from_restriction("team-a"), NamespaceScope::Single("team-a".into()));
}

#[rstest]
#[tokio::test]
async fn test_build_tls_client() {
    // Building a client for an https endpoint needs a TLS crypto provider but no network
    let config = kube::Config::new(TEST_CLUSTER_HOST.parse().unwrap());
    let client = kube::Client::try_from(config).unwrap();
    let cc = KubeClusterClient::new(client, TEST_CLUSTER_HOST);
    assert_eq!(cc.host(), TEST_CLUSTER_HOST);
}

#[rstest]
#[tokio::test]
async fn test_probe_ok() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle(|when, then| {
        when.path("/api/v1/namespaces").method(GET).query_param("limit", "1");
        then.json_body(namespace_list(&["default"]));
    });
    fake_apiserver.build();

    let cc = KubeClusterClient::new(client, "https://fake");
    cc.probe().await.unwrap();
    fake_apiserver.assert();
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_probe_unreachable() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle_not_found("/api/v1/namespaces".into());
    fake_apiserver.build();

    let cc = KubeClusterClient::new(client, "https://fake");
    let err = cc.probe().await.unwrap_err();
    assert_matches!(err.downcast_ref::<ClusterError>(), Some(ClusterError::Unreachable(_)));
}

#[rstest]
#[tokio::test]
async fn test_list_namespaces() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle(|when, then| {
        when.path("/api/v1/namespaces").method(GET);
        then.json_body(namespace_list(&["default", "kube-system", TEST_NAMESPACE]));
    });
    fake_apiserver.build();

    let cc = KubeClusterClient::new(client, "https://fake");
    let namespaces = cc.list_namespaces().await.unwrap();
    assert_eq!(namespaces, vec!["default", "kube-system", TEST_NAMESPACE]);
}

#[rstest]
#[tokio::test]
async fn test_list_resources() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle(|when, then| {
        when.path(format!("/api/v1/namespaces/{TEST_NAMESPACE}/pods")).method(GET);
        then.json_body(object_list("v1", &[json!({"metadata": {"name": "pod0", "namespace": TEST_NAMESPACE}})]));
    });
    fake_apiserver.build();

    let cc = KubeClusterClient::new(client, "https://fake");
    let pods = cc.list_resources(&pod_rd(), TEST_NAMESPACE).await.unwrap();
    assert_eq!(pods.len(), 1);
    assert_eq!(pods[0].name_any(), "pod0");
    fake_apiserver.assert();
}

#[rstest]
#[tokio::test]
async fn test_list_resources_not_found() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle_not_found(format!("/api/v1/namespaces/{TEST_NAMESPACE}/pods"));
    fake_apiserver.build();

    let cc = KubeClusterClient::new(client, "https://fake");
    assert_err!(cc.list_resources(&pod_rd(), TEST_NAMESPACE).await);
}

#[rstest]
#[tokio::test]
async fn test_watch_initial_list() {
    let (mut fake_apiserver, client) = make_fake_apiserver();

    // The limit query param indicates this is the initial "list" call
    fake_apiserver.handle(|when, then| {
        when.path(format!("/api/v1/namespaces/{TEST_NAMESPACE}/pods"))
            .method(GET)
            .query_param("limit", "500");
        then.json_body(object_list("v1", &[json!({"metadata": {"name": "pod0", "namespace": TEST_NAMESPACE}})]));
    });
    fake_apiserver.build();

    let cc = KubeClusterClient::new(client, "https://fake");
    let mut stream = cc.watch(&pod_rd(), &NamespaceScope::Single(TEST_NAMESPACE.into()));

    assert_matches!(stream.next().await, Some(Ok(Event::Init)));
    assert_matches!(stream.next().await, Some(Ok(Event::InitApply(obj))) if obj.name_any() == "pod0");
    assert_matches!(stream.next().await, Some(Ok(Event::InitDone)));
}
