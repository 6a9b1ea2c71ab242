use std::collections::HashMap;

use futures::{
    StreamExt,
    stream,
};
use kube::runtime::watcher::Event;
use kv_core::k8s::ObjStream;

use super::*;

fn event_stream(events: Vec<anyhow::Result<Event<DynamicObject>>>) -> ObjStream {
    stream::iter(events).boxed()
}

fn pod_with_version(name: &str, rv: &str) -> DynamicObject {
    let mut pod = test_pod(name);
    pod.metadata.resource_version = Some(rv.into());
    pod
}

fn pod_index(pods: &[DynamicObject]) -> HashMap<String, DynamicObject> {
    pods.iter().map(|p| (p.namespaced_name(), p.clone())).collect()
}

fn summarize(events: &[SharedEvent]) -> Vec<(EventKind, String)> {
    events
        .iter()
        .map(|e| (e.kind, e.obj.as_ref().map(|o| o.name_any()).unwrap_or_default()))
        .collect()
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_initial_sync_is_silent() {
    let broker = Broker::new(10);
    let mut reg = broker.register(TEST_CLIENT_ID);
    let existing = test_pod("existing");
    let created = test_pod("created");

    let (watcher, mut ready_rx) = ResourceWatcher::new_from_parts(
        POD_RD.clone(),
        event_stream(vec![
            Ok(Event::Init),
            Ok(Event::InitApply(existing)),
            Ok(Event::InitDone),
            Ok(Event::Apply(created.clone())),
            Ok(Event::Delete(created)),
        ]),
        broker.clone(),
        HashMap::new(),
        false,
    );
    watcher.start().await;

    assert_eq!(ready_rx.recv().await, Some(true));
    assert_eq!(
        summarize(&drain(&mut reg)),
        vec![(EventKind::Added, "created".into()), (EventKind::Deleted, "created".into())]
    );
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_nothing_published_before_sync() {
    let broker = Broker::new(10);
    let mut reg = broker.register(TEST_CLIENT_ID);
    let (mut watcher, _) =
        ResourceWatcher::new_from_parts(POD_RD.clone(), event_stream(vec![]), broker.clone(), HashMap::new(), false);

    watcher.handle_event(Event::Init);
    watcher.handle_event(Event::InitApply(test_pod("pod0")));
    watcher.handle_event(Event::InitApply(test_pod("pod1")));

    assert!(!watcher.is_synced());
    assert_is_empty!(drain(&mut reg));

    watcher.handle_event(Event::InitDone);
    assert!(watcher.is_synced());
    assert_is_empty!(drain(&mut reg));
    assert_eq!(
        watcher.indexed_names(),
        vec![format!("{TEST_NAMESPACE}/pod0"), format!("{TEST_NAMESPACE}/pod1")]
    );
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_apply_known_object_is_update() {
    let broker = Broker::new(10);
    let mut reg = broker.register(TEST_CLIENT_ID);
    let pod = pod_with_version(TEST_POD, "1");
    let (mut watcher, _) = ResourceWatcher::new_from_parts(
        POD_RD.clone(),
        event_stream(vec![]),
        broker.clone(),
        pod_index(&[pod]),
        true,
    );

    watcher.handle_event(Event::Apply(pod_with_version(TEST_POD, "2")));

    let events = drain(&mut reg);
    assert_eq!(summarize(&events), vec![(EventKind::Updated, TEST_POD.into())]);
    assert_eq!(events[0].obj.as_ref().unwrap().resource_version(), Some("2".into()));
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_relist_diffs_against_index() {
    let broker = Broker::new(10);
    let mut reg = broker.register(TEST_CLIENT_ID);
    let (mut watcher, _) = ResourceWatcher::new_from_parts(
        POD_RD.clone(),
        event_stream(vec![]),
        broker.clone(),
        pod_index(&[
            pod_with_version("pod0", "1"),
            pod_with_version("pod1", "1"),
            pod_with_version("pod3", "1"),
        ]),
        true,
    );

    watcher.handle_event(Event::Init);
    watcher.handle_event(Event::InitApply(pod_with_version("pod0", "1")));
    watcher.handle_event(Event::InitApply(pod_with_version("pod1", "2")));
    watcher.handle_event(Event::InitApply(pod_with_version("pod2", "1")));
    watcher.handle_event(Event::InitDone);

    assert_eq!(
        summarize(&drain(&mut reg)),
        vec![
            (EventKind::Updated, "pod1".into()),
            (EventKind::Added, "pod2".into()),
            (EventKind::Deleted, "pod3".into()),
        ]
    );
    assert_eq!(
        watcher.indexed_names(),
        vec![
            format!("{TEST_NAMESPACE}/pod0"),
            format!("{TEST_NAMESPACE}/pod1"),
            format!("{TEST_NAMESPACE}/pod2"),
        ]
    );
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_setup_failure_signals_not_ready() {
    let broker = Broker::new(10);
    let mut reg = broker.register(TEST_CLIENT_ID);
    let (watcher, mut ready_rx) = ResourceWatcher::new_from_parts(
        POD_RD.clone(),
        event_stream(vec![Err(anyhow!("the server could not find the requested resource")), Ok(Event::Init)]),
        broker.clone(),
        HashMap::new(),
        false,
    );
    watcher.start().await;

    assert_eq!(ready_rx.recv().await, Some(false));
    assert_none!(ready_rx.recv().await);
    assert_is_empty!(drain(&mut reg));
    assert!(logs_contain("could not establish watch"));
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_errors_after_sync_are_not_fatal() {
    let broker = Broker::new(10);
    let mut reg = broker.register(TEST_CLIENT_ID);
    let (watcher, mut ready_rx) = ResourceWatcher::new_from_parts(
        POD_RD.clone(),
        event_stream(vec![
            Ok(Event::Init),
            Ok(Event::InitDone),
            Err(anyhow!("connection reset")),
            Ok(Event::Apply(test_pod(TEST_POD))),
        ]),
        broker.clone(),
        HashMap::new(),
        false,
    );
    watcher.start().await;

    assert_eq!(ready_rx.recv().await, Some(true));
    assert_eq!(summarize(&drain(&mut reg)), vec![(EventKind::Added, TEST_POD.into())]);
    assert!(logs_contain("connection reset"));
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_watched_secret_is_redacted() {
    let broker = Broker::new(10);
    let mut reg = broker.register(TEST_CLIENT_ID);
    let mut secret = test_secret(TEST_SECRET);
    secret.metadata.managed_fields = Some(vec![Default::default()]);

    let (mut watcher, _) = ResourceWatcher::new_from_parts(
        SECRET_RD.clone(),
        event_stream(vec![]),
        broker.clone(),
        HashMap::new(),
        true,
    );
    watcher.handle_event(Event::Apply(secret));

    let events = drain(&mut reg);
    assert_eq!(events.len(), 1);
    let obj = events[0].obj.as_ref().unwrap();
    assert_none!(obj.metadata.managed_fields);
    assert_eq!(obj.data["data"]["password"], REDACTED_MARKER);
    assert_eq!(obj.data["stringData"]["token"], REDACTED_MARKER);
    assert_eq!(obj.data["type"], "Opaque");
}
