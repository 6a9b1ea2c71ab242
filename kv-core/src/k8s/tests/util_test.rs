use std::collections::BTreeMap;

use assertables::*;
use kv_testutils::*;
use serde_json::json;

use super::*;
use crate::prelude::*;

fn secret_rd() -> ResourceDescriptor {
    ResourceDescriptor::new("", "v1", SECRET_KIND)
}

fn redacted_kinds() -> Vec<String> {
    vec![SECRET_KIND.into(), CONFIGMAP_KIND.into()]
}

#[rstest]
fn test_sanitize_obj_strips_managed_fields() {
    let rd = ResourceDescriptor::new("apps", "v1", "Deployment");
    let mut obj = test_deployment(TEST_DEPLOYMENT);
    obj.types = None;
    obj.metadata.managed_fields = Some(vec![Default::default()]);
    obj.metadata.uid = Some("abcd".into());
    obj.metadata.owner_references = Some(vec![Default::default()]);

    sanitize_obj(&mut obj, &rd, &redacted_kinds());

    assert_none!(obj.metadata.managed_fields);
    assert_some!(obj.metadata.uid);
    assert_some!(obj.metadata.owner_references);
    assert_eq!(obj.data, json!({"spec": {"replicas": 42}}));
    assert!(
        obj.types
            .is_some_and(|tm| tm.api_version == "apps/v1" && tm.kind == "Deployment")
    );
}

#[rstest]
fn test_sanitize_obj_redacts_secret() {
    let mut obj = test_secret(TEST_SECRET);
    obj.metadata.annotations = Some(BTreeMap::from([
        (LAST_APPLIED_CONFIG_ANNOTATION_KEY.to_string(), "{\"data\":{\"password\":\"aHVudGVyMg==\"}}".to_string()),
        ("some_random_annotation".to_string(), "blah".to_string()),
    ]));

    sanitize_obj(&mut obj, &secret_rd(), &redacted_kinds());

    assert_eq!(
        obj.data,
        json!({
            "type": "Opaque",
            "data": {"password": REDACTED_MARKER, "username": REDACTED_MARKER},
            "stringData": {"token": REDACTED_MARKER},
        })
    );

    let annotations = obj.metadata.annotations.unwrap();
    assert_eq!(annotations[LAST_APPLIED_CONFIG_ANNOTATION_KEY], REDACTED_MARKER);
    assert_eq!(annotations["some_random_annotation"], "blah");

    let output = serde_json::to_string(&obj.data).unwrap();
    assert_not_contains!(output, "aHVudGVyMg==");
    assert_not_contains!(output, "YWRtaW4=");
}

#[rstest]
fn test_sanitize_obj_secret_without_data() {
    let mut obj = test_secret(TEST_SECRET);
    obj.data = json!({"type": "Opaque"});

    sanitize_obj(&mut obj, &secret_rd(), &redacted_kinds());

    assert_eq!(obj.data, json!({"type": "Opaque"}));
}

#[rstest]
fn test_sanitize_obj_kind_not_redacted() {
    let mut obj = test_secret(TEST_SECRET);
    let orig = obj.data.clone();

    sanitize_obj(&mut obj, &secret_rd(), &[]);

    assert_eq!(obj.data, orig);
}

#[rstest]
fn test_redact_obj_configmap_binary_data() {
    let mut obj = test_configmap(TEST_CONFIGMAP);

    redact_obj(&mut obj);

    assert_eq!(
        obj.data,
        json!({
            "data": {"app.properties": REDACTED_MARKER},
            "binaryData": {"blob": REDACTED_MARKER},
        })
    );
}

#[rstest]
fn test_namespaced_name() {
    let obj = test_deployment(TEST_DEPLOYMENT);
    assert_eq!(obj.namespaced_name(), format!("{TEST_NAMESPACE}/{TEST_DEPLOYMENT}"));
}
