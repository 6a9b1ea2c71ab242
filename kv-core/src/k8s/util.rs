use kube::api::{
    DynamicObject,
    Resource,
};
use serde_json as json;

use super::*;
use crate::prelude::*;

// Every document that leaves the core goes through here.  Managed-field history is clutter, and
// for secret-bearing kinds the data maps (and the kubectl last-applied annotation, which embeds
// a full copy of the original object) are overwritten with a fixed marker.  The identity fields
// the viewer uses to draw edges between objects (uid, ownerReferences) are left alone.
//
// List responses don't set apiVersion/kind on the individual items, so we fill the type
// information in from the descriptor here as well.
pub fn sanitize_obj(obj: &mut DynamicObject, rd: &ResourceDescriptor, redacted_kinds: &[String]) {
    obj.metadata.managed_fields = None;
    obj.types = Some(rd.into_type_meta());

    if redacted_kinds.iter().any(|k| k == &rd.kind) {
        redact_obj(obj);
    }
}

pub fn redact_obj(obj: &mut DynamicObject) {
    for field in REDACTED_DATA_FIELDS {
        if let Some(data) = obj.data.get_mut(field).and_then(|v| v.as_object_mut()) {
            for v in data.values_mut() {
                *v = json::Value::String(REDACTED_MARKER.into());
            }
        }
    }

    if let Some(a) = obj.metadata.annotations.as_mut()
        && let Some(v) = a.get_mut(LAST_APPLIED_CONFIG_ANNOTATION_KEY)
    {
        *v = REDACTED_MARKER.into();
    }
}

impl<T: Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any().clone(),
        }
    }
}
