use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use kube::api::{
    ApiResource,
    GroupVersionKind,
    TypeMeta,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de,
};

use crate::errors::*;

// ResourceDescriptor is a "newtype" wrapper around GroupVersionKind that identifies one
// listable/watchable collection in the cluster.  We provide custom serialization so that the
// descriptors can be written in config files as "group/version.Kind" (or "version.Kind" for the
// core group; "/version.Kind" is also accepted on input).
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ResourceDescriptor(GroupVersionKind);

impl ResourceDescriptor {
    pub fn new(group: &str, version: &str, kind: &str) -> ResourceDescriptor {
        ResourceDescriptor(GroupVersionKind::gvk(group, version, kind))
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk(&self.0)
    }

    // The lowercase plural name used in API paths, e.g. "pods" or "ingresses"; the namespace
    // snapshot is keyed by this value as well.
    pub fn plural(&self) -> String {
        self.api_resource().plural
    }

    pub fn into_type_meta(&self) -> TypeMeta {
        TypeMeta {
            api_version: self.0.api_version(),
            kind: self.0.kind.clone(),
        }
    }
}

impl Deref for ResourceDescriptor {
    type Target = GroupVersionKind;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut group = Cow::from(&self.0.group);
        if !group.is_empty() {
            group.to_mut().push('/');
        }

        write!(f, "{group}{}.{}", self.0.version, self.0.kind)
    }
}

impl FromStr for ResourceDescriptor {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let p1: Vec<_> = value.split('/').collect();
        let (group, rest) = match p1.len() {
            2 => (p1[0], p1[1]),
            1 => ("", p1[0]),
            _ => bail!("invalid format for resource descriptor: {value}"),
        };

        // Group names contain dots but versions and kinds never do, so split from the right
        let Some((version, kind)) = rest.rsplit_once('.') else {
            bail!("invalid format for resource descriptor: {value}");
        };
        ensure!(!version.is_empty() && !kind.is_empty(), "invalid format for resource descriptor: {value}");

        Ok(ResourceDescriptor::new(group, version, kind))
    }
}

impl Serialize for ResourceDescriptor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // reuse the display impl for serializing
        serializer.serialize_str(&format!("{self}"))
    }
}

struct ResourceDescriptorVisitor;

impl<'de> de::Visitor<'de> for ResourceDescriptorVisitor {
    type Value = ResourceDescriptor;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a resource descriptor in the format group/version.Kind")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        value.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for ResourceDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<ResourceDescriptor, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(ResourceDescriptorVisitor)
    }
}
