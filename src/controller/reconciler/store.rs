//! # Resource Store
//!
//! Writes to managed resources. Every write is a JSON merge patch carrying
//! the `resourceVersion` the tick read, so a concurrent change makes the
//! write fail with a conflict and the next tick starts from fresh state.

use crate::constants::FIELD_MANAGER;
use crate::crd::Managed;
use crate::error::Result;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::{Map, Value};

#[async_trait]
pub trait ResourceStore<K>: Send + Sync {
    /// Patch metadata or spec; returns the updated resource
    async fn patch(&self, name: &str, patch: &Value) -> Result<K>;
    /// Patch the status subresource; returns the updated resource
    async fn patch_status(&self, name: &str, patch: &Value) -> Result<K>;
}

pub struct KubeResourceStore<K> {
    api: Api<K>,
}

impl<K: Managed> KubeResourceStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl<K: Managed> ResourceStore<K> for KubeResourceStore<K> {
    async fn patch(&self, name: &str, patch: &Value) -> Result<K> {
        Ok(self
            .api
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?)
    }

    async fn patch_status(&self, name: &str, patch: &Value) -> Result<K> {
        Ok(self
            .api
            .patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?)
    }
}

/// Merge patch turning `old` into `new`
///
/// Keys missing from `new` become explicit `null`s; arrays and scalars are
/// replaced whole. Returns `None` when the documents are equal.
pub fn merge_patch_diff(old: &Value, new: &Value) -> Option<Value> {
    if old == new {
        return None;
    }
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => {
            let mut patch = Map::new();
            for (key, new_value) in new {
                match old.get(key) {
                    Some(old_value) => {
                        if let Some(diff) = merge_patch_diff(old_value, new_value) {
                            patch.insert(key.clone(), diff);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), new_value.clone());
                    }
                }
            }
            for key in old.keys() {
                if !new.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Some(Value::Object(patch))
        }
        _ => Some(new.clone()),
    }
}

/// Apply a JSON merge patch (RFC 7386) in place
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                apply_merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
