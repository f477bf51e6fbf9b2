//! # Managed Resource Status
//!
//! Status types shared by every managed kind: the kind-specific
//! `atProvider` observation plus `Ready` and `Synced` conditions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const TYPE_READY: &str = "Ready";
pub const TYPE_SYNCED: &str = "Synced";

pub const REASON_AVAILABLE: &str = "Available";
pub const REASON_CREATING: &str = "Creating";
pub const REASON_DELETING: &str = "Deleting";
pub const REASON_UNAVAILABLE: &str = "Unavailable";
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";

/// Status of a managed resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[serde(bound(
    serialize = "O: Serialize",
    deserialize = "O: Deserialize<'de> + Default"
))]
#[schemars(bound = "O: JsonSchema + Default")]
pub struct ManagedStatus<O> {
    /// Last observation of the external resource
    #[serde(default)]
    pub at_provider: O,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (`Ready` or `Synced`)
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last time the status flipped
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    fn new(r#type: &str, status: bool, reason: &str, message: Option<String>) -> Self {
        Self {
            r#type: r#type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: None,
            reason: Some(reason.to_string()),
            message,
        }
    }

    pub fn available() -> Self {
        Self::new(TYPE_READY, true, REASON_AVAILABLE, None)
    }

    pub fn creating(message: Option<String>) -> Self {
        Self::new(TYPE_READY, false, REASON_CREATING, message)
    }

    pub fn deleting() -> Self {
        Self::new(TYPE_READY, false, REASON_DELETING, None)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(TYPE_READY, false, REASON_UNAVAILABLE, Some(message.into()))
    }

    pub fn reconcile_success() -> Self {
        Self::new(TYPE_SYNCED, true, REASON_RECONCILE_SUCCESS, None)
    }

    /// `Synced=False` with the error kind as reason
    pub fn reconcile_error(reason: &str, message: impl Into<String>) -> Self {
        Self::new(TYPE_SYNCED, false, reason, Some(message.into()))
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

impl<O> ManagedStatus<O> {
    pub fn condition(&self, r#type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == r#type)
    }

    /// Upsert a condition
    ///
    /// `lastTransitionTime` only moves when `status` flips, so re-applying
    /// the same condition leaves the status byte-identical.
    pub fn set_condition(&mut self, mut condition: Condition, now: &str) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            Some(existing) => {
                condition.last_transition_time = if existing.status == condition.status {
                    existing.last_transition_time.clone()
                } else {
                    Some(now.to_string())
                };
                *existing = condition;
            }
            None => {
                condition.last_transition_time = Some(now.to_string());
                self.conditions.push(condition);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_condition_keeps_transition_time_when_status_unchanged() {
        let mut status = ManagedStatus::<()>::default();
        status.set_condition(Condition::creating(None), "t1");
        status.set_condition(Condition::creating(Some("still going".into())), "t2");
        let ready = status.condition(TYPE_READY).unwrap();
        assert_eq!(ready.last_transition_time.as_deref(), Some("t1"));
        assert_eq!(ready.message.as_deref(), Some("still going"));

        status.set_condition(Condition::available(), "t3");
        let ready = status.condition(TYPE_READY).unwrap();
        assert_eq!(ready.last_transition_time.as_deref(), Some("t3"));
        assert!(ready.is_true());
    }

    #[test]
    fn test_conditions_are_keyed_by_type() {
        let mut status = ManagedStatus::<()>::default();
        status.set_condition(Condition::available(), "t1");
        status.set_condition(Condition::reconcile_error("OperationFailed", "boom"), "t1");
        assert_eq!(status.conditions.len(), 2);
        let synced = status.condition(TYPE_SYNCED).unwrap();
        assert_eq!(synced.reason.as_deref(), Some("OperationFailed"));
        assert!(!synced.is_true());
    }

    #[test]
    fn test_status_schema_carries_observation_and_conditions() {
        use kube::CustomResourceExt;
        let crd = serde_json::to_value(crate::crd::Mta::crd()).unwrap();
        let status = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]["status"];
        assert!(status["properties"]["atProvider"].is_object());
        assert!(status["properties"]["conditions"].is_object());
    }
}
