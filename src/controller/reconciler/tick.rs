//! # Reconcile Tick
//!
//! One pass of the generic managed-resource loop:
//!
//! 1. honour deletion without the `Delete` policy, keep the finalizer in step
//! 2. resolve references, re-queueing while a dependency is pending
//! 3. observe, adopting or clearing the external name
//! 4. delete when the resource is being deleted
//! 5. late-initialize unset parameters, then observe again
//! 6. wait, create, update or report ready
//!
//! A tick never waits on running provider work; it records what it started
//! in status and asks to be re-queued. Status is written only when it
//! changed, so a tick over converged state leaves the resource untouched.

use super::store::{merge_patch_diff, ResourceStore};
use crate::config::ControllerConfig;
use crate::constants::{EXTERNAL_NAME_ANNOTATION, FINALIZER};
use crate::controller::drift::FillUnset;
use crate::controller::managed::{ClientDeps, ExternalObservation, ManagedKind, Resolution, ResolvedParams};
use crate::controller::resolver::{ReferenceStore, Resolver};
use crate::controller::secrets::SecretReader;
use crate::crd::{Condition, Managed, ManagementAction};
use crate::error::{Error, Result};
use crate::provider::Connector;
use kube::ResourceExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const REASON_REFERENCE_UNRESOLVABLE: &str = "ReferenceUnresolvable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueReason {
    InFlight,
    Steady,
    PendingReference,
}

impl RequeueReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InFlight => "in-flight",
            Self::Steady => "steady",
            Self::PendingReference => "pending-reference",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Requeue {
        after: Duration,
        reason: RequeueReason,
    },
    /// Nothing to do until the resource changes
    AwaitChange,
}

/// Collaborators of a tick
pub struct TickContext<'a, K> {
    pub connector: &'a dyn Connector,
    pub references: &'a dyn ReferenceStore,
    pub secrets: Arc<dyn SecretReader>,
    pub store: &'a dyn ResourceStore<K>,
    pub config: &'a ControllerConfig,
}

impl<K> TickContext<'_, K> {
    fn requeue(&self, reason: RequeueReason) -> TickOutcome {
        let after = match reason {
            RequeueReason::InFlight => self.config.requeue_in_flight,
            RequeueReason::Steady => self.config.requeue_steady,
            RequeueReason::PendingReference => self.config.requeue_pending_reference,
        };
        TickOutcome::Requeue { after, reason }
    }
}

/// Resource under reconciliation plus the status last written
struct Tracked<K> {
    resource: K,
    persisted_status: Value,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn status_value<K: Managed>(resource: &K) -> Result<Value> {
    serde_json::to_value(resource.managed_status())
        .map_err(|e| Error::permanent(format!("failed to serialize status: {e}")))
}

/// Run one tick
///
/// On error the `Synced` condition records the error kind and message
/// before the error is returned to the error policy.
pub async fn run_tick<K: ManagedKind>(ctx: &TickContext<'_, K>, resource: K) -> Result<TickOutcome> {
    let persisted_status = status_value(&resource)?;
    let mut tracked = Tracked {
        resource,
        persisted_status,
    };
    match tick(ctx, &mut tracked).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            tracked.set_condition(Condition::reconcile_error(err.reason(), err.to_string()));
            if let Err(persist_err) = tracked.persist_status(ctx).await {
                warn!(
                    "Failed to record error on {} {}: {}",
                    K::kind(&()),
                    tracked.resource.name_any(),
                    persist_err
                );
            }
            Err(err)
        }
    }
}

async fn tick<K: ManagedKind>(ctx: &TickContext<'_, K>, tracked: &mut Tracked<K>) -> Result<TickOutcome> {
    let kind = K::kind(&());
    let name = tracked.resource.name_any();
    let policies = tracked.resource.management_policies().clone();
    let deleting = tracked.resource.meta().deletion_timestamp.is_some();
    let has_finalizer = tracked.has_finalizer();

    if deleting && !(policies.allows(ManagementAction::Delete) && has_finalizer) {
        if has_finalizer {
            info!("{} {} is being deleted without the Delete policy, orphaning the external resource", kind, name);
            tracked.set_finalizer(ctx, false).await?;
        }
        return Ok(TickOutcome::AwaitChange);
    }

    if !deleting {
        K::validate(tracked.resource.for_provider())?;
        let wants_finalizer = policies.allows(ManagementAction::Delete);
        if wants_finalizer != has_finalizer {
            tracked.set_finalizer(ctx, wants_finalizer).await?;
        }
    }

    let providers = ctx
        .connector
        .connect(&tracked.resource.provider_config_ref().name)
        .await?;
    let client = K::external_client(ClientDeps {
        providers: providers.clone(),
        secrets: ctx.secrets.clone(),
        job_poll_deadline: ctx.config.job_poll_deadline,
    });

    let original = tracked.resource.for_provider().clone();
    let mut params = ResolvedParams::new(original.clone());
    let resolver = Resolver::new(ctx.references, providers.names.as_ref());
    if let Resolution::Pending(reason) = client.resolve_references(&resolver, &mut params).await? {
        info!("{} {} waiting for reference: {}", kind, name, reason);
        tracked.set_condition(Condition::reconcile_error(REASON_REFERENCE_UNRESOLVABLE, reason));
        tracked.persist_status(ctx).await?;
        return Ok(ctx.requeue(RequeueReason::PendingReference));
    }
    if params.persisted != original {
        tracked.patch_parameters(ctx, &original, &params.persisted).await?;
    }
    *tracked.resource.for_provider_mut() = params.working.clone();

    let mut observation = client.observe(&mut tracked.resource).await?;
    tracked.sync_external_name(ctx, &observation).await?;

    if deleting {
        if observation.resource_exists {
            tracked.set_condition(Condition::deleting());
            tracked.set_condition(Condition::reconcile_success());
            tracked.persist_status(ctx).await?;
            info!("Deleting external resource of {} {}", kind, name);
            client.delete(&mut tracked.resource).await?;
        }
        tracked.set_finalizer(ctx, false).await?;
        return Ok(TickOutcome::AwaitChange);
    }

    if observation.resource_exists && policies.allows(ManagementAction::LateInitialize) {
        if let Some(observed) = tracked.resource.at_provider().cloned() {
            let mut late = params.persisted.clone();
            if client.late_initialize(&mut late, &observed) {
                debug!("Late-initialized parameters of {} {}", kind, name);
                tracked.patch_parameters(ctx, &params.persisted, &late).await?;
                client.late_initialize(tracked.resource.for_provider_mut(), &observed);
                observation = client.observe(&mut tracked.resource).await?;
            }
        }
    }

    if observation.in_flight {
        tracked.set_condition(Condition::creating(Some(
            "Waiting for an asynchronous operation".to_string(),
        )));
        tracked.set_condition(Condition::reconcile_success());
        tracked.persist_status(ctx).await?;
        return Ok(ctx.requeue(RequeueReason::InFlight));
    }

    if !observation.resource_exists {
        if !policies.allows(ManagementAction::Create) {
            tracked.set_condition(Condition::unavailable("External resource does not exist"));
            tracked.set_condition(Condition::reconcile_success());
            tracked.persist_status(ctx).await?;
            return Ok(ctx.requeue(RequeueReason::Steady));
        }

        let mut create_params = tracked.resource.for_provider().clone();
        if let Some(init) = tracked.resource.init_provider() {
            create_params.fill_unset(init);
        }
        let working = std::mem::replace(tracked.resource.for_provider_mut(), create_params);
        let created = client.create(&mut tracked.resource).await;
        *tracked.resource.for_provider_mut() = working;
        let created = created?;

        info!("Created external resource for {} {}", kind, name);
        if let Some(external_name) = created.external_name {
            tracked.write_external_name(ctx, Some(&external_name)).await?;
        }
        tracked.set_condition(Condition::creating(None));
        tracked.set_condition(Condition::reconcile_success());
        tracked.persist_status(ctx).await?;
        return Ok(ctx.requeue(RequeueReason::InFlight));
    }

    if !observation.resource_up_to_date && policies.allows(ManagementAction::Update) {
        info!("Updating external resource of {} {}", kind, name);
        client.update(&mut tracked.resource).await?;
        if tracked.condition_missing(crate::crd::TYPE_READY) {
            tracked.set_condition(Condition::creating(None));
        }
        tracked.set_condition(Condition::reconcile_success());
        tracked.persist_status(ctx).await?;
        return Ok(ctx.requeue(RequeueReason::InFlight));
    }

    tracked.set_condition(Condition::available());
    tracked.set_condition(Condition::reconcile_success());
    tracked.persist_status(ctx).await?;
    Ok(ctx.requeue(RequeueReason::Steady))
}

impl<K: Managed> Tracked<K> {
    fn set_condition(&mut self, condition: Condition) {
        self.resource
            .managed_status_mut()
            .set_condition(condition, &now());
    }

    fn condition_missing(&self, r#type: &str) -> bool {
        self.resource
            .managed_status()
            .and_then(|s| s.condition(r#type))
            .is_none()
    }

    fn has_finalizer(&self) -> bool {
        self.resource.finalizers().iter().any(|f| f == FINALIZER)
    }

    fn adopt(&mut self, updated: &K) {
        self.resource.meta_mut().resource_version = updated.meta().resource_version.clone();
    }

    async fn patch(&mut self, ctx: &TickContext<'_, K>, mut patch: Value) -> Result<()> {
        patch["metadata"]["resourceVersion"] = json!(self.resource.meta().resource_version);
        let updated = ctx.store.patch(&self.resource.name_any(), &patch).await?;
        self.adopt(&updated);
        Ok(())
    }

    async fn set_finalizer(&mut self, ctx: &TickContext<'_, K>, present: bool) -> Result<()> {
        let mut finalizers: Vec<String> = self
            .resource
            .finalizers()
            .iter()
            .filter(|f| *f != FINALIZER)
            .cloned()
            .collect();
        if present {
            finalizers.push(FINALIZER.to_string());
        }
        self.patch(ctx, json!({ "metadata": { "finalizers": finalizers } }))
            .await?;
        self.resource.meta_mut().finalizers = Some(finalizers);
        Ok(())
    }

    async fn write_external_name(
        &mut self,
        ctx: &TickContext<'_, K>,
        external_name: Option<&str>,
    ) -> Result<()> {
        self.patch(
            ctx,
            json!({ "metadata": { "annotations": { EXTERNAL_NAME_ANNOTATION: external_name } } }),
        )
        .await?;
        self.resource.set_external_name(external_name);
        Ok(())
    }

    /// Adopt the observed external name, or clear a stale one
    async fn sync_external_name(
        &mut self,
        ctx: &TickContext<'_, K>,
        observation: &ExternalObservation,
    ) -> Result<()> {
        let current = self.resource.external_name().map(str::to_string);
        if observation.resource_exists {
            if let Some(observed) = &observation.external_name {
                if current.as_deref() != Some(observed.as_str()) {
                    self.write_external_name(ctx, Some(observed)).await?;
                }
            }
        } else if current.is_some() && !observation.in_flight {
            info!(
                "External resource {} of {} no longer exists",
                current.as_deref().unwrap_or_default(),
                self.resource.name_any()
            );
            self.write_external_name(ctx, None).await?;
        }
        Ok(())
    }

    /// Write `forProvider` changes made by reference resolution or late-init
    async fn patch_parameters(
        &mut self,
        ctx: &TickContext<'_, K>,
        from: &K::Parameters,
        to: &K::Parameters,
    ) -> Result<()> {
        let from = serde_json::to_value(from)
            .map_err(|e| Error::permanent(format!("failed to serialize parameters: {e}")))?;
        let to = serde_json::to_value(to)
            .map_err(|e| Error::permanent(format!("failed to serialize parameters: {e}")))?;
        if let Some(diff) = merge_patch_diff(&from, &to) {
            self.patch(ctx, json!({ "spec": { "forProvider": diff } }))
                .await?;
        }
        Ok(())
    }

    async fn persist_status(&mut self, ctx: &TickContext<'_, K>) -> Result<()> {
        let status = status_value(&self.resource)?;
        let Some(diff) = merge_patch_diff(&self.persisted_status, &status) else {
            return Ok(());
        };
        let patch = json!({
            "metadata": { "resourceVersion": self.resource.meta().resource_version },
            "status": diff,
        });
        match ctx.store.patch_status(&self.resource.name_any(), &patch).await {
            Ok(updated) => {
                self.adopt(&updated);
                self.persisted_status = status;
                Ok(())
            }
            Err(Error::Kube {
                source: kube::Error::Api(response),
                ..
            }) if response.code == 404 => {
                debug!("{} was deleted during reconciliation, skipping status update", self.resource.name_any());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
