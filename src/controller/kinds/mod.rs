//! # Managed Kinds
//!
//! One [`ExternalClient`](crate::controller::managed::ExternalClient) per
//! custom resource kind. Each reads the external object by the GUID in the
//! external-name annotation, compares it with `forProvider` and issues the
//! create, update or delete the generic loop decides on.

pub mod domain;
pub mod mta;
pub mod org_quota;
pub mod organization;
pub mod space;
pub mod space_members;

use crate::controller::managed::{Resolution, ResolvedParams};
use crate::controller::operation::poll_job_complete;
use crate::controller::resolver::Resolved;
use crate::crd::Managed;
use crate::error::{Error, Result};
use crate::provider::{ApiError, ApiResult, JobApi};
use kube::ResourceExt;
use std::time::Duration;
use tracing::debug;

/// Write a resolved GUID into the parameters
pub(crate) fn apply_resolved<P: Clone>(
    resolved: Resolved,
    params: &mut ResolvedParams<P>,
    set: impl Fn(&mut P, String),
) -> Resolution {
    match resolved {
        Resolved::Guid { guid, persist } => {
            params.write(persist, |p| set(p, guid.clone()));
            Resolution::Resolved
        }
        Resolved::Pending(reason) => Resolution::Pending(reason),
        Resolved::Unset => Resolution::Resolved,
    }
}

/// GUID recorded in the external-name annotation
pub(crate) fn external_guid<K: Managed>(resource: &K) -> Result<String> {
    resource.external_name().map(str::to_string).ok_or_else(|| {
        Error::permanent(format!("{} has no external name", resource.name_any()))
            .with("resource", resource.name_any())
    })
}

/// A resolved GUID field, or a pending-reference error
pub(crate) fn resolved_guid<'a>(guid: Option<&'a String>, field: &str) -> Result<&'a str> {
    guid.map(String::as_str)
        .filter(|g| !g.is_empty())
        .ok_or_else(|| Error::reference(format!("{field} is not resolved yet")).with("field", field))
}

/// Wait for a delete to finish; an already missing object counts as deleted
pub(crate) async fn await_deletion(
    jobs: &dyn JobApi,
    result: ApiResult<Option<String>>,
    deadline: Duration,
) -> Result<()> {
    match result {
        Ok(Some(job_id)) => {
            debug!("Waiting for deletion job {}", job_id);
            poll_job_complete(jobs, &job_id, deadline).await
        }
        Ok(None) | Err(ApiError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
