//! # MTA State Machine
//!
//! ```text
//! New ──upload archives──▶ ArchiveUpload ──all finished──▶ ExtensionUpload
//!                                                              │
//!   Failed ◀──terminal error── Deploying ◀──extension stored───┘
//!                                  │
//!                                  └──finished, modules recorded──▶ Ready
//! ```
//!
//! The phase is never stored; it is derived from the observation each tick.
//! Every submission is written into the observation before the tick ends and
//! nothing new is submitted while any operation is running, so a phase that
//! already completed is never repeated.
//!
//! Stale file observations are pruned to the desired URLs before uploading,
//! so in steady state the observed URLs equal the declared ones.

use crate::controller::fingerprint::{deployment_fingerprint, extension_hash, hashes_match};
use crate::controller::managed::ExternalObservation;
use crate::controller::operation::{self, Classification};
use crate::controller::secrets::{require_secret, SecretReader};
use crate::crd::{FileObservation, MtaFile, MtaObservation, MtaParameters, Operation};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::provider::{ApiError, DeployRequest, MtaApi, ProcessType, UndeployRequest};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Secret keys holding archive download credentials
const USERNAME_KEY: &str = "username";
const PASSWORD_KEY: &str = "password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    New,
    ArchiveUpload,
    ExtensionUpload,
    Deploying,
    Ready,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::ArchiveUpload => "ArchiveUpload",
            Self::ExtensionUpload => "ExtensionUpload",
            Self::Deploying => "Deploying",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        }
    }

    /// Derive the phase from the desired parameters and the observation
    pub fn of(params: &MtaParameters, obs: &MtaObservation) -> Self {
        if obs.files.is_empty() && obs.last_operation.is_none() && obs.mta_id.is_none() {
            return Self::New;
        }
        if obs
            .files
            .iter()
            .any(|f| operation::is_running(f.last_operation.as_ref()))
        {
            return Self::ArchiveUpload;
        }
        if operation::is_running(obs.last_operation.as_ref()) {
            return Self::Deploying;
        }
        if error_operation(params, obs).is_some() {
            return Self::Failed;
        }
        if !files_match(params, obs) {
            return Self::ArchiveUpload;
        }
        if extension_pending(params, obs) {
            return Self::ExtensionUpload;
        }
        if is_up_to_date(params, obs) {
            Self::Ready
        } else {
            Self::Deploying
        }
    }
}

/// Result of advancing the pipeline by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An operation was submitted or is still running
    InFlight,
    Ready,
}

/// First terminal-failed operation: the deploy, then files in declared order
pub fn error_operation(params: &MtaParameters, obs: &MtaObservation) -> Option<String> {
    if operation::classify(obs.last_operation.as_ref()) == Classification::Failed {
        return Some(operation::error_message(obs.last_operation.as_ref()));
    }
    params
        .all_files()
        .iter()
        .filter_map(|f| obs.find_file(&f.url))
        .find(|f| operation::classify(f.last_operation.as_ref()) == Classification::Failed)
        .map(|f| operation::error_message(f.last_operation.as_ref()))
}

pub fn has_running_operation(obs: &MtaObservation) -> bool {
    operation::is_running(obs.last_operation.as_ref())
        || obs
            .files
            .iter()
            .any(|f| operation::is_running(f.last_operation.as_ref()))
}

fn file_ready(file: &FileObservation) -> bool {
    file.id.is_some() && operation::classify(file.last_operation.as_ref()) == Classification::Finished
}

/// Observed URLs equal the declared ones and every upload finished
fn files_match(params: &MtaParameters, obs: &MtaObservation) -> bool {
    let desired: BTreeSet<&str> = params.all_files().iter().map(|f| f.url.as_str()).collect();
    let observed: BTreeSet<&str> = obs.files.iter().map(|f| f.url.as_str()).collect();
    desired == observed && obs.files.iter().all(file_ready)
}

fn extension_pending(params: &MtaParameters, obs: &MtaObservation) -> bool {
    params.extension.is_some()
        && (obs.mta_extension_id.is_none()
            || !hashes_match(
                obs.mta_extension_hash.as_deref().unwrap_or_default(),
                &extension_hash(params.extension.as_deref()),
            ))
}

fn modules_applied(params: &MtaParameters, obs: &MtaObservation) -> bool {
    match (&params.modules, &obs.mta_modules) {
        (_, None) => false,
        (Some(desired), Some(applied)) => desired == applied,
        (None, Some(_)) => true,
    }
}

fn is_up_to_date(params: &MtaParameters, obs: &MtaObservation) -> bool {
    !has_running_operation(obs)
        && files_match(params, obs)
        && !extension_pending(params, obs)
        && operation::classify(obs.last_operation.as_ref()) == Classification::Finished
        && obs.mta_deployment_hash.as_deref() == Some(deployment_fingerprint(params).as_str())
        && modules_applied(params, obs)
}

/// Summarize the observation for the generic loop
pub fn external_observation(params: &MtaParameters, obs: &MtaObservation) -> ExternalObservation {
    ExternalObservation {
        resource_exists: !obs.files.is_empty() || obs.mta_id.is_some() || obs.last_operation.is_some(),
        resource_up_to_date: is_up_to_date(params, obs),
        in_flight: has_running_operation(obs),
        external_name: obs.mta_id.clone(),
    }
}

/// Drives one MTA through the deploy-service
pub struct MtaMachine<'a> {
    api: &'a dyn MtaApi,
    secrets: &'a dyn SecretReader,
    space: &'a str,
}

impl<'a> MtaMachine<'a> {
    pub fn new(api: &'a dyn MtaApi, secrets: &'a dyn SecretReader, space: &'a str) -> Self {
        Self { api, secrets, space }
    }

    /// Refresh running operations and the deployed MTA into `obs`
    pub async fn observe(&self, params: &MtaParameters, obs: &mut MtaObservation) -> Result<()> {
        self.observe_files(obs).await?;

        let was_running = operation::is_running(obs.last_operation.as_ref());
        if was_running {
            self.observe_deploy(obs).await?;
        }

        if operation::classify(obs.last_operation.as_ref()) != Classification::Finished {
            return Ok(());
        }
        let Some(mta_id) = obs.mta_id.clone() else {
            return Ok(());
        };
        match self.api.get_mta(self.space, &mta_id).await? {
            Some(deployed) => {
                if was_running || obs.mta_modules.is_none() {
                    let fingerprint_current = obs.mta_deployment_hash.as_deref()
                        == Some(deployment_fingerprint(params).as_str());
                    obs.mta_modules = Some(match (&params.modules, fingerprint_current) {
                        (Some(modules), true) => modules.clone(),
                        _ => deployed.modules,
                    });
                    info!("MTA {} deployed with modules {:?}", mta_id, obs.mta_modules);
                }
                if params.extension.is_none()
                    && obs.mta_extension_id.is_some()
                    && obs.mta_deployment_hash.as_deref() == Some(deployment_fingerprint(params).as_str())
                {
                    debug!("Dropping extension of MTA {} after a deploy without one", mta_id);
                    obs.mta_extension_id = None;
                    obs.mta_extension_hash = None;
                }
            }
            None if !was_running => {
                warn!("MTA {} is no longer deployed in space {}", mta_id, self.space);
                *obs = MtaObservation::default();
            }
            None => {}
        }
        Ok(())
    }

    async fn observe_files(&self, obs: &mut MtaObservation) -> Result<()> {
        let mut lost: Vec<String> = Vec::new();
        for file in &mut obs.files {
            if !operation::is_running(file.last_operation.as_ref()) {
                continue;
            }
            let Some(job_id) = file.last_operation.as_ref().and_then(|o| o.id.clone()) else {
                continue;
            };
            match self
                .api
                .get_file_job(self.space, &job_id, file.app_instance.as_deref())
                .await
            {
                Ok(job) => {
                    if job.file_id.is_some() {
                        file.id = job.file_id;
                    }
                    file.last_operation = Some(Operation {
                        id: Some(job_id),
                        ..job.operation
                    });
                }
                Err(ApiError::NotFound(_)) => {
                    warn!("Upload job {} for {} disappeared, uploading again", job_id, file.url);
                    lost.push(file.url.clone());
                }
                Err(e) => return Err(Error::from(e).with("job", job_id)),
            }
        }
        obs.files.retain(|f| !lost.contains(&f.url));
        Ok(())
    }

    async fn observe_deploy(&self, obs: &mut MtaObservation) -> Result<()> {
        let Some(op_id) = obs.last_operation.as_ref().and_then(|o| o.id.clone()) else {
            return Ok(());
        };
        match self.api.get_operation(self.space, &op_id).await {
            Ok(status) => {
                obs.last_operation = Some(Operation {
                    id: Some(op_id),
                    ..status.operation
                });
                if let Some(mta_id) = status.mta_id.filter(|id| !id.is_empty()) {
                    obs.mta_id = Some(mta_id);
                }
            }
            Err(ApiError::NotFound(_)) => {
                warn!("Deploy operation {} disappeared, submitting again", op_id);
                obs.last_operation = None;
                obs.mta_deployment_hash = None;
            }
            Err(e) => return Err(Error::from(e).with("operation", op_id)),
        }
        Ok(())
    }

    /// Advance the pipeline by at most one phase
    pub async fn advance(&self, params: &MtaParameters, obs: &mut MtaObservation) -> Result<Step> {
        let desired = params.all_files();

        obs.files
            .retain(|f| desired.iter().any(|d| d.url == f.url));

        let mut uploaded = false;
        for file in &desired {
            if obs.find_file(&file.url).is_some() {
                continue;
            }
            let source = self.source_url(file).await?;
            let upload = self.api.upload_file(self.space, &source).await.map_err(|e| {
                Error::from(e).with("url", &file.url)
            })?;
            info!("Started upload of {} (job {})", file.url, upload.job_id);
            obs.files.push(FileObservation {
                id: None,
                url: file.url.clone(),
                app_instance: upload.app_instance,
                last_operation: Some(Operation::running(upload.job_id)),
            });
            uploaded = true;
        }
        obs.files.sort_by_key(|f| {
            desired
                .iter()
                .position(|d| d.url == f.url)
                .unwrap_or(usize::MAX)
        });
        if uploaded || has_running_operation(obs) {
            return Ok(Step::InFlight);
        }

        if let Some(file) = obs
            .files
            .iter()
            .find(|f| operation::classify(f.last_operation.as_ref()) == Classification::Failed)
        {
            let message = error_operation(params, obs)
                .unwrap_or_else(|| operation::error_message(file.last_operation.as_ref()));
            return Err(Error::operation_failed(message).with("url", &file.url));
        }
        if let Some(file) = obs.files.iter().find(|f| f.id.is_none()) {
            return Err(Error::permanent(format!(
                "upload of {} finished without a file id",
                file.url
            ))
            .with("url", &file.url));
        }

        if let Some(extension) = &params.extension {
            if extension_pending(params, obs) {
                let id = self.api.upload_extension(self.space, extension).await?;
                info!("Uploaded extension descriptor {}", id);
                obs.mta_extension_id = Some(id);
                obs.mta_extension_hash = Some(extension_hash(Some(extension)));
            }
        }

        let fingerprint = deployment_fingerprint(params);
        if obs.last_operation.is_none() || obs.mta_deployment_hash.as_deref() != Some(fingerprint.as_str()) {
            let request = DeployRequest {
                process_type: if params.blue_green_deploy {
                    ProcessType::BlueGreenDeploy
                } else {
                    ProcessType::Deploy
                },
                file_ids: desired
                    .iter()
                    .filter_map(|d| obs.find_file(&d.url).and_then(|f| f.id.clone()))
                    .collect(),
                extension_id: params
                    .extension
                    .as_ref()
                    .and(obs.mta_extension_id.clone()),
                modules: params.modules.clone(),
                namespace: params.namespace.clone(),
                version_rule: params.version_rule.clone(),
                abort_on_error: params.abort_on_error,
                delete_services: params.delete_services,
            };
            let op_id = self.api.deploy(self.space, &request).await?;
            info!(
                "Submitted {} of {} archive(s) (operation {})",
                request.process_type.as_str(),
                request.file_ids.len(),
                op_id
            );
            metrics::increment_mta_operations(request.process_type.as_str());
            obs.last_operation = Some(Operation::running(op_id));
            obs.mta_deployment_hash = Some(fingerprint);
            return Ok(Step::InFlight);
        }

        match error_operation(params, obs) {
            Some(message) => {
                let op_id = obs
                    .last_operation
                    .as_ref()
                    .and_then(|o| o.id.clone())
                    .unwrap_or_default();
                Err(Error::operation_failed(message).with("operation", op_id))
            }
            None => Ok(Step::Ready),
        }
    }

    /// Undeploy, waiting for any running deploy first
    pub async fn delete(
        &self,
        params: &MtaParameters,
        obs: &mut MtaObservation,
        deadline: Duration,
    ) -> Result<()> {
        if operation::is_running(obs.last_operation.as_ref()) {
            if let Some(op_id) = obs.last_operation.as_ref().and_then(|o| o.id.clone()) {
                info!("Waiting for operation {} before undeploying", op_id);
                match self.wait_for(&op_id, deadline).await {
                    Ok(()) | Err(Error::OperationFailed { .. }) => {}
                    Err(e) => return Err(e),
                }
                self.observe_deploy(obs).await?;
            }
        }

        let Some(mta_id) = obs.mta_id.clone() else {
            debug!("Nothing deployed, skipping undeploy");
            return Ok(());
        };
        let request = UndeployRequest {
            mta_id: mta_id.clone(),
            namespace: params.namespace.clone(),
            delete_services: params.delete_services,
        };
        let op_id = match self.api.undeploy(self.space, &request).await {
            Ok(op_id) => op_id,
            Err(ApiError::NotFound(_)) => {
                info!("MTA {} already undeployed", mta_id);
                return Ok(());
            }
            Err(e) => return Err(Error::from(e).with("mta", mta_id)),
        };
        info!("Submitted UNDEPLOY of MTA {} (operation {})", mta_id, op_id);
        metrics::increment_mta_operations(ProcessType::Undeploy.as_str());
        obs.last_operation = Some(Operation::running(op_id.clone()));
        self.wait_for(&op_id, deadline).await
    }

    async fn wait_for(&self, op_id: &str, deadline: Duration) -> Result<()> {
        let api = self.api;
        let space = self.space;
        operation::poll_until_complete(op_id, deadline, move || async move {
            api.get_operation(space, op_id)
                .await
                .map(|status| status.operation)
                .map_err(Error::from)
        })
        .await
    }

    /// Archive URL with download credentials embedded as user-info
    async fn source_url(&self, file: &MtaFile) -> Result<Zeroizing<String>> {
        let Some(credentials) = &file.credentials else {
            return Ok(Zeroizing::new(file.url.clone()));
        };
        let secret = require_secret(self.secrets, &credentials.namespace, &credentials.name).await?;
        let username = Zeroizing::new(secret.string(USERNAME_KEY)?);
        let password = Zeroizing::new(secret.string(PASSWORD_KEY)?);

        let invalid = || Error::validation(format!("cannot embed credentials into {}", file.url)).with("url", &file.url);
        let mut url = reqwest::Url::parse(&file.url).map_err(|_| invalid())?;
        url.set_username(&username).map_err(|()| invalid())?;
        url.set_password(Some(&password)).map_err(|()| invalid())?;
        Ok(Zeroizing::new(url.to_string()))
    }
}
