//! Shared API path definitions for Cloud Foundry v3, UAA and the MTA deploy-service
//!
//! This crate centralizes all API paths to ensure consistency
//! between the controller's REST client and the mock server.
//!
//! ## Builders
//!
//! Each API family has a module of builder functions that produce the
//! concrete request path for a given set of identifiers.
//!
//! ## Route Constants
//!
//! Route constants are provided for Axum routes, which require static string literals.
//! These constants are validated against the builder output in tests.

pub mod cf;
pub mod deploy_service;
pub mod uaa;

/// Axum route templates (axum 0.8 `{param}` syntax)
pub mod routes {
    pub const ROOT: &str = "/";
    pub const TOKEN: &str = "/oauth/token";

    pub const CF_JOB: &str = "/v3/jobs/{guid}";
    pub const CF_ORGANIZATIONS: &str = "/v3/organizations";
    pub const CF_ORGANIZATION: &str = "/v3/organizations/{guid}";
    pub const CF_SPACES: &str = "/v3/spaces";
    pub const CF_SPACE: &str = "/v3/spaces/{guid}";
    pub const CF_SPACE_SSH_FEATURE: &str = "/v3/spaces/{guid}/features/ssh";
    pub const CF_DOMAINS: &str = "/v3/domains";
    pub const CF_DOMAIN: &str = "/v3/domains/{guid}";
    pub const CF_ORG_QUOTAS: &str = "/v3/organization_quotas";
    pub const CF_ORG_QUOTA: &str = "/v3/organization_quotas/{guid}";
    pub const CF_ORG_QUOTA_ORGANIZATIONS: &str =
        "/v3/organization_quotas/{guid}/relationships/organizations";
    pub const CF_ROLES: &str = "/v3/roles";
    pub const CF_ROLE: &str = "/v3/roles/{guid}";

    pub const MTA_FILES: &str = "/api/v2/spaces/{space}/files";
    pub const MTA_FILES_ASYNC: &str = "/api/v2/spaces/{space}/files/async";
    pub const MTA_FILE_JOB: &str = "/api/v2/spaces/{space}/files/jobs/{job}";
    pub const MTA_OPERATIONS: &str = "/api/v2/spaces/{space}/operations";
    pub const MTA_OPERATION: &str = "/api/v2/spaces/{space}/operations/{operation}";
    pub const MTA: &str = "/api/v2/spaces/{space}/mtas/{mta}";
}
