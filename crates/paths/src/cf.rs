//! Cloud Foundry v3 API paths

pub const API_PREFIX: &str = "/v3";

pub fn job(guid: &str) -> String {
    format!("{API_PREFIX}/jobs/{guid}")
}

pub fn organizations() -> String {
    format!("{API_PREFIX}/organizations")
}

pub fn organization(guid: &str) -> String {
    format!("{API_PREFIX}/organizations/{guid}")
}

pub fn spaces() -> String {
    format!("{API_PREFIX}/spaces")
}

pub fn space(guid: &str) -> String {
    format!("{API_PREFIX}/spaces/{guid}")
}

/// SSH is a space feature rather than a space attribute in v3
pub fn space_ssh_feature(guid: &str) -> String {
    format!("{API_PREFIX}/spaces/{guid}/features/ssh")
}

pub fn domains() -> String {
    format!("{API_PREFIX}/domains")
}

pub fn domain(guid: &str) -> String {
    format!("{API_PREFIX}/domains/{guid}")
}

pub fn organization_quotas() -> String {
    format!("{API_PREFIX}/organization_quotas")
}

pub fn organization_quota(guid: &str) -> String {
    format!("{API_PREFIX}/organization_quotas/{guid}")
}

pub fn organization_quota_organizations(guid: &str) -> String {
    format!("{API_PREFIX}/organization_quotas/{guid}/relationships/organizations")
}

pub fn roles() -> String {
    format!("{API_PREFIX}/roles")
}

pub fn role(guid: &str) -> String {
    format!("{API_PREFIX}/roles/{guid}")
}

/// Extract the trailing GUID from a job `Location` header
///
/// CF answers asynchronous deletes with `202 Accepted` and
/// `Location: https://api.example.com/v3/jobs/<guid>`.
pub fn job_guid_from_location(location: &str) -> Option<&str> {
    let (_, guid) = location.trim_end_matches('/').rsplit_once("/jobs/")?;
    if guid.is_empty() {
        None
    } else {
        Some(guid)
    }
}
