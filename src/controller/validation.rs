//! # Validation
//!
//! Structural checks on managed resource specs and Kubernetes duration strings.
//!
//! Spec checks fail with [`Error::Validation`], which the error policy treats
//! as permanent until the spec changes.

use crate::crd::{
    DomainParameters, MtaParameters, OrgQuotaParameters, OrgReference, OrganizationParameters,
    SpaceMembersParameters, SpaceParameters, SpaceReference,
};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static GUID_REGEX: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$")
});

static URL_REGEX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$"));

/// Version rules accepted by the deploy-service
pub const VERSION_RULES: [&str; 3] = ["ALL", "SAME_HIGHER", "HIGHER"];

/// Parse Kubernetes duration string into std::time::Duration
/// Supports formats: "30s", "1m", "5m", "1h", "2h", "1d"
/// Returns Duration or error if format is invalid
pub fn parse_kubernetes_duration(duration_str: &str) -> anyhow::Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    let duration_regex = Regex::new(r"^(?P<number>\d+)(?P<unit>[smhd])$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let interval_lower = duration_trimmed.to_lowercase();

    let captures = duration_regex.captures(&interval_lower).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '30s', '5m', '1h')",
            duration_trimmed
        )
    })?;

    let number: u64 = captures["number"].parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid duration number '{}' in '{}': {}",
            &captures["number"],
            duration_trimmed,
            e
        )
    })?;

    if number == 0 {
        return Err(anyhow::anyhow!(
            "Duration number must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    let seconds = match &captures["unit"] {
        "s" => number,
        "m" => number * 60,
        "h" => number * 3600,
        "d" => number * 86400,
        unit => {
            return Err(anyhow::anyhow!(
                "Invalid unit '{}' in duration '{}'. Expected: s, m, h, or d",
                unit,
                duration_trimmed
            ));
        }
    };

    Ok(Duration::from_secs(seconds))
}

fn compiled(regex: &'static LazyLock<Result<Regex, regex::Error>>) -> Result<&'static Regex> {
    regex
        .as_ref()
        .map_err(|e| Error::validation(format!("Failed to compile regex: {e}")))
}

/// Validate an RFC 4122 GUID
pub fn validate_guid(guid: &str, field_name: &str) -> Result<()> {
    if !compiled(&GUID_REGEX)?.is_match(guid.trim()) {
        return Err(
            Error::validation(format!("{field_name} '{guid}' must be a valid GUID"))
                .with("field", field_name),
        );
    }
    Ok(())
}

/// Validate URL format: must start with http:// or https://
pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
    let url_trimmed = url.trim();
    if url_trimmed.is_empty() {
        return Err(Error::validation(format!("{field_name} cannot be empty")).with("field", field_name));
    }
    if !compiled(&URL_REGEX)?.is_match(url_trimmed) {
        return Err(Error::validation(format!(
            "{field_name} '{url_trimmed}' must be a valid URL starting with http:// or https://"
        ))
        .with("field", field_name));
    }
    Ok(())
}

pub fn validate_version_rule(rule: &str) -> Result<()> {
    if !VERSION_RULES.contains(&rule) {
        return Err(Error::validation(format!(
            "versionRule '{rule}' must be one of {}",
            VERSION_RULES.join(", ")
        ))
        .with("field", "versionRule"));
    }
    Ok(())
}

fn validate_name(name: &str, field_name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation(format!("{field_name} cannot be empty")).with("field", field_name));
    }
    Ok(())
}

fn validate_org_reference(org: &OrgReference) -> Result<()> {
    if let Some(guid) = &org.org {
        validate_guid(guid, "org")?;
    }
    Ok(())
}

fn validate_space_reference(space: &SpaceReference) -> Result<()> {
    if let Some(guid) = &space.space {
        validate_guid(guid, "space")?;
    }
    if space.space_name.is_some() != space.org_name.is_some() {
        return Err(Error::validation("spaceName and orgName must be set together")
            .with("field", "spaceName"));
    }
    if space.space.is_none()
        && space.space_ref.is_none()
        && space.space_selector.is_none()
        && space.space_name.is_none()
    {
        return Err(Error::validation(
            "one of space, spaceRef, spaceSelector or spaceName must be set",
        )
        .with("field", "space"));
    }
    Ok(())
}

pub fn validate_organization(params: &OrganizationParameters) -> Result<()> {
    validate_name(&params.name, "name")
}

pub fn validate_space(params: &SpaceParameters) -> Result<()> {
    validate_name(&params.name, "name")?;
    if params.org.is_empty() {
        return Err(Error::validation("one of org, orgRef, orgSelector or orgName must be set")
            .with("field", "org"));
    }
    validate_org_reference(&params.org)
}

pub fn validate_domain(params: &DomainParameters) -> Result<()> {
    validate_name(&params.name, "name")?;
    validate_org_reference(&params.org)
}

pub fn validate_org_quota(params: &OrgQuotaParameters) -> Result<()> {
    validate_name(&params.name, "name")?;
    for org in &params.orgs {
        validate_guid(org, "orgs")?;
    }
    Ok(())
}

pub fn validate_space_members(params: &SpaceMembersParameters) -> Result<()> {
    validate_space_reference(&params.space)?;
    if params.members.is_empty() {
        return Err(Error::validation("members must name at least one member")
            .with("field", "members"));
    }
    for member in &params.members {
        validate_name(&member.username, "members[].username")?;
    }
    Ok(())
}

pub fn validate_mta(params: &MtaParameters) -> Result<()> {
    validate_space_reference(&params.space)?;
    let files = params.all_files();
    if files.is_empty() {
        return Err(Error::validation("at least one of file or files must be set")
            .with("field", "file"));
    }
    for file in files {
        validate_url(&file.url, "file.url")?;
    }
    validate_version_rule(&params.version_rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Member, MtaFile};

    #[test]
    fn test_parse_kubernetes_duration() {
        assert_eq!(parse_kubernetes_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_kubernetes_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_kubernetes_duration(" 1H ").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_kubernetes_duration("1d").unwrap(), Duration::from_secs(86400));
        assert!(parse_kubernetes_duration("").is_err());
        assert!(parse_kubernetes_duration("0s").is_err());
        assert!(parse_kubernetes_duration("1w").is_err());
        assert!(parse_kubernetes_duration("1.5m").is_err());
    }

    #[test]
    fn test_validate_guid() {
        assert!(validate_guid("5c1a3f5e-9b1d-4c3a-8e2f-0a1b2c3d4e5f", "space").is_ok());
        let err = validate_guid("space-1", "space").unwrap_err();
        assert_eq!(err.reason(), "ValidationFailure");
        assert_eq!(err.attributes().get("field"), Some("space"));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://x/a.mtar", "file.url").is_ok());
        assert!(validate_url("http://host:8080/a.mtar", "file.url").is_ok());
        assert!(validate_url("ftp://x/a.mtar", "file.url").is_err());
        assert!(validate_url("   ", "file.url").is_err());
    }

    fn mta(files: Vec<&str>) -> MtaParameters {
        MtaParameters {
            space: SpaceReference {
                space: Some("5c1a3f5e-9b1d-4c3a-8e2f-0a1b2c3d4e5f".into()),
                ..Default::default()
            },
            files: files
                .into_iter()
                .map(|url| MtaFile {
                    url: url.into(),
                    credentials: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_mta_requires_a_file() {
        let err = validate_mta(&mta(vec![])).unwrap_err();
        assert!(err.to_string().contains("file"));
        assert!(validate_mta(&mta(vec!["https://x/a.mtar"])).is_ok());
    }

    #[test]
    fn test_validate_mta_version_rule() {
        let mut params = mta(vec!["https://x/a.mtar"]);
        params.version_rule = "LOWER".into();
        assert!(validate_mta(&params).is_err());
        params.version_rule = "ALL".into();
        assert!(validate_mta(&params).is_ok());
    }

    #[test]
    fn test_validate_space_name_needs_org_name() {
        let mut params = mta(vec!["https://x/a.mtar"]);
        params.space = SpaceReference {
            space_name: Some("dev".into()),
            ..Default::default()
        };
        assert!(validate_mta(&params).is_err());
        params.space.org_name = Some("acme".into());
        assert!(validate_mta(&params).is_ok());
    }

    #[test]
    fn test_validate_space_members_requires_members() {
        let mut params = SpaceMembersParameters {
            space: SpaceReference {
                space: Some("5c1a3f5e-9b1d-4c3a-8e2f-0a1b2c3d4e5f".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_space_members(&params).is_err());
        params.members.push(Member {
            username: "alice@example.com".into(),
            origin: None,
        });
        assert!(validate_space_members(&params).is_ok());
    }

    #[test]
    fn test_validate_space_requires_org() {
        let params = SpaceParameters {
            name: "dev".into(),
            ..Default::default()
        };
        assert!(validate_space(&params).is_err());
    }
}
