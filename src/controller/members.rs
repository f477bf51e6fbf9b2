//! # Member List Reconciliation
//!
//! Plans role grants and revocations for a desired member list.

use crate::constants::DEFAULT_ORIGIN;
use crate::crd::{EnforcementPolicy, Member};
use crate::provider::CfRole;

/// Normalized member identity: `lowercase(username + " (" + origin + ")")`
pub fn member_key(username: &str, origin: Option<&str>) -> String {
    format!("{} ({})", username, origin.unwrap_or(DEFAULT_ORIGIN)).to_lowercase()
}

/// Whether a desired member and a role holder are the same user
///
/// When either side omits the origin only usernames are compared.
pub fn is_same_member(member: &Member, role: &CfRole) -> bool {
    match (member.origin.as_deref(), role.origin.as_deref()) {
        (Some(_), Some(_)) => {
            member_key(&member.username, member.origin.as_deref())
                == member_key(&role.username, role.origin.as_deref())
        }
        _ => member.username.to_lowercase() == role.username.to_lowercase(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPlan {
    pub grant: Vec<Member>,
    pub revoke: Vec<CfRole>,
}

impl MemberPlan {
    pub fn is_empty(&self) -> bool {
        self.grant.is_empty() && self.revoke.is_empty()
    }
}

/// Grants for desired members without the role; revocations only under `Strict`
pub fn plan(desired: &[Member], observed: &[CfRole], policy: EnforcementPolicy) -> MemberPlan {
    let mut grant: Vec<Member> = Vec::new();
    for member in desired {
        let held = observed.iter().any(|role| is_same_member(member, role));
        let planned = grant
            .iter()
            .any(|g| g.username.eq_ignore_ascii_case(&member.username) && g.origin == member.origin);
        if !held && !planned {
            grant.push(member.clone());
        }
    }

    let revoke = match policy {
        EnforcementPolicy::Lax => Vec::new(),
        EnforcementPolicy::Strict => observed
            .iter()
            .filter(|role| !desired.iter().any(|member| is_same_member(member, role)))
            .cloned()
            .collect(),
    };

    MemberPlan { grant, revoke }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(username: &str, origin: Option<&str>) -> Member {
        Member {
            username: username.to_string(),
            origin: origin.map(str::to_string),
        }
    }

    fn role(guid: &str, username: &str, origin: &str) -> CfRole {
        CfRole {
            guid: guid.to_string(),
            username: username.to_string(),
            origin: Some(origin.to_string()),
        }
    }

    #[test]
    fn test_member_key_normalizes() {
        assert_eq!(member_key("Alice@Example.com", None), "alice@example.com (uaa)");
        assert_eq!(member_key("bob", Some("SAP.ids")), "bob (sap.ids)");
    }

    #[test]
    fn test_missing_origin_compares_usernames_only() {
        assert!(is_same_member(&member("ALICE", None), &role("r1", "alice", "sap.ids")));
        assert!(!is_same_member(&member("alice", Some("uaa")), &role("r1", "alice", "sap.ids")));
    }

    #[test]
    fn test_strict_grants_and_revokes() {
        let desired = vec![member("alice", Some("ids")), member("bob", Some("ids"))];
        let observed = vec![role("r1", "alice", "ids"), role("r2", "charlie", "ids")];

        let strict = plan(&desired, &observed, EnforcementPolicy::Strict);
        assert_eq!(strict.grant, vec![member("bob", Some("ids"))]);
        assert_eq!(strict.revoke, vec![role("r2", "charlie", "ids")]);

        let lax = plan(&desired, &observed, EnforcementPolicy::Lax);
        assert_eq!(lax.grant, vec![member("bob", Some("ids"))]);
        assert!(lax.revoke.is_empty());
    }

    #[test]
    fn test_converged_plan_is_empty() {
        let desired = vec![member("alice", None)];
        let observed = vec![role("r1", "alice", "uaa")];
        assert!(plan(&desired, &observed, EnforcementPolicy::Strict).is_empty());
    }

    #[test]
    fn test_duplicate_desired_members_are_granted_once() {
        let desired = vec![member("bob", None), member("BOB", None)];
        let p = plan(&desired, &[], EnforcementPolicy::Lax);
        assert_eq!(p.grant.len(), 1);
    }
}
