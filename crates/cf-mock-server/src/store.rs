//! In-memory Cloud Foundry state
//!
//! Holds organizations, spaces, domains, quotas, roles and the
//! deploy-service file jobs, operations and MTAs. Asynchronous work is
//! simulated with a poll counter: a job or operation reports `RUNNING`
//! for `polls_until_finished` reads and then settles.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tunables for a mock instance
#[derive(Debug, Clone)]
pub struct MockBehaviour {
    /// Number of job/operation reads answered with `RUNNING` before settling
    pub polls_until_finished: u32,
    /// When set, deploy operations settle as `ERROR` with this message
    pub fail_deploys_with: Option<String>,
    /// MTA id reported by deploy operations
    pub mta_id: String,
    /// Modules reported for an MTA deployed without an explicit module list
    pub mta_modules: Vec<String>,
    /// Username/password accepted by the token endpoint
    pub username: String,
    pub password: String,
}

impl Default for MockBehaviour {
    fn default() -> Self {
        Self {
            polls_until_finished: 1,
            fail_deploys_with: None,
            mta_id: "com.example.demo".to_string(),
            mta_modules: vec!["web".to_string(), "srv".to_string()],
            username: "admin@example.com".to_string(),
            password: "secret".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileJob {
    pub space: String,
    pub file_id: String,
    pub file_url: String,
    pub app_instance: String,
    pub polls_remaining: u32,
}

#[derive(Debug, Clone)]
pub struct MtaOperation {
    pub space: String,
    pub process_type: String,
    pub mta_id: String,
    pub modules: Vec<String>,
    pub namespace: Option<String>,
    pub polls_remaining: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeployedMta {
    pub modules: Vec<String>,
    pub namespace: Option<String>,
}

/// CF-side records
#[derive(Debug, Default)]
pub struct Records {
    pub organizations: BTreeMap<String, Value>,
    pub spaces: BTreeMap<String, Value>,
    pub space_ssh: HashMap<String, bool>,
    pub domains: BTreeMap<String, Value>,
    pub org_quotas: BTreeMap<String, Value>,
    pub roles: BTreeMap<String, Value>,
    pub users: BTreeMap<String, Value>,
    /// CF v3 jobs and their remaining `PROCESSING` reads
    pub cf_jobs: HashMap<String, u32>,
    pub file_jobs: HashMap<String, FileJob>,
    pub extensions: HashMap<String, String>,
    pub operations: HashMap<String, MtaOperation>,
    /// Keyed by `(space, mta id)`
    pub mtas: HashMap<(String, String), DeployedMta>,
    /// Bearer tokens currently accepted
    pub tokens: Vec<String>,
    /// Submitted deploy-service operation request bodies, in order
    pub submitted: Vec<Value>,
}

/// Shared mock state handed to every handler
#[derive(Debug, Clone)]
pub struct MockState {
    pub behaviour: Arc<RwLock<MockBehaviour>>,
    pub records: Arc<RwLock<Records>>,
    sequence: Arc<AtomicU64>,
    pub token_requests: Arc<AtomicU64>,
}

impl MockState {
    pub fn new(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour: Arc::new(RwLock::new(behaviour)),
            records: Arc::new(RwLock::new(Records::default())),
            sequence: Arc::new(AtomicU64::new(1)),
            token_requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Next identifier with the given prefix (`org-1`, `job-2`, ...)
    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{n}")
    }

    /// Revoke every issued token so the next authenticated call gets a 401
    pub async fn expire_tokens(&self) {
        self.records.write().await.tokens.clear();
    }

    /// Register a user that roles may be assigned to
    pub async fn add_user(&self, username: &str, origin: &str) -> String {
        let guid = self.next_id("user");
        let user = serde_json::json!({
            "guid": guid,
            "username": username,
            "origin": origin,
        });
        self.records.write().await.users.insert(guid.clone(), user);
        guid
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(MockBehaviour::default())
    }
}
