//! # Controller
//!
//! Reconciliation of Cloud Foundry managed resources.
//!
//! - `reconciler` - the generic tick every managed kind runs through
//! - `kinds` - one external client per managed kind
//! - `mta` - the MTA deployment state machine
//! - `resolver`, `secrets` - cross-resource references and credentials
//! - `server` - metrics and probe endpoints

pub mod backoff;
pub mod drift;
pub mod fingerprint;
pub mod kinds;
pub mod managed;
pub mod members;
pub mod mta;
pub mod operation;
pub mod reconciler;
pub mod resolver;
pub mod secrets;
pub mod server;
pub mod validation;
