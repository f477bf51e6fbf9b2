//! # Cloud Foundry Provider Controller
//!
//! A Kubernetes controller that reconciles Cloud Foundry organizations,
//! spaces, domains, organization quotas, space role assignments and MTA
//! deployments declared as cluster-scoped custom resources.
//!
//! ## Overview
//!
//! Every managed kind runs through the same reconcile tick:
//!
//! 1. **Resolve references** - organization and space references become GUIDs
//! 2. **Observe** - read the external resource and record `status.atProvider`
//! 3. **Late-initialize** - copy provider defaults into unset spec fields
//! 4. **Dispatch** - create, update or delete as the management policies allow
//! 5. **Report** - `Ready` and `Synced` conditions
//!
//! `Mta` resources are driven by a state machine over the deploy-service's
//! asynchronous pipeline: archive upload, extension upload, deploy operation
//! and module verification.
//!
//! See the [README.md](../README.md) for usage.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod observability;
pub mod provider;
pub mod runtime;
