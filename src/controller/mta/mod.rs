//! # MTA Deployment
//!
//! The deploy pipeline of an [`Mta`](crate::crd::Mta): archive uploads,
//! extension descriptor upload, deploy submission and undeploy. All progress
//! lives in `status.atProvider`; see [`machine`] for the phases.

pub mod machine;

pub use machine::{error_operation, MtaMachine, Phase, Step};
