//! hostkeep common - maintenance pipeline for Proxmox/Debian hosts
//!
//! Every external effect goes through the [`exec::Host`] trait, and the
//! privilege prefix travels as an explicit [`exec::Escalation`] value.

pub mod config;
pub mod error;
pub mod exec;
pub mod packages;
pub mod pipeline;
pub mod privilege;
pub mod prompt;
pub mod remediation;
pub mod report;
pub mod repository;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;
pub mod ui;

pub use config::HostkeepConfig;
pub use error::{HostkeepError, Result};
pub use exec::{Escalation, Host, LiveHost};
pub use pipeline::{Pipeline, RunSummary};
