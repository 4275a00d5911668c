//! Incremental deployment.
//!
//! Deciding what changed ([`ChangeFilter`]), remembering what was deployed
//! ([`DeploymentLedger`]), and running install/build/publish in dependency
//! order ([`Orchestrator`]).

mod filter;
mod ledger;
mod orchestrator;
mod remote;
mod result;

pub use filter::{ChangeFilter, version_changed};
pub use ledger::{DeploymentLedger, LEDGER_FILE};
pub use orchestrator::{NOTHING_TO_DEPLOY, Orchestrator};
pub use remote::RemoteSnapshot;
pub use result::{DEPLOYMENT_RESULT_FILE, DeploymentReport, DeploymentResult};

/// Source of "last deployed version" per package name.
pub trait VersionBaseline {
    fn deployed_version(&self, name: &str) -> Option<&str>;
}
