//! Stateful Migration CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the stateful migration operator,
//! plus the Karmada policy types the operator writes.

pub mod checkpoint_backup;
pub mod checkpoint_restore;
pub mod karmada;
pub mod labels;
pub mod references;
pub mod stateful_migration;

pub use checkpoint_backup::*;
pub use checkpoint_restore::*;
pub use karmada::*;
pub use labels::*;
pub use references::*;
pub use stateful_migration::*;
