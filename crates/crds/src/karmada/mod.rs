//! Karmada policy types
//!
//! Only the subset of `policy.karmada.io` that the migration operator writes.
//! Fields Karmada adds on its own are ignored on read and dropped on replace.

pub mod propagation_policy;

pub use propagation_policy::*;
