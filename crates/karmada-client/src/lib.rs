//! Karmada Client
//!
//! Clients for the Karmada control plane used by the stateful migration
//! operator: PropagationPolicy management and member cluster access through
//! the aggregated cluster proxy.
//!
//! # Example
//!
//! ```no_run
//! use karmada_client::{
//!     CrdSource, MemberClusterClient, MemberClusterClientTrait, PropagationClient,
//!     PropagationClientTrait, karmada_client_from_kubeconfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = karmada_client_from_kubeconfig("/etc/karmada/kubeconfig").await?;
//!
//! // Verify the control plane answers
//! let policies = PropagationClient::new(client.clone());
//! policies.test_connection().await?;
//!
//! // Read a pod on member cluster "member1"
//! let members = MemberClusterClient::new(client, CrdSource::default());
//! let pod = members.get_pod("member1", "default", "app-0").await?;
//!
//! // Make sure the CheckpointBackup CRD is installed there
//! members.ensure_crd("member1").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Cluster proxy**: get/list/update pods on member clusters
//! - **Bootstrap**: namespace and CRD installation with file and built-in CRD sources
//! - **Policies**: get/create/replace/delete PropagationPolicies
//! - **test-util**: in-memory mocks of both client traits

pub mod crd_source;
pub mod error;
pub mod member;
pub mod propagation;
pub mod proxy;
#[path = "trait.rs"]
pub mod karmada_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use crd_source::{CrdOrigin, CrdSource, DEFAULT_CRD_SEARCH_PATHS};
pub use error::KarmadaError;
pub use karmada_trait::{MemberClusterClientTrait, PropagationClientTrait};
pub use member::MemberClusterClient;
pub use propagation::{PropagationClient, karmada_client_from_kubeconfig};
#[cfg(feature = "test-util")]
pub use mock::{MockMemberClusterClient, MockPropagationClient};
