//! Well-known labels, finalizers and names shared by the controller and clients.

/// Marks a workload (or pod) as being under migration management
pub const CHECKPOINT_MIGRATION_LABEL: &str = "checkpoint-migration.dcn.io";

/// Finalizer held on a StatefulMigration until its derived objects are gone
pub const MIGRATION_BACKUP_FINALIZER: &str = "migrationbackup.migration.dcnlab.com/finalizer";

/// Correlates a CheckpointBackup with its StatefulMigration
pub const STATEFUL_MIGRATION_LABEL: &str = "stateful-migration";

/// Member cluster a CheckpointBackup is bound to
pub const TARGET_CLUSTER_LABEL: &str = "target-cluster";

/// Pod a CheckpointBackup checkpoints
pub const TARGET_POD_LABEL: &str = "target-pod";

/// Namespace shared by all migrations and propagated to every member cluster
pub const SHARED_NAMESPACE: &str = "stateful-migration";

/// Value of the `created-by` label on operator-created infrastructure objects
pub const CREATED_BY: &str = "stateful-migration-operator";

/// Label key prefixes owned by Karmada; values are preserved on policy updates
pub const KARMADA_SYSTEM_LABEL_PREFIXES: &[&str] = &["propagationpolicy.karmada.io/", "karmada.io/"];
