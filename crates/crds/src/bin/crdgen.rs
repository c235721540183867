//! Prints the migration CRD manifests as a multi-document YAML stream.
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crd/migration.dcnlab.com.yaml
//! ```

use anyhow::Result;
use crds::{CheckpointBackup, CheckpointRestore, StatefulMigration};
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let crds = [
        StatefulMigration::crd(),
        CheckpointBackup::crd(),
        CheckpointRestore::crd(),
    ];

    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }

    Ok(())
}
