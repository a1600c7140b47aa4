//! Prints the ClusterConfig CRD manifest as YAML.
//!
//! ```text
//! cargo run -p crds --bin crdgen > config/crd/clusterconfig.yaml
//! ```

use crds::ClusterConfig;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&ClusterConfig::crd())?);
    Ok(())
}
