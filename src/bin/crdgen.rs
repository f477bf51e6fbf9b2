//! Print every custom resource definition as one multi-document YAML stream
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::Result;
use cf_provider_controller::crd::{
    Domain, Mta, OrgQuota, Organization, ProviderConfig, Space, SpaceMembers,
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let crds: Vec<CustomResourceDefinition> = vec![
        ProviderConfig::crd(),
        Organization::crd(),
        Space::crd(),
        Domain::crd(),
        OrgQuota::crd(),
        SpaceMembers::crd(),
        Mta::crd(),
    ];
    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
