//! # cfctl
//!
//! Command-line interface for the Cloud Foundry provider controller.
//!
//! ## Usage
//!
//! ```bash
//! # List every managed resource, or only one kind
//! cfctl list
//! cfctl list --kind mta
//!
//! # Show conditions and the last observation of a resource
//! cfctl status --kind space --name dev
//!
//! # Ask the controller to reconcile a resource now
//! cfctl reconcile --kind mta --name billing
//! ```

use anyhow::{Context, Result};
use cf_provider_controller::constants::RECONCILE_REQUESTED_ANNOTATION;
use cf_provider_controller::crd::{
    Domain, Managed, Mta, OrgQuota, Organization, Space, SpaceMembers, TYPE_READY, TYPE_SYNCED,
};
use clap::{Parser, Subcommand, ValueEnum};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Organization,
    Space,
    Domain,
    OrgQuota,
    SpaceMembers,
    Mta,
}

const ALL_KINDS: [Kind; 6] = [
    Kind::Organization,
    Kind::Space,
    Kind::Domain,
    Kind::OrgQuota,
    Kind::SpaceMembers,
    Kind::Mta,
];

/// Run `$body` with `$t` bound to the resource type of `$kind`
macro_rules! with_kind {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            Kind::Organization => {
                type $t = Organization;
                $body
            }
            Kind::Space => {
                type $t = Space;
                $body
            }
            Kind::Domain => {
                type $t = Domain;
                $body
            }
            Kind::OrgQuota => {
                type $t = OrgQuota;
                $body
            }
            Kind::SpaceMembers => {
                type $t = SpaceMembers;
                $body
            }
            Kind::Mta => {
                type $t = Mta;
                $body
            }
        }
    };
}

/// Cloud Foundry provider controller CLI
#[derive(Parser)]
#[command(name = "cfctl")]
#[command(about = "Cloud Foundry provider controller CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List managed resources with their Ready and Synced conditions
    List {
        /// Only list this kind
        #[arg(short, long, value_enum)]
        kind: Option<Kind>,
    },
    /// Show conditions and the last observation of a managed resource
    Status {
        #[arg(short, long, value_enum)]
        kind: Kind,
        #[arg(short, long)]
        name: String,
    },
    /// Trigger an immediate reconcile by stamping an annotation
    Reconcile {
        #[arg(short, long, value_enum)]
        kind: Kind,
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cfctl=info".into()),
        )
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::List { kind } => {
            println!(
                "{:<14} {:<36} {:<8} {:<8} {}",
                "KIND", "NAME", "READY", "SYNCED", "EXTERNAL-NAME"
            );
            println!("{}", "-".repeat(100));
            for kind in kind.map_or_else(|| ALL_KINDS.to_vec(), |k| vec![k]) {
                with_kind!(kind, T => list_kind::<T>(client.clone()).await?);
            }
            Ok(())
        }
        Commands::Status { kind, name } => {
            with_kind!(kind, T => status_command::<T>(client, &name).await)
        }
        Commands::Reconcile { kind, name } => {
            with_kind!(kind, T => reconcile_command::<T>(client, &name).await)
        }
    }
}

fn condition_status<K: Managed>(resource: &K, r#type: &str) -> &'static str {
    match resource.managed_status().and_then(|s| s.condition(r#type)) {
        Some(c) if c.is_true() => "True",
        Some(_) => "False",
        None => "Unknown",
    }
}

async fn list_kind<K: Managed>(client: Client) -> Result<()> {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = Api::all(client);
    let resources = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("Failed to list {kind} resources"))?;
    for resource in resources.items {
        println!(
            "{:<14} {:<36} {:<8} {:<8} {}",
            kind,
            resource.name_any(),
            condition_status(&resource, TYPE_READY),
            condition_status(&resource, TYPE_SYNCED),
            resource.external_name().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn status_command<K: Managed>(client: Client, name: &str) -> Result<()> {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = Api::all(client);
    let resource = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get {kind} '{name}'"))?;

    println!("{kind} '{name}':\n");
    println!("Metadata:");
    if let Some(generation) = resource.meta().generation {
        println!("  Generation: {generation}");
    }
    println!(
        "  External Name: {}",
        resource.external_name().unwrap_or("<not set>")
    );
    if resource.meta().deletion_timestamp.is_some() {
        println!("  Deleting: true");
    }

    println!("\nManagement Policies: {:?}", resource.management_policies().0);
    println!("Provider Config: {}", resource.provider_config_ref().name);

    let Some(status) = resource.managed_status() else {
        println!("\nStatus: No status available (resource may not have been reconciled yet)");
        return Ok(());
    };

    if !status.conditions.is_empty() {
        println!("\nConditions:");
        for condition in &status.conditions {
            println!("  {}: {}", condition.r#type, condition.status);
            if let Some(reason) = &condition.reason {
                println!("    Reason: {reason}");
            }
            if let Some(message) = &condition.message {
                println!("    Message: {message}");
            }
            if let Some(time) = &condition.last_transition_time {
                println!("    Last Transition: {time}");
            }
        }
    }

    println!("\nAt Provider:");
    let observation = serde_yaml::to_string(&status.at_provider)
        .context("Failed to render the observation")?;
    for line in observation.lines() {
        println!("  {line}");
    }
    Ok(())
}

/// Stamp the reconcile annotation; the controller reacts to the metadata change
async fn reconcile_command<K: Managed>(client: Client, name: &str) -> Result<()> {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = Api::all(client);
    let timestamp = chrono::Utc::now().to_rfc3339();
    let patch = json!({
        "metadata": {
            "annotations": { RECONCILE_REQUESTED_ANNOTATION: timestamp }
        }
    });

    api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to trigger reconciliation for {kind} '{name}'"))?;

    println!("Reconciliation triggered for {kind} '{name}' at {timestamp}");
    Ok(())
}
