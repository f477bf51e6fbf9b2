//! Resolution of org and space reference blocks ahead of any provider call.

mod common;

use cf_provider_controller::controller::reconciler::{RequeueReason, TickOutcome};
use cf_provider_controller::controller::resolver::RefKind;
use cf_provider_controller::crd::{
    Managed, Mta, MtaFile, MtaParameters, MtaSpec, OrgReference, Reference, Selector, Space,
    SpaceParameters, SpaceReference, SpaceSpec,
};
use common::{condition, FakeCf, Harness, SPACE_GUID};
use std::collections::BTreeMap;

fn mta_in(space: SpaceReference) -> Mta {
    Mta::new(
        "demo",
        MtaSpec {
            for_provider: MtaParameters {
                space,
                file: Some(MtaFile {
                    url: "https://artifacts.example.com/demo-1.0.0.mtar".to_string(),
                    credentials: None,
                }),
                ..Default::default()
            },
            init_provider: None,
            management_policies: Default::default(),
            provider_config_ref: Default::default(),
        },
    )
}

fn selector(labels: &[(&str, &str)]) -> Selector {
    Selector {
        match_labels: labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[tokio::test]
async fn test_ambiguous_selector_is_an_error_without_provider_calls() {
    let harness = Harness::<Mta>::new(FakeCf::new());
    harness.references.add(RefKind::Space, "dev-a", &[("env", "dev")], Some(SPACE_GUID));
    harness.references.add(
        RefKind::Space,
        "dev-b",
        &[("env", "dev")],
        Some("7c9e6679-7425-40de-944b-e07fc1f90ae7"),
    );
    harness.store.insert(&mta_in(SpaceReference {
        space_selector: Some(selector(&[("env", "dev")])),
        ..Default::default()
    }));

    let err = harness.tick("demo").await.unwrap_err();

    assert_eq!(err.reason(), "ReferenceUnresolvable");
    assert!(err.to_string().contains("env=dev"), "{err}");
    assert_eq!(err.attributes().get("matches"), Some("2"));
    assert!(harness.cf.calls().is_empty());
    let synced = condition(&harness.store.get("demo").unwrap(), "Synced").unwrap();
    assert_eq!(synced.reason.as_deref(), Some("ReferenceUnresolvable"));
}

#[tokio::test]
async fn test_reference_without_external_name_is_pending() {
    let harness = Harness::<Mta>::new(FakeCf::new());
    harness.references.add(RefKind::Space, "dev", &[], None);
    harness.store.insert(&mta_in(SpaceReference {
        space_ref: Some(Reference {
            name: "dev".to_string(),
        }),
        ..Default::default()
    }));

    let outcome = harness.tick("demo").await.unwrap();

    assert_eq!(
        outcome,
        TickOutcome::Requeue {
            after: harness.config.requeue_pending_reference,
            reason: RequeueReason::PendingReference,
        }
    );
    assert!(harness.cf.calls().is_empty());
    let synced = condition(&harness.store.get("demo").unwrap(), "Synced").unwrap();
    assert!(!synced.is_true());
    assert_eq!(synced.reason.as_deref(), Some("ReferenceUnresolvable"));
    assert_eq!(
        synced.message.as_deref(),
        Some("Space dev has no external name yet")
    );
}

#[tokio::test]
async fn test_missing_referenced_resource_is_pending() {
    let harness = Harness::<Mta>::new(FakeCf::new());
    harness.store.insert(&mta_in(SpaceReference {
        space_ref: Some(Reference {
            name: "nowhere".to_string(),
        }),
        ..Default::default()
    }));

    let outcome = harness.tick("demo").await.unwrap();

    assert!(matches!(
        outcome,
        TickOutcome::Requeue {
            reason: RequeueReason::PendingReference,
            ..
        }
    ));
    assert!(harness.cf.calls().is_empty());
}

#[tokio::test]
async fn test_resolved_reference_is_written_back_to_the_spec() {
    let harness = Harness::<Mta>::new(FakeCf::new());
    harness.references.add(RefKind::Space, "dev", &[], Some(SPACE_GUID));
    harness.store.insert(&mta_in(SpaceReference {
        space_ref: Some(Reference {
            name: "dev".to_string(),
        }),
        ..Default::default()
    }));

    harness.tick("demo").await.unwrap();

    let stored = harness.store.json("demo").unwrap();
    assert_eq!(stored["spec"]["forProvider"]["space"], SPACE_GUID);
    assert_eq!(stored["spec"]["forProvider"]["spaceRef"]["name"], "dev");
    assert_eq!(harness.cf.state.lock().unwrap().uploads.len(), 1);
}

#[tokio::test]
async fn test_name_lookup_is_used_but_not_persisted() {
    let harness = Harness::<Mta>::new(FakeCf::new());
    let org = harness.cf.add_org("acme");
    harness.cf.add_space(SPACE_GUID, "dev", &org);
    harness.store.insert(&mta_in(SpaceReference {
        space_name: Some("dev".to_string()),
        org_name: Some("acme".to_string()),
        ..Default::default()
    }));

    harness.tick("demo").await.unwrap();

    assert!(harness
        .cf
        .calls()
        .contains(&"space_guid_by_name acme dev".to_string()));
    assert_eq!(harness.cf.state.lock().unwrap().uploads.len(), 1);
    let stored = harness.store.json("demo").unwrap();
    assert!(stored["spec"]["forProvider"].get("space").is_none());
}

#[tokio::test]
async fn test_space_created_in_referenced_organization() {
    let harness = Harness::<Space>::new(FakeCf::new());
    let org = harness.cf.add_org("acme");
    harness.references.add(RefKind::Organization, "acme", &[], Some(&org));
    harness.store.insert(&Space::new(
        "acme-dev",
        SpaceSpec {
            for_provider: SpaceParameters {
                name: "dev".to_string(),
                org: OrgReference {
                    org_ref: Some(Reference {
                        name: "acme".to_string(),
                    }),
                    ..Default::default()
                },
                allow_ssh: None,
            },
            init_provider: None,
            management_policies: Default::default(),
            provider_config_ref: Default::default(),
        },
    ));

    harness.tick_until_ready("acme-dev", 3).await;

    let stored = harness.store.get("acme-dev").unwrap();
    let observed = stored.at_provider().unwrap();
    assert_eq!(observed.org_guid.as_deref(), Some(org.as_str()));
    assert_eq!(stored.for_provider().org.org.as_deref(), Some(org.as_str()));
    assert_eq!(stored.external_name(), observed.guid.as_deref());
}
