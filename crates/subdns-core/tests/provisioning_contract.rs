//! Contract Test: Provisioning
//!
//! Constraints verified:
//! - Record shape follows the mapping (CNAME vs SRV) and the target
//!   (address record only for literal IP targets)
//! - Address records are created strictly before the SRV record
//! - Admission failures (validation, availability, quota, uniqueness,
//!   missing port) make no provider call
//! - Provider failures abort without rollback and report orphans
//! - A subdomain row exists only after every provider call succeeded

mod common;

use common::*;
use subdns_core::engine::{EngineEvent, ProvisionRequest};
use subdns_core::model::{NetworkTarget, NewDomain, ProtocolMapping, RecordKind, Transport, Workload};
use subdns_core::traits::{RecordType, SubdomainStore};
use subdns_core::{Error, ErrorKind};
use tokio_test::assert_err;

fn request(domain_id: u64, workload_id: u64, label: &str) -> ProvisionRequest {
    ProvisionRequest {
        domain_id,
        workload_id,
        label: label.to_string(),
    }
}

#[tokio::test]
async fn cname_mapping_creates_exactly_one_cname() {
    let h = harness(10);
    let domain = h.play_domain().await;
    let long_label = "a".repeat(63);

    for label in ["mc", "a-b", "0x", long_label.as_str()] {
        h.gateway.clear_calls();
        let subdomain = h
            .engine
            .provision(request(domain.id, CNAME_WORKLOAD, label))
            .await
            .expect("provisioning succeeds");

        let fqdn = format!("{}.{}", label, DOMAIN);
        assert_eq!(subdomain.kind, RecordKind::Cname);
        assert_eq!(subdomain.port, None);
        assert_eq!(subdomain.label, label);
        assert!(subdomain.record_id.is_some());
        assert_eq!(h.gateway.creates(), vec![(RecordType::Cname, fqdn.clone())]);

        let records = h.gateway.records_named(RecordType::Cname, &fqdn);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "node1.hosting.example");
        assert_eq!(Some(&records[0].id), subdomain.record_id.as_ref());
    }

    assert_eq!(h.store.count_by_workload(CNAME_WORKLOAD).await.unwrap(), 4);
}

#[tokio::test]
async fn ipv4_target_creates_address_record_then_srv() {
    let h = harness(1);
    let domain = h.play_domain().await;

    let subdomain = h
        .engine
        .provision(request(domain.id, SRV_IPV4_WORKLOAD, "mc"))
        .await
        .unwrap();

    assert_eq!(subdomain.kind, RecordKind::Srv);
    assert_eq!(subdomain.port, Some(25565));

    assert_eq!(
        h.gateway.creates(),
        vec![
            (RecordType::A, "mc.play.example.com".to_string()),
            (RecordType::Srv, "_minecraft._tcp.mc.play.example.com".to_string()),
        ]
    );

    let address = h.gateway.records_named(RecordType::A, "mc.play.example.com");
    assert_eq!(address.len(), 1);
    assert_eq!(address[0].content, "10.0.0.5");

    let srv = h
        .gateway
        .records_named(RecordType::Srv, "_minecraft._tcp.mc.play.example.com");
    assert_eq!(srv.len(), 1);
    assert_eq!(srv[0].content, "1 1 25565 mc.play.example.com");
    assert_eq!(Some(&srv[0].id), subdomain.record_id.as_ref());
}

#[tokio::test]
async fn ipv6_target_creates_aaaa_record() {
    let h = harness(1);
    let domain = h.play_domain().await;

    h.engine
        .provision(request(domain.id, SRV_IPV6_WORKLOAD, "bedrock"))
        .await
        .unwrap();

    let address = h
        .gateway
        .records_named(RecordType::Aaaa, "bedrock.play.example.com");
    assert_eq!(address.len(), 1);
    assert_eq!(address[0].content, "2001:db8::5");
    assert!(h.gateway.records_named(RecordType::A, "bedrock.play.example.com").is_empty());
}

#[tokio::test]
async fn hostname_alias_target_skips_address_record() {
    let h = harness(1);
    let domain = h.play_domain().await;

    h.engine
        .provision(request(domain.id, SRV_ALIAS_WORKLOAD, "mc"))
        .await
        .unwrap();

    assert_eq!(
        h.gateway.creates(),
        vec![(RecordType::Srv, "_minecraft._tcp.mc.play.example.com".to_string())]
    );
    let srv = h
        .gateway
        .records_named(RecordType::Srv, "_minecraft._tcp.mc.play.example.com");
    assert_eq!(srv[0].content, "1 1 25565 mc.hosting.example");
}

#[tokio::test]
async fn transport_and_srv_parameters_come_from_mapping() {
    let h = harness(1);
    let mapping = ProtocolMapping::new(SRV_RECIPE)
        .with_service("_bedrock")
        .with_transport(Transport::Udp)
        .with_priority(10)
        .with_weight(5)
        .with_ttl(300);
    let domain = h
        .engine
        .register_domain(NewDomain::new("udp.example.com", vec![mapping]))
        .await
        .unwrap();
    h.gateway.add_zone("udp.example.com", "zone-2");

    h.engine
        .provision(request(domain.id, SRV_ALIAS_WORKLOAD, "pe"))
        .await
        .unwrap();

    let srv = h
        .gateway
        .records_named(RecordType::Srv, "_bedrock._udp.pe.udp.example.com");
    assert_eq!(srv.len(), 1);
    assert_eq!(srv[0].zone_id, "zone-2");
    assert_eq!(srv[0].content, "10 5 25565 mc.hosting.example");
}

#[tokio::test]
async fn label_is_normalized() {
    let h = harness(1);
    let domain = h.play_domain().await;

    let subdomain = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "  MyServer "))
        .await
        .unwrap();

    assert_eq!(subdomain.label, "myserver");
    assert_eq!(
        h.gateway.records_named(RecordType::Cname, "myserver.play.example.com").len(),
        1
    );
}

#[tokio::test]
async fn duplicate_label_conflicts_without_provider_calls() {
    let h = harness(1);
    let domain = h.play_domain().await;

    h.engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc"))
        .await
        .unwrap();
    h.gateway.clear_calls();

    let err = h
        .engine
        .provision(request(domain.id, OTHER_CNAME_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LabelConflict { ref label, .. } if label == "mc"));
    assert_eq!(err.code(), "SUBDOMAIN_EXISTS");
    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.store.count_by_workload(OTHER_CNAME_WORKLOAD).await.unwrap(), 0);
}

#[tokio::test]
async fn quota_exceeded_without_provider_calls() {
    let h = harness(1);
    let domain = h.play_domain().await;

    h.engine
        .provision(request(domain.id, CNAME_WORKLOAD, "first"))
        .await
        .unwrap();
    h.gateway.clear_calls();

    let err = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "second"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QuotaExceeded { limit: 1 }));
    assert_eq!(err.code(), "SUBDOMAIN_LIMIT_REACHED");
    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.store.count_by_workload(CNAME_WORKLOAD).await.unwrap(), 1);
}

#[tokio::test]
async fn zero_quota_still_allows_one_subdomain() {
    let h = harness(0);
    let domain = h.play_domain().await;

    h.engine
        .provision(request(domain.id, CNAME_WORKLOAD, "first"))
        .await
        .unwrap();
    let err = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "second"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { limit: 1 }));
}

#[tokio::test]
async fn invalid_labels_are_rejected_before_any_lookup() {
    let h = harness(1);
    let domain = h.play_domain().await;
    let too_long = "a".repeat(64);

    for label in ["a", "", "under_score", "dot.ted", "ünïcode", too_long.as_str()] {
        let err = h
            .engine
            .provision(request(domain.id, CNAME_WORKLOAD, label))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "label {:?}", label);
    }

    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn unavailable_domains() {
    let h = harness(1);
    let domain = h.play_domain().await;

    let mut inactive = NewDomain::new("off.example.com", play_mappings());
    inactive.active = false;
    let inactive = h.engine.register_domain(inactive).await.unwrap();
    h.gateway.clear_calls();

    let err = assert_err!(
        h.engine
            .provision(request(inactive.id, CNAME_WORKLOAD, "mc"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::NotAvailable);

    let err = assert_err!(h.engine.provision(request(999, CNAME_WORKLOAD, "mc")).await);
    assert_eq!(err.kind(), ErrorKind::NotAvailable);

    // Recipe without a mapping on this domain
    let err = assert_err!(
        h.engine
            .provision(request(domain.id, UNMAPPED_WORKLOAD, "mc"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::NotAvailable);

    let err = assert_err!(h.engine.provision(request(domain.id, 404, "mc")).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn srv_without_port_fails_before_provider_calls() {
    let h = harness(1);
    let domain = h.play_domain().await;

    let err = h
        .engine
        .provision(request(domain.id, SRV_NO_PORT_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PortMissing(202)));
    assert_eq!(err.code(), "ALLOCATION_PORT_MISSING");
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn existing_provider_record_blocks_creation() {
    let h = harness(1);
    let domain = h.play_domain().await;
    h.gateway
        .seed_record(RecordType::Cname, "mc.play.example.com", "elsewhere.example");

    let err = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RecordExists { ref name, .. } if name == "mc.play.example.com"));
    assert!(h.gateway.creates().is_empty());
    assert_eq!(h.store.count_by_workload(CNAME_WORKLOAD).await.unwrap(), 0);
}

#[tokio::test]
async fn existing_address_record_blocks_srv() {
    let h = harness(1);
    let domain = h.play_domain().await;
    h.gateway
        .seed_record(RecordType::A, "mc.play.example.com", "192.0.2.1");

    let err = h
        .engine
        .provision(request(domain.id, SRV_IPV4_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AddressRecordExists { .. }));
    assert_eq!(err.code(), "ADDRESS_RECORD_EXISTS");
    assert!(h.gateway.creates().is_empty());
}

#[tokio::test]
async fn address_record_failure_stops_before_srv() {
    let h = harness(1);
    let domain = h.play_domain().await;
    h.gateway.fail_creates(RecordType::A);

    let err = h
        .engine
        .provision(request(domain.id, SRV_IPV4_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AddressRecordCreateFailed(_)));
    assert_eq!(
        h.gateway.creates(),
        vec![(RecordType::A, "mc.play.example.com".to_string())]
    );
    assert!(h.gateway.records().is_empty());
    assert_eq!(h.store.count_by_workload(SRV_IPV4_WORKLOAD).await.unwrap(), 0);
}

#[tokio::test]
async fn srv_failure_leaves_address_record_and_reports_orphan() {
    let mut h = harness(1);
    let domain = h.play_domain().await;
    h.gateway.fail_creates(RecordType::Srv);

    let err = h
        .engine
        .provision(request(domain.id, SRV_IPV4_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);

    // No rollback
    let address = h.gateway.records_named(RecordType::A, "mc.play.example.com");
    assert_eq!(address.len(), 1);
    assert_eq!(h.store.count_by_workload(SRV_IPV4_WORKLOAD).await.unwrap(), 0);

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::OrphanRisk { record_ids, .. } if record_ids == &vec![address[0].id.clone()]
    )));
}

#[tokio::test]
async fn persistence_failure_reports_orphaned_records() {
    let mut h = harness(1);
    let domain = h.play_domain().await;
    h.store.fail_inserts();

    let err = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(err.code(), "SUBDOMAIN_CREATE_FAILED");

    let records = h.gateway.records_named(RecordType::Cname, "mc.play.example.com");
    assert_eq!(records.len(), 1);

    let events = h.drain_events();
    assert_eq!(
        events,
        vec![EngineEvent::OrphanRisk {
            zone_id: ZONE.to_string(),
            record_ids: vec![records[0].id.clone()],
            reason: "persisting mc.play.example.com failed".to_string(),
        }]
    );
}

#[tokio::test]
async fn successful_provisioning_emits_event() {
    let mut h = harness(1);
    let domain = h.play_domain().await;

    let subdomain = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc"))
        .await
        .unwrap();

    assert_eq!(
        h.drain_events(),
        vec![EngineEvent::SubdomainProvisioned {
            subdomain_id: subdomain.id,
            workload_id: CNAME_WORKLOAD,
            fqdn: "mc.play.example.com".to_string(),
            kind: RecordKind::Cname,
        }]
    );
}

#[tokio::test]
async fn zone_is_resolved_lazily_and_cached() {
    let h = harness_with(RecordingGateway::empty(), 10);

    // Zone unknown at registration time
    let domain = h
        .engine
        .register_domain(NewDomain::new(DOMAIN, play_mappings()))
        .await
        .unwrap();
    assert_eq!(domain.zone_id, None);

    let err = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ZoneResolutionFailed(_)));

    h.gateway.add_zone(DOMAIN, ZONE);
    h.gateway.clear_calls();

    h.engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc"))
        .await
        .unwrap();
    h.engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc2"))
        .await
        .unwrap();

    assert_eq!(h.gateway.zone_lookups(), 1);
    let stored = h.store.domain(domain.id).await.unwrap().unwrap();
    assert_eq!(stored.zone_id.as_deref(), Some(ZONE));
}

#[tokio::test]
async fn preflight_lookup_failure_is_a_provider_error() {
    let h = harness(1);
    let domain = h.play_domain().await;
    h.gateway.fail_lookups();

    let err = h
        .engine
        .provision(request(domain.id, CNAME_WORKLOAD, "mc"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert!(h.gateway.creates().is_empty());
}

#[tokio::test]
async fn provision_with_uses_the_given_target() {
    let h = harness(1);
    let domain = h.play_domain().await;
    let workload = Workload {
        id: 77,
        recipe_id: SRV_RECIPE,
        allocation_id: 9000,
    };
    let mapping = ProtocolMapping::new(SRV_RECIPE).with_service("_minecraft");

    let subdomain = h
        .engine
        .provision_with(
            &domain,
            &workload,
            "direct",
            &mapping,
            &NetworkTarget::new("198.51.100.7", 25570),
        )
        .await
        .unwrap();

    assert_eq!(subdomain.workload_id, 77);
    assert_eq!(subdomain.recipe_id, SRV_RECIPE);
    assert_eq!(subdomain.port, Some(25570));
    assert_eq!(
        h.gateway.records_named(RecordType::A, "direct.play.example.com")[0].content,
        "198.51.100.7"
    );
}

#[tokio::test]
async fn provision_with_rejects_bad_service_name() {
    let h = harness(1);
    let domain = h.play_domain().await;
    let workload = Workload {
        id: 77,
        recipe_id: SRV_RECIPE,
        allocation_id: 9000,
    };
    let mapping = ProtocolMapping::new(SRV_RECIPE).with_service("_mine craft");

    let err = h
        .engine
        .provision_with(
            &domain,
            &workload,
            "direct",
            &mapping,
            &NetworkTarget::new("198.51.100.7", 25570),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.gateway.calls().is_empty());
}
