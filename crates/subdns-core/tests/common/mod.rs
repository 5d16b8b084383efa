//! Test doubles and common utilities for engine contract tests
//!
//! - [`RecordingGateway`]: an in-memory DNS provider that records every call
//!   and can be told to fail specific operations
//! - [`FlakyStore`]: a `MemoryStore` wrapper with switchable write failures
//! - [`harness`]: an engine wired to both, with a fixed inventory

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subdns_core::engine::{EngineEvent, SubdomainEngine};
use subdns_core::model::{
    Allocation, Domain, DomainId, DomainUpdate, NewDomain, NewSubdomain, Node, ProtocolMapping, Subdomain,
    SubdomainId, Workload, WorkloadId,
};
use subdns_core::traits::{DnsGateway, RecordSpec, RecordType, SubdomainStore};
use subdns_core::{EngineConfig, Error, MemoryStore, Result, StaticInventory};
use tokio::sync::mpsc;

pub const DOMAIN: &str = "play.example.com";
pub const ZONE: &str = "zone-1";

/// Recipe mapped to a plain CNAME
pub const CNAME_RECIPE: u64 = 1;
/// Recipe mapped to `_minecraft._tcp` SRV records
pub const SRV_RECIPE: u64 = 2;
/// Known recipe that no domain offers
pub const UNMAPPED_RECIPE: u64 = 3;

/// CNAME workloads; allocation 100 on a node without public IP
pub const CNAME_WORKLOAD: WorkloadId = 10;
pub const OTHER_CNAME_WORKLOAD: WorkloadId = 11;
/// SRV workload whose node publishes 10.0.0.5
pub const SRV_IPV4_WORKLOAD: WorkloadId = 20;
/// SRV workload whose allocation has a hostname alias
pub const SRV_ALIAS_WORKLOAD: WorkloadId = 21;
/// SRV workload whose allocation has no port
pub const SRV_NO_PORT_WORKLOAD: WorkloadId = 22;
/// SRV workload bound to an IPv6 address
pub const SRV_IPV6_WORKLOAD: WorkloadId = 23;
/// SRV workload whose alias is a literal IP
pub const SRV_IP_ALIAS_WORKLOAD: WorkloadId = 24;
pub const UNMAPPED_WORKLOAD: WorkloadId = 12;
/// Extra CNAME workloads for concurrency tests
pub const POOL_WORKLOADS: std::ops::Range<WorkloadId> = 30..40;

/// One observed gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    ResolveZone(String),
    RecordAbsent(RecordType, String),
    Create(RecordType, String),
    Delete(String),
    DeleteByName(RecordType, String),
}

/// A record held by the fake provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRecord {
    pub id: String,
    pub zone_id: String,
    pub record_type: RecordType,
    pub name: String,
    /// CNAME/A/AAAA content, or "priority weight port target" for SRV
    pub content: String,
}

#[derive(Default)]
struct Failures {
    lookups: bool,
    creates: HashSet<RecordType>,
    deletes: bool,
}

/// In-memory DNS provider
pub struct RecordingGateway {
    zones: Mutex<HashMap<String, String>>,
    records: Mutex<Vec<FakeRecord>>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Mutex<Failures>,
    next_id: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl RecordingGateway {
    /// Gateway hosting [`DOMAIN`] as [`ZONE`]
    pub fn new() -> Self {
        let gateway = Self::empty();
        gateway.add_zone(DOMAIN, ZONE);
        gateway
    }

    /// Gateway with no zones
    pub fn empty() -> Self {
        Self {
            zones: Mutex::new(HashMap::new()),
            records: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Failures::default()),
            next_id: AtomicUsize::new(1),
            latency: Mutex::new(None),
        }
    }

    pub fn add_zone(&self, hostname: &str, zone_id: &str) {
        self.zones
            .lock()
            .unwrap()
            .insert(hostname.to_string(), zone_id.to_string());
    }

    /// Insert a record as if someone else created it
    pub fn seed_record(&self, record_type: RecordType, name: &str, content: &str) -> String {
        let id = self.mint_id();
        self.records.lock().unwrap().push(FakeRecord {
            id: id.clone(),
            zone_id: ZONE.to_string(),
            record_type,
            name: name.to_string(),
            content: content.to_string(),
        });
        id
    }

    pub fn records(&self) -> Vec<FakeRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn records_named(&self, record_type: RecordType, name: &str) -> Vec<FakeRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.record_type == record_type && r.name == name)
            .collect()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the create calls, in order
    pub fn creates(&self) -> Vec<(RecordType, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Create(t, n) => Some((t, n)),
                _ => None,
            })
            .collect()
    }

    pub fn zone_lookups(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, GatewayCall::ResolveZone(_)))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_lookups(&self) {
        self.failures.lock().unwrap().lookups = true;
    }

    pub fn fail_creates(&self, record_type: RecordType) {
        self.failures.lock().unwrap().creates.insert(record_type);
    }

    pub fn fail_deletes(&self) {
        self.failures.lock().unwrap().deletes = true;
    }

    /// Delay every call, to widen race windows
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    fn mint_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn enter(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn failure() -> Error {
        Error::provider("recording", "injected failure")
    }
}

#[async_trait]
impl DnsGateway for RecordingGateway {
    async fn resolve_zone(&self, hostname: &str) -> Result<Option<String>> {
        self.enter(GatewayCall::ResolveZone(hostname.to_string())).await;
        if self.failures.lock().unwrap().lookups {
            return Err(Self::failure());
        }
        Ok(self.zones.lock().unwrap().get(hostname).cloned())
    }

    async fn record_absent(&self, _zone_id: &str, record_type: RecordType, name: &str) -> Result<bool> {
        self.enter(GatewayCall::RecordAbsent(record_type, name.to_string()))
            .await;
        if self.failures.lock().unwrap().lookups {
            return Err(Self::failure());
        }
        Ok(self.records_named(record_type, name).is_empty())
    }

    async fn create_record(&self, zone_id: &str, spec: &RecordSpec) -> Result<String> {
        self.enter(GatewayCall::Create(spec.record_type(), spec.name().to_string()))
            .await;
        if self
            .failures
            .lock()
            .unwrap()
            .creates
            .contains(&spec.record_type())
        {
            return Err(Self::failure());
        }

        let content = match spec {
            RecordSpec::Simple { content, .. } => content.clone(),
            RecordSpec::Service {
                priority,
                weight,
                port,
                target,
                ..
            } => format!("{} {} {} {}", priority, weight, port, target),
        };

        let id = self.mint_id();
        self.records.lock().unwrap().push(FakeRecord {
            id: id.clone(),
            zone_id: zone_id.to_string(),
            record_type: spec.record_type(),
            name: spec.name().to_string(),
            content,
        });
        Ok(id)
    }

    async fn delete_record(&self, _zone_id: &str, record_id: &str) -> Result<bool> {
        self.enter(GatewayCall::Delete(record_id.to_string())).await;
        if self.failures.lock().unwrap().deletes {
            return Err(Self::failure());
        }
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != record_id);
        Ok(records.len() < before)
    }

    async fn delete_record_by_name(
        &self,
        _zone_id: &str,
        record_type: RecordType,
        name: &str,
    ) -> Result<bool> {
        self.enter(GatewayCall::DeleteByName(record_type, name.to_string()))
            .await;
        if self.failures.lock().unwrap().deletes {
            return Err(Self::failure());
        }
        let mut records = self.records.lock().unwrap();
        match records
            .iter()
            .position(|r| r.record_type == record_type && r.name == name)
        {
            Some(index) => {
                records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn gateway_name(&self) -> &'static str {
        "recording"
    }
}

/// MemoryStore with switchable write failures
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_inserts: AtomicBool,
    fail_bulk_deletes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_bulk_deletes(&self) {
        self.fail_bulk_deletes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubdomainStore for FlakyStore {
    async fn domain(&self, id: DomainId) -> Result<Option<Domain>> {
        self.inner.domain(id).await
    }

    async fn insert_domain(&self, domain: NewDomain) -> Result<Domain> {
        self.inner.insert_domain(domain).await
    }

    async fn update_domain(&self, id: DomainId, update: DomainUpdate) -> Result<Domain> {
        self.inner.update_domain(id, update).await
    }

    async fn delete_domain(&self, id: DomainId) -> Result<bool> {
        self.inner.delete_domain(id).await
    }

    async fn set_zone_id(&self, id: DomainId, zone_id: Option<String>) -> Result<()> {
        self.inner.set_zone_id(id, zone_id).await
    }

    async fn subdomain(&self, id: SubdomainId) -> Result<Option<Subdomain>> {
        self.inner.subdomain(id).await
    }

    async fn find_by_label(&self, domain_id: DomainId, label: &str) -> Result<Option<Subdomain>> {
        self.inner.find_by_label(domain_id, label).await
    }

    async fn list_by_workload(&self, workload_id: WorkloadId) -> Result<Vec<Subdomain>> {
        self.inner.list_by_workload(workload_id).await
    }

    async fn count_by_workload(&self, workload_id: WorkloadId) -> Result<usize> {
        self.inner.count_by_workload(workload_id).await
    }

    async fn count_by_domain(&self, domain_id: DomainId) -> Result<usize> {
        self.inner.count_by_domain(domain_id).await
    }

    async fn insert_subdomain(&self, subdomain: NewSubdomain) -> Result<Subdomain> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::persistence("disk full"));
        }
        self.inner.insert_subdomain(subdomain).await
    }

    async fn delete_subdomain(&self, id: SubdomainId) -> Result<bool> {
        self.inner.delete_subdomain(id).await
    }

    async fn delete_by_workload(&self, workload_id: WorkloadId) -> Result<usize> {
        if self.fail_bulk_deletes.load(Ordering::SeqCst) {
            return Err(Error::persistence("disk full"));
        }
        self.inner.delete_by_workload(workload_id).await
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Fixed hosting inventory shared by all contract tests
pub fn inventory() -> StaticInventory {
    let allocation = |id, ip: &str, port, alias: Option<&str>, node_id| Allocation {
        id,
        ip: ip.to_string(),
        port,
        alias: alias.map(str::to_string),
        node_id,
    };
    let workload = |id, recipe_id, allocation_id| Workload {
        id,
        recipe_id,
        allocation_id,
    };

    let mut inventory = StaticInventory::new()
        .with_recipe(UNMAPPED_RECIPE)
        .with_node(Node {
            id: 1,
            public_ipv4: None,
        })
        .with_node(Node {
            id: 2,
            public_ipv4: Some("10.0.0.5".to_string()),
        })
        .with_allocation(allocation(100, "node1.hosting.example", 25565, None, Some(1)))
        .with_allocation(allocation(101, "node1.hosting.example", 25566, None, Some(1)))
        .with_allocation(allocation(200, "0.0.0.0", 25565, None, Some(2)))
        .with_allocation(allocation(201, "0.0.0.0", 25565, Some("mc.hosting.example"), Some(2)))
        .with_allocation(allocation(202, "10.0.0.7", 0, None, None))
        .with_allocation(allocation(203, "2001:db8::5", 19132, None, None))
        .with_allocation(allocation(204, "0.0.0.0", 25565, Some("203.0.113.4"), Some(2)))
        .with_workload(workload(CNAME_WORKLOAD, CNAME_RECIPE, 100))
        .with_workload(workload(OTHER_CNAME_WORKLOAD, CNAME_RECIPE, 101))
        .with_workload(workload(UNMAPPED_WORKLOAD, UNMAPPED_RECIPE, 100))
        .with_workload(workload(SRV_IPV4_WORKLOAD, SRV_RECIPE, 200))
        .with_workload(workload(SRV_ALIAS_WORKLOAD, SRV_RECIPE, 201))
        .with_workload(workload(SRV_NO_PORT_WORKLOAD, SRV_RECIPE, 202))
        .with_workload(workload(SRV_IPV6_WORKLOAD, SRV_RECIPE, 203))
        .with_workload(workload(SRV_IP_ALIAS_WORKLOAD, SRV_RECIPE, 204));

    for id in POOL_WORKLOADS {
        inventory = inventory.with_workload(workload(id, CNAME_RECIPE, 100));
    }

    inventory
}

/// Mappings for [`DOMAIN`]
pub fn play_mappings() -> Vec<ProtocolMapping> {
    vec![
        ProtocolMapping::new(CNAME_RECIPE),
        ProtocolMapping::new(SRV_RECIPE).with_service("_minecraft"),
    ]
}

pub struct Harness {
    pub engine: Arc<SubdomainEngine>,
    pub events: mpsc::Receiver<EngineEvent>,
    pub gateway: Arc<RecordingGateway>,
    pub store: Arc<FlakyStore>,
}

impl Harness {
    /// Register [`DOMAIN`] and forget the calls that made
    pub async fn play_domain(&self) -> Domain {
        let domain = self
            .engine
            .register_domain(NewDomain::new(DOMAIN, play_mappings()))
            .await
            .expect("domain registration succeeds");
        self.gateway.clear_calls();
        domain
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Engine over a fresh gateway and store
pub fn harness(max_subdomains_per_workload: usize) -> Harness {
    harness_with(RecordingGateway::new(), max_subdomains_per_workload)
}

pub fn harness_with(gateway: RecordingGateway, max_subdomains_per_workload: usize) -> Harness {
    let gateway = Arc::new(gateway);
    let store = Arc::new(FlakyStore::default());
    let config = EngineConfig {
        max_subdomains_per_workload,
        ..EngineConfig::default()
    };

    let (engine, events) = SubdomainEngine::new(
        gateway.clone(),
        store.clone(),
        Arc::new(inventory()),
        config,
    )
    .expect("engine construction succeeds");

    Harness {
        engine: Arc::new(engine),
        events,
        gateway,
        store,
    }
}
