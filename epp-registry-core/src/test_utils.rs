//! Test fixtures: an in-memory flow context and resource factories.

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use epp_registry_proto::command::PostalInfo;

use crate::clock::{Clock, FakeClock};
use crate::config::TldCache;
use crate::flows::FlowContext;
use crate::model::{
    Contact, Domain, Host, RepoId, Resource, ResourceCommon, Tld, TransferData,
};
use crate::store::{InMemoryStore, ResourceStore, Transaction, VersionedWrite};
use crate::tasks::{InMemoryAsyncQueue, InMemoryDnsQueue};

pub const REGISTRAR: &str = "TheRegistrar";
pub const OTHER_REGISTRAR: &str = "NewRegistrar";

/// Everything a flow test needs, with concrete handles kept alongside the
/// trait objects in the context.
pub struct TestHarness {
    pub ctx: FlowContext,
    pub store: Arc<InMemoryStore>,
    pub dns: Arc<InMemoryDnsQueue>,
    pub async_queue: Arc<InMemoryAsyncQueue>,
    pub clock: Arc<FakeClock>,
}

impl TestHarness {
    /// A harness with the TLD `tld` and two known registrars.
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let dns = Arc::new(InMemoryDnsQueue::new());
        let async_queue = Arc::new(InMemoryAsyncQueue::new());
        let clock = Arc::new(FakeClock::new(
            Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).single().unwrap_or_default(),
        ));
        store.put_tld(Tld::new("tld")).await.unwrap_or_default();
        let tlds = Arc::new(TldCache::new(store.clone()));
        let ctx = FlowContext {
            store: store.clone(),
            dns_queue: dns.clone(),
            async_queue: async_queue.clone(),
            tlds,
            clock: clock.clone(),
            registrars: Arc::new(
                [REGISTRAR.to_string(), OTHER_REGISTRAR.to_string()]
                    .into_iter()
                    .collect(),
            ),
        };
        Self {
            ctx,
            store,
            dns,
            async_queue,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn create_tld(&self, tld: &str) {
        self.store.put_tld(Tld::new(tld)).await.unwrap_or_default();
        self.ctx.tlds.invalidate().await;
    }

    pub async fn new_domain(&self, name: &str) -> Domain {
        let id = self.store.allocate_id().await;
        Domain {
            common: ResourceCommon::create(RepoId::new(id, "REG"), name, REGISTRAR, self.now()),
            tld: name.rsplit_once('.').map(|(_, tld)| tld.to_string()).unwrap_or_default(),
            registrant: "jd1234".to_string(),
            contacts: vec![
                ("admin".to_string(), "sh8013".to_string()),
                ("tech".to_string(), "sh8013".to_string()),
            ],
            nameservers: BTreeSet::new(),
            subordinate_hosts: BTreeSet::new(),
            registration_expiration_time: self.now() + Duration::days(365 * 2),
            transfer_data: TransferData::default(),
            auth_info: "2fooBAR".to_string(),
            autorenew_billing_id: None,
            autorenew_poll_id: None,
        }
    }

    pub async fn new_host(&self, name: &str) -> Host {
        let id = self.store.allocate_id().await;
        Host {
            common: ResourceCommon::create(RepoId::new(id, "REG"), name, REGISTRAR, self.now()),
            addresses: BTreeSet::new(),
            superordinate_domain: None,
            last_superordinate_change: None,
        }
    }

    pub async fn new_contact(&self, id: &str) -> Contact {
        let numeric = self.store.allocate_id().await;
        Contact {
            common: ResourceCommon::create(RepoId::new(numeric, "REG"), id, REGISTRAR, self.now()),
            postal_info: PostalInfo {
                name: "John Doe".to_string(),
                org: None,
                street: vec!["123 Example Dr.".to_string()],
                city: "Dulles".to_string(),
                state_or_province: Some("VA".to_string()),
                postal_code: Some("20166-6503".to_string()),
                country_code: "US".to_string(),
            },
            voice: None,
            fax: None,
            email: "jdoe@example.com".to_string(),
            auth_info: "2fooBAR".to_string(),
            transfer_data: TransferData::default(),
        }
    }

    pub async fn persist(&self, resource: Resource) {
        self.store
            .transact(Transaction {
                now: Some(self.now()),
                creates: vec![resource],
                ..Transaction::default()
            })
            .await
            .unwrap_or_else(|e| panic!("persist failed: {e}"));
    }

    /// Replaces a stored resource at its current version.
    pub async fn update(&self, resource: Resource) {
        let current = self
            .store
            .load(resource.repo_id())
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| panic!("missing {}", resource.repo_id()));
        self.store
            .transact(Transaction {
                now: Some(self.now()),
                updates: vec![VersionedWrite {
                    resource,
                    expected_version: current.version,
                }],
                ..Transaction::default()
            })
            .await
            .unwrap_or_else(|e| panic!("update failed: {e}"));
    }

    pub async fn persist_active_domain(&self, name: &str) -> Domain {
        let domain = self.new_domain(name).await;
        self.persist(Resource::Domain(domain.clone())).await;
        domain
    }

    pub async fn persist_active_host(&self, name: &str, addresses: &[&str]) -> Host {
        let mut host = self.new_host(name).await;
        host.addresses = parse_addresses(addresses);
        self.persist(Resource::Host(host.clone())).await;
        host
    }

    /// Persists a host subordinate to an already-persisted domain, keeping
    /// the domain's subordinate set in sync.
    pub async fn persist_active_subordinate_host(&self, name: &str, domain: &Domain) -> Host {
        let mut host = self.new_host(name).await;
        host.superordinate_domain = Some(domain.common.foreign_key.clone());
        host.addresses = parse_addresses(&["192.0.2.1"]);
        self.persist(Resource::Host(host.clone())).await;

        let current = self
            .store
            .load(&domain.common.repo_id)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| panic!("missing domain {}", domain.common.repo_id));
        let mut updated = current.resource.clone();
        if let Resource::Domain(d) = &mut updated {
            d.subordinate_hosts.insert(name.to_string());
        }
        self.update(updated).await;
        host
    }

    pub async fn persist_active_contact(&self, id: &str) -> Contact {
        let contact = self.new_contact(id).await;
        self.persist(Resource::Contact(contact.clone())).await;
        contact
    }

    /// The current snapshot of a host by name, unwrapped for assertions.
    pub async fn load_host(&self, name: &str) -> Option<Host> {
        self.store
            .find_by_foreign_key(epp_registry_proto::ResourceKind::Host, name, self.now())
            .await
            .ok()
            .flatten()
            .and_then(|v| match v.resource {
                Resource::Host(host) => Some(host),
                _ => None,
            })
    }

    pub async fn load_domain(&self, name: &str) -> Option<Domain> {
        self.store
            .find_by_foreign_key(epp_registry_proto::ResourceKind::Domain, name, self.now())
            .await
            .ok()
            .flatten()
            .and_then(|v| match v.resource {
                Resource::Domain(domain) => Some(domain),
                _ => None,
            })
    }

    /// A full dump of resources for no-partial-write assertions.
    pub async fn snapshot(&self) -> HashMap<RepoId, (Resource, u64)> {
        self.store
            .all_resources()
            .await
            .into_iter()
            .map(|v| (v.resource.repo_id().clone(), (v.resource.clone(), v.version)))
            .collect()
    }
}

pub fn parse_addresses(addresses: &[&str]) -> BTreeSet<IpAddr> {
    addresses
        .iter()
        .filter_map(|a| a.parse().ok())
        .collect()
}
