//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles record every call so tests can assert exactly which
//! provider mutations a run performed.

#![allow(dead_code)]

use ddns_core::client::RequestError;
use ddns_core::config::DdnsConfig;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, DomainRecord, IpSource, NewRecord, StateStore};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An IpSource that always answers the same way
pub struct StaticIpSource {
    answer: std::result::Result<Ipv4Addr, String>,
    call_count: Arc<AtomicUsize>,
}

impl StaticIpSource {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            answer: Ok(ip),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose endpoint answers with something that is not IPv4
    pub fn invalid(value: &str) -> Self {
        Self {
            answer: Err(value.to_string()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            answer: other.answer.clone(),
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(|value| Error::InvalidIp {
            url: self.source_url().to_string(),
            value,
        })
    }

    fn source_url(&self) -> &str {
        "static://test"
    }
}

/// A provider call as observed by [`MockDnsProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List,
    Create(NewRecord),
    Update { id: u64, data: String, ttl: u32 },
    Delete(u64),
}

impl ProviderCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, ProviderCall::List)
    }
}

#[derive(Debug, Default)]
struct ZoneState {
    records: Vec<DomainRecord>,
    next_id: u64,
    calls: Vec<ProviderCall>,
    failing_deletes: HashSet<u64>,
    fail_list: bool,
    fail_update: bool,
    list_delay: Option<Duration>,
}

/// An in-memory zone that records calls and applies mutations
pub struct MockDnsProvider {
    state: Arc<Mutex<ZoneState>>,
}

impl MockDnsProvider {
    pub fn new(records: Vec<DomainRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 100;
        Self {
            state: Arc::new(Mutex::new(ZoneState {
                records,
                next_id,
                ..Default::default()
            })),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Create a new MockDnsProvider that shares the zone with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
        }
    }

    pub fn fail_delete_of(self, id: u64) -> Self {
        self.state.lock().unwrap().failing_deletes.insert(id);
        self
    }

    pub fn fail_list(self) -> Self {
        self.state.lock().unwrap().fail_list = true;
        self
    }

    pub fn fail_update(self) -> Self {
        self.state.lock().unwrap().fail_update = true;
        self
    }

    /// Make every listing take `delay` (for deadline tests)
    pub fn slow_list(self, delay: Duration) -> Self {
        self.state.lock().unwrap().list_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(|c| c.is_mutation()).collect()
    }

    pub fn records(&self) -> Vec<DomainRecord> {
        self.state.lock().unwrap().records.clone()
    }

    fn record_call(&self, call: ProviderCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn not_found() -> RequestError {
    RequestError::Status {
        status: 404,
        message: Some("The resource you were accessing could not be found.".to_string()),
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self) -> Result<Vec<DomainRecord>> {
        self.record_call(ProviderCall::List);

        let delay = self.state.lock().unwrap().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(Error::List(RequestError::Status {
                status: 401,
                message: Some("Unable to authenticate you".to_string()),
            }));
        }
        Ok(state.records.clone())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<DomainRecord> {
        self.record_call(ProviderCall::Create(record.clone()));

        let mut state = self.state.lock().unwrap();
        let created = DomainRecord {
            id: state.next_id,
            record_type: record.record_type.clone(),
            name: record.name.clone(),
            data: record.data.clone(),
            ttl: record.ttl,
        };
        state.next_id += 1;
        state.records.push(created.clone());
        Ok(created)
    }

    async fn update_record(&self, id: u64, data: &str, ttl: u32) -> Result<DomainRecord> {
        self.record_call(ProviderCall::Update {
            id,
            data: data.to_string(),
            ttl,
        });

        let mut state = self.state.lock().unwrap();
        if state.fail_update {
            return Err(Error::Update {
                id,
                source: RequestError::Status {
                    status: 422,
                    message: Some("Data needs to be a valid IP address".to_string()),
                },
            });
        }
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::Update {
                id,
                source: not_found(),
            })?;
        record.data = data.to_string();
        record.ttl = ttl;
        Ok(record.clone())
    }

    async fn delete_record(&self, id: u64) -> Result<()> {
        self.record_call(ProviderCall::Delete(id));

        let mut state = self.state.lock().unwrap();
        if state.failing_deletes.contains(&id) {
            return Err(Error::Delete {
                id,
                source: RequestError::RetriesExceeded {
                    attempts: 5,
                    last: Box::new(RequestError::Server {
                        status: 503,
                        body: "upstream unavailable".to_string(),
                    }),
                },
            });
        }
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(Error::Delete {
                id,
                source: not_found(),
            });
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A state store that counts reads and writes
pub struct MockStateStore {
    value: Arc<Mutex<Option<Ipv4Addr>>>,
    get_count: Arc<AtomicUsize>,
    set_count: Arc<AtomicUsize>,
    fail_writes: bool,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self {
            value: Arc::new(Mutex::new(None)),
            get_count: Arc::new(AtomicUsize::new(0)),
            set_count: Arc::new(AtomicUsize::new(0)),
            fail_writes: false,
        }
    }

    pub fn with_ip(ip: Ipv4Addr) -> Self {
        let store = Self::new();
        *store.value.lock().unwrap() = Some(ip);
        store
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            value: Arc::clone(&other.value),
            get_count: Arc::clone(&other.get_count),
            set_count: Arc::clone(&other.set_count),
            fail_writes: other.fail_writes,
        }
    }

    pub fn value(&self) -> Option<Ipv4Addr> {
        *self.value.lock().unwrap()
    }

    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.set_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateStore for MockStateStore {
    async fn get_last_ip(&self) -> Result<Option<Ipv4Addr>> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        Ok(*self.value.lock().unwrap())
    }

    async fn set_last_ip(&self, ip: Ipv4Addr) -> Result<()> {
        self.set_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Error::state_store("disk full"));
        }
        *self.value.lock().unwrap() = Some(ip);
        Ok(())
    }
}

/// The resolved IP used across scenarios
pub const RESOLVED_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);

/// An A record named `name`
pub fn a_record(id: u64, name: &str, data: &str) -> DomainRecord {
    DomainRecord {
        id,
        record_type: "A".to_string(),
        name: name.to_string(),
        data: data.to_string(),
        ttl: 300,
    }
}

/// Configuration for the "home.example.com" A record
pub fn minimal_config() -> DdnsConfig {
    DdnsConfig::new("dop_v1_test", "example.com", "home")
}
