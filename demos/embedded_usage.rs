//! Minimal embedding example for ddns-core
//!
//! Drives the reconciler from an application with its own IP source and
//! record repository. The application owns scheduling: here it simply runs
//! twice and shows that the second run changes nothing.

use ddns_core::traits::{DnsProvider, DomainRecord, IpSource, NewRecord};
use ddns_core::{DdnsConfig, Error, MemoryStateStore, Reconciler, Result};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Fixed address, as an application that already knows its uplink would supply
struct EmbeddedIpSource {
    ip: Ipv4Addr,
}

#[async_trait::async_trait]
impl IpSource for EmbeddedIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        Ok(self.ip)
    }

    fn source_url(&self) -> &str {
        "embedded://static"
    }
}

/// In-process zone standing in for a real provider
#[derive(Clone, Default)]
struct EmbeddedProvider {
    zone: Arc<Mutex<Vec<DomainRecord>>>,
}

impl EmbeddedProvider {
    fn with_records(records: Vec<DomainRecord>) -> Self {
        Self {
            zone: Arc::new(Mutex::new(records)),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for EmbeddedProvider {
    async fn list_records(&self) -> Result<Vec<DomainRecord>> {
        Ok(self.zone.lock().await.clone())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<DomainRecord> {
        let mut zone = self.zone.lock().await;
        let created = DomainRecord {
            id: zone.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            record_type: record.record_type.clone(),
            name: record.name.clone(),
            data: record.data.clone(),
            ttl: record.ttl,
        };
        println!("[Embedded] create {} -> {}", created.name, created.data);
        zone.push(created.clone());
        Ok(created)
    }

    async fn update_record(&self, id: u64, data: &str, ttl: u32) -> Result<DomainRecord> {
        let mut zone = self.zone.lock().await;
        let record = zone
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::config(format!("no record {}", id)))?;
        println!("[Embedded] update {}: {} -> {}", id, record.data, data);
        record.data = data.to_string();
        record.ttl = ttl;
        Ok(record.clone())
    }

    async fn delete_record(&self, id: u64) -> Result<()> {
        println!("[Embedded] delete {}", id);
        self.zone.lock().await.retain(|r| r.id != id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

fn a_record(id: u64, data: &str) -> DomainRecord {
    DomainRecord {
        id,
        record_type: "A".to_string(),
        name: "home".to_string(),
        data: data.to_string(),
        ttl: 300,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    println!("=== Embedded ddns-core Example ===\n");

    // Three copies of the record, the lowest id is the one that is kept
    let provider = EmbeddedProvider::with_records(vec![
        a_record(12, "198.51.100.4"),
        a_record(5, "198.51.100.4"),
        a_record(9, "198.51.100.9"),
    ]);
    let state = MemoryStateStore::new();

    let mut config = DdnsConfig::new("embedded-token", "example.com", "home");
    config.engine.cleanup_duplicates = true;

    println!("1. Creating reconciler...");
    let (reconciler, mut event_rx) = Reconciler::new(
        Box::new(EmbeddedIpSource {
            ip: Ipv4Addr::new(203, 0, 113, 7),
        }),
        Box::new(provider.clone()),
        Box::new(state.clone()),
        &config,
    )?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("2. First run: update the canonical record, remove duplicates");
    let report = reconciler.run().await?;
    println!("   {:?}\n", report.action);

    println!("3. Second run: nothing to do");
    let report = reconciler.run().await?;
    println!("   {:?}\n", report.action);

    // Dropping the reconciler closes the event channel
    drop(reconciler);
    let _ = event_listener.await;

    println!("\n4. Zone now holds {:?}", provider.list_records().await?);
    println!("=== Embedding Successful ===");

    Ok(())
}
