//! Core reconciliation engine
//!
//! The Reconciler is responsible for one end-to-end run:
//! - Resolving the public IP via IpSource
//! - Optionally short-circuiting on the cached IP
//! - Listing and filtering records via DnsProvider
//! - Creating or updating the canonical record
//! - Optionally deleting duplicates
//! - Persisting the applied IP to the StateStore
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────┐   ┌──────────┐   ┌───────────────┐   ┌────────┐
//!  │ Resolve  │──▶│  Cache?  │──▶│ List + Filter │──▶│ Decide │
//!  └──────────┘   └──────────┘   └───────────────┘   └────────┘
//!                      │                                  │
//!                      │ hit                              ▼
//!                      │         ┌─────────┐   ┌──────────────────────┐
//!                      ▼         │ Persist │◀──│ Act, then Cleanup    │
//!                    done        └─────────┘   └──────────────────────┘
//! ```
//!
//! Every stage failure is fatal for the run except cleanup deletes, which
//! are reported and otherwise ignored. Nothing retries the pipeline as a
//! whole; the external scheduler runs it again later.
//!
//! [`run_exclusive`] wraps a run in the run lock and the overall deadline.

pub mod plan;

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{DdnsConfig, EngineConfig, RecordConfig};
use crate::error::{Error, Result};
use crate::lock::RunLock;
use crate::traits::{DnsProvider, IpSource, NewRecord, StateStore};

pub use plan::{Action, Plan};

/// Capacity of the event channel returned by [`Reconciler::new`]
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Public IP resolved and validated
    IpResolved { ip: Ipv4Addr },

    /// Cached IP equals the resolved IP; listing skipped
    CacheHit { ip: Ipv4Addr },

    /// Record created (`id` is `None` in dry-run mode)
    RecordCreated { id: Option<u64>, ip: Ipv4Addr },

    /// Canonical record pointed at the new IP
    RecordUpdated {
        id: u64,
        previous: String,
        ip: Ipv4Addr,
    },

    /// Canonical record already correct
    RecordUnchanged { id: u64, ip: Ipv4Addr },

    /// Duplicate record removed
    DuplicateDeleted { id: u64 },

    /// Duplicate record could not be removed
    CleanupFailed { id: u64, error: String },

    /// Resolved IP written to the state cache
    StatePersisted { ip: Ipv4Addr },
}

/// What the run did to the canonical record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAction {
    /// A new record was created (`id` is `None` in dry-run mode)
    Created { id: Option<u64> },
    /// The canonical record was repointed
    Updated { id: u64, previous: String },
    /// The canonical record already held the resolved IP
    Unchanged { id: u64 },
    /// The cached IP matched; the provider was not contacted
    CacheHit,
}

/// Outcome of the duplicate cleanup stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Ids removed (or, in dry-run mode, that would be removed)
    pub deleted: Vec<u64>,
    /// Ids whose delete failed, with the error text
    pub failed: Vec<(u64, String)>,
}

impl CleanupReport {
    /// Whether any delete failed
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The resolved public IP
    pub ip: Ipv4Addr,
    /// Action taken on the canonical record
    pub action: RunAction,
    /// Duplicate cleanup outcome (empty when cleanup is disabled)
    pub cleanup: CleanupReport,
    /// Mutations were only logged
    pub dry_run: bool,
}

/// Result of a guarded run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Another run held the lock; nothing was done
    Skipped,
    /// The run finished
    Completed(RunReport),
}

/// Reconciler for a single A record
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run()`] (or [`run_exclusive`]) once per invocation
/// 3. Drop
///
/// Runs are strictly sequential: one request is in flight at a time.
pub struct Reconciler {
    /// Public IP source
    ip_source: Box<dyn IpSource>,

    /// Record repository
    provider: Box<dyn DnsProvider>,

    /// Last applied IP
    state_store: Box<dyn StateStore>,

    /// Target record, type normalized to upper case
    record: RecordConfig,

    /// Engine tunables
    engine: EngineConfig,

    /// Event sender for embedders and tests
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `state_store`: State store implementation
    /// - `config`: DDNS configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        state_store: Box<dyn StateStore>,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut record = config.record.clone();
        record.record_type = record.record_type.to_ascii_uppercase();

        let reconciler = Self {
            ip_source,
            provider,
            state_store,
            record,
            engine: config.engine.clone(),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Run one reconciliation
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: The record points at the resolved IP (or would, in dry-run mode)
    /// - `Err(Error)`: The failed stage, as its error kind
    pub async fn run(&self) -> Result<RunReport> {
        let dry_run = self.engine.dry_run;

        // ResolveIP
        let ip = self.ip_source.current().await?;
        info!(%ip, source = self.ip_source.source_url(), "Resolved public IP");
        self.emit_event(EngineEvent::IpResolved { ip });

        if self.engine.use_cache && self.cache_matches(ip).await {
            info!(%ip, "Cached IP matches, skipping provider calls");
            self.emit_event(EngineEvent::CacheHit { ip });
            return Ok(RunReport {
                ip,
                action: RunAction::CacheHit,
                cleanup: CleanupReport::default(),
                dry_run,
            });
        }

        // ListAndFilter
        let records = self.provider.list_records().await?;
        let matches = plan::matching(&records, &self.record.record_type, &self.record.name);
        debug!(
            total = records.len(),
            matching = matches.len(),
            provider = self.provider.provider_name(),
            "Listed zone records"
        );

        // Decide
        let plan = plan::decide(&matches, ip);

        // Act
        let action = self.act(&plan.action, ip).await?;

        // Cleanup
        let cleanup = self.cleanup(&plan.duplicates).await;

        // Persist
        if dry_run {
            info!(%ip, "Dry run: state cache not written");
        } else {
            self.state_store.set_last_ip(ip).await?;
            debug!(%ip, "State cache written");
            self.emit_event(EngineEvent::StatePersisted { ip });
        }

        Ok(RunReport {
            ip,
            action,
            cleanup,
            dry_run,
        })
    }

    /// Whether the state cache already holds `ip`
    ///
    /// An unreadable cache counts as a miss.
    async fn cache_matches(&self, ip: Ipv4Addr) -> bool {
        match self.state_store.get_last_ip().await {
            Ok(Some(cached)) => cached == ip,
            Ok(None) => false,
            Err(e) => {
                warn!("State cache unreadable, listing records: {}", e);
                false
            }
        }
    }

    /// Execute the decided create/update (or nothing)
    async fn act(&self, action: &Action, ip: Ipv4Addr) -> Result<RunAction> {
        let data = ip.to_string();
        let name = &self.record.name;
        let ttl = self.record.ttl;

        match action {
            Action::Create => {
                if self.engine.dry_run {
                    info!(name = %name, %ip, ttl, "Dry run: would create record");
                    self.emit_event(EngineEvent::RecordCreated { id: None, ip });
                    return Ok(RunAction::Created { id: None });
                }

                let record = NewRecord {
                    record_type: self.record.record_type.clone(),
                    name: name.clone(),
                    data,
                    ttl,
                };
                let created = self.provider.create_record(&record).await?;
                info!(id = created.id, name = %name, %ip, "Created record");
                self.emit_event(EngineEvent::RecordCreated {
                    id: Some(created.id),
                    ip,
                });
                Ok(RunAction::Created {
                    id: Some(created.id),
                })
            }
            Action::Update { id, previous } => {
                let id = *id;
                if self.engine.dry_run {
                    info!(id, name = %name, %previous, %ip, "Dry run: would update record");
                } else {
                    self.provider.update_record(id, &data, ttl).await?;
                    info!(id, name = %name, %previous, %ip, "Updated record");
                }
                self.emit_event(EngineEvent::RecordUpdated {
                    id,
                    previous: previous.clone(),
                    ip,
                });
                Ok(RunAction::Updated {
                    id,
                    previous: previous.clone(),
                })
            }
            Action::NoOp { id } => {
                info!(id = *id, name = %name, %ip, "Record already up to date");
                self.emit_event(EngineEvent::RecordUnchanged { id: *id, ip });
                Ok(RunAction::Unchanged { id: *id })
            }
        }
    }

    /// Delete duplicates when enabled; failures are collected, never returned
    async fn cleanup(&self, duplicates: &[u64]) -> CleanupReport {
        let mut report = CleanupReport::default();

        if duplicates.is_empty() {
            return report;
        }

        if !self.engine.cleanup_duplicates {
            warn!(
                ids = ?duplicates,
                "Found {} duplicate record(s); enable duplicate cleanup to remove them",
                duplicates.len()
            );
            return report;
        }

        for &id in duplicates {
            if self.engine.dry_run {
                info!(id, "Dry run: would delete duplicate record");
                report.deleted.push(id);
                continue;
            }

            match self.provider.delete_record(id).await {
                Ok(()) => {
                    info!(id, "Deleted duplicate record");
                    self.emit_event(EngineEvent::DuplicateDeleted { id });
                    report.deleted.push(id);
                }
                Err(e) => {
                    warn!(id, "Failed to delete duplicate record: {}", e);
                    self.emit_event(EngineEvent::CleanupFailed {
                        id,
                        error: e.to_string(),
                    });
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        report
    }

    /// Emit an engine event
    ///
    /// A full channel drops the event with a warning; the run never waits
    /// on a slow consumer.
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full or closed, dropping event");
        }
    }
}

/// Run once under the run lock and the overall deadline
///
/// The lock is released when this future completes or is dropped, so a
/// caller racing it against a shutdown signal still cleans up.
///
/// # Returns
///
/// - `Ok(RunStatus::Skipped)`: Another run holds the lock
/// - `Ok(RunStatus::Completed(report))`: The run finished
/// - `Err(Error::Timeout)`: The deadline expired; in-flight requests were cancelled
/// - `Err(Error)`: Any other stage failure
pub async fn run_exclusive(
    reconciler: &Reconciler,
    lock_path: impl AsRef<Path>,
    deadline: Duration,
) -> Result<RunStatus> {
    let Some(_lock) = RunLock::try_acquire(lock_path)? else {
        info!("Another run holds the lock, skipping");
        return Ok(RunStatus::Skipped);
    };

    match tokio::time::timeout(deadline, reconciler.run()).await {
        Ok(result) => result.map(RunStatus::Completed),
        Err(_) => {
            error!(?deadline, "Run exceeded deadline, aborting");
            Err(Error::Timeout(deadline))
        }
    }
}
