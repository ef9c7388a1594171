// # ddns-core
//
// Core library for the DigitalOcean DDNS updater.
//
// ## Architecture Overview
//
// This library provides everything one reconciliation run needs:
// - **RequestClient**: One logical HTTP request with retry, backoff and rate-limit handling
// - **IpSource**: Trait for resolving the public IPv4 address
// - **DnsProvider**: Trait for listing and mutating DNS records via provider APIs
// - **StateStore**: Trait for the last-applied-IP cache
// - **RunLock**: Non-blocking guard against overlapping invocations
// - **Reconciler**: Orchestrates resolve → list → decide → act → cleanup → persist
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and IP source plugins
// 2. **One Run Per Invocation**: An external scheduler supplies periodicity
// 3. **Typed Failures**: Each stage fails with its own error kind; exit codes are chosen in the binary
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: A deterministic canonical record means repeated runs converge

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use client::{RequestClient, RequestError, RetryPolicy};
pub use config::{
    DdnsConfig, EngineConfig, IpSourceConfig, ProviderConfig, RecordConfig, StateConfig,
};
pub use engine::{
    CleanupReport, EngineEvent, Reconciler, RunAction, RunReport, RunStatus, run_exclusive,
};
pub use error::{Error, Result};
pub use lock::RunLock;
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{DnsProvider, DomainRecord, IpSource, NewRecord, StateStore};
