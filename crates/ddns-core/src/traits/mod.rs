//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces the reconciler is built on.
//!
//! - [`IpSource`]: Resolve the current public IPv4 address
//! - [`DnsProvider`]: List and mutate DNS records via a provider API
//! - [`StateStore`]: Persist the last applied IP

pub mod ip_source;
pub mod dns_provider;
pub mod state_store;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, DomainRecord, NewRecord};
pub use state_store::StateStore;
