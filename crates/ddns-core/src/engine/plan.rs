//! Pure decision step of a run
//!
//! Given every record in the zone and the resolved IP, decide what to do.
//! Nothing here performs I/O, so the whole decision table is unit tested.

use std::net::Ipv4Addr;

use crate::traits::DomainRecord;

/// Mutation decided for the canonical record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No matching record exists
    Create,
    /// Canonical record points elsewhere
    Update { id: u64, previous: String },
    /// Canonical record already holds the resolved IP
    NoOp { id: u64 },
}

/// Outcome of the decision step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub action: Action,
    /// Matching records other than the canonical one, lowest id first
    pub duplicates: Vec<u64>,
}

/// Records whose type and name exactly equal the target
pub fn matching<'a>(
    records: &'a [DomainRecord],
    record_type: &str,
    name: &str,
) -> Vec<&'a DomainRecord> {
    records
        .iter()
        .filter(|r| r.matches(record_type, name))
        .collect()
}

/// Decide the action for `ip` over already-filtered matches
///
/// The canonical record is the one with the lowest id, whatever order the
/// provider returned them in. Every other match is a duplicate.
pub fn decide(matches: &[&DomainRecord], ip: Ipv4Addr) -> Plan {
    let mut sorted: Vec<&DomainRecord> = matches.to_vec();
    sorted.sort_by_key(|r| r.id);

    let Some((canonical, rest)) = sorted.split_first() else {
        return Plan {
            action: Action::Create,
            duplicates: Vec::new(),
        };
    };

    let action = if canonical.data == ip.to_string() {
        Action::NoOp { id: canonical.id }
    } else {
        Action::Update {
            id: canonical.id,
            previous: canonical.data.clone(),
        }
    };

    Plan {
        action,
        duplicates: rest.iter().map(|r| r.id).collect(),
    }
}
