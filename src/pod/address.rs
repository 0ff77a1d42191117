//! Static address assignment across the pods of one play.
//!
//! Every pod draws one slot, in play order, whether or not a static address
//! is left for it. Pods past the end of a pool get no address and a warning.

use crate::options::MacAddr;
use std::net::IpAddr;

/// Addresses assigned to one pod.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressAssignment {
    pub ip: Option<IpAddr>,
    pub mac: Option<MacAddr>,
    /// Pool exhaustion warnings.
    pub warnings: Vec<String>,
}

/// Pool of static IPs and MACs shared by the pods of one play.
#[derive(Debug, Clone)]
pub struct AddressPool<'a> {
    ips: &'a [IpAddr],
    macs: &'a [MacAddr],
    index: usize,
}

impl<'a> AddressPool<'a> {
    #[must_use]
    pub fn new(ips: &'a [IpAddr], macs: &'a [MacAddr]) -> Self {
        Self { ips, macs, index: 0 }
    }

    /// Number of slots drawn so far.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Draws the next slot.
    pub fn next_assignment(&mut self) -> AddressAssignment {
        let slot = self.index;
        self.index += 1;

        let mut assignment = AddressAssignment::default();

        if !self.ips.is_empty() {
            match self.ips.get(slot) {
                Some(ip) => assignment.ip = Some(*ip),
                None => assignment.warnings.push(
                    "No more static ips left using a random one".to_string(),
                ),
            }
        }
        if !self.macs.is_empty() {
            match self.macs.get(slot) {
                Some(mac) => assignment.mac = Some(*mac),
                None => assignment.warnings.push(
                    "No more static macs left using a random one".to_string(),
                ),
            }
        }

        assignment
    }
}
