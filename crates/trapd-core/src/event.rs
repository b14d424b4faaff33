//! Normalized trap event
//!
//! A [`TrapEvent`] is built per notification, and is only handed to a sink
//! once both `interface` and `status` have moved off their sentinels.

use std::fmt;

/// Placeholder interface name until an ifDescr binding is seen
pub const INTERFACE_UNSET: &str = "N/A";

/// Administrative state of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminStatus {
    Up,
    Down,
    /// Not yet resolved from the notification
    Unknown,
}

impl AdminStatus {
    /// Map a rendered ifAdminStatus value.
    ///
    /// Only `"1"` means up; every other value, including `testing(3)`, is
    /// reported as down.
    pub fn from_value(value: &str) -> Self {
        if value == "1" {
            AdminStatus::Up
        } else {
            AdminStatus::Down
        }
    }

    /// Canonical upper-case name stored in the sink
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminStatus::Up => "UP",
            AdminStatus::Down => "DOWN",
            AdminStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AdminStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interface state change derived from one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapEvent {
    /// When the notification was observed
    pub timestamp: String,
    /// Originating device address
    pub host: String,
    /// Interface descriptor, [`INTERFACE_UNSET`] until resolved
    pub interface: String,
    /// Admin status, [`AdminStatus::Unknown`] until resolved
    pub status: AdminStatus,
}

impl TrapEvent {
    /// Create an unresolved event for a host
    pub fn new(timestamp: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            host: host.into(),
            interface: INTERFACE_UNSET.to_string(),
            status: AdminStatus::Unknown,
        }
    }

    /// Whether both interface and status have been resolved
    pub fn is_complete(&self) -> bool {
        self.interface != INTERFACE_UNSET && self.status != AdminStatus::Unknown
    }
}
