//! Canonical interface model: one immutable attribute record plus one
//! counter record per observed interface, as supplied by source-specific
//! parsers. The engine never decodes protocols itself.

use serde::{Deserialize, Serialize};

/// Physical (MAC) address as delivered by the source: either raw bytes or a
/// string the parser already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysAddress {
    Bytes(Vec<u8>),
    Formatted(String),
}

/// Identity and state of one interface at observation time.
///
/// `index` is unique among the interfaces of one node within a snapshot.
/// `speed` is in bits per second, `0` meaning unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub index: String,
    pub descr: String,
    pub alias: String,
    pub port_type: String,
    pub speed: f64,
    pub oper_status: String,
    pub admin_status: Option<String>,
    pub out_qlen: Option<f64>,
    pub phys_address: Option<PhysAddress>,
    /// Vendor-supplied textual speed, used when the numeric speed is unknown.
    pub speed_as_text: Option<String>,
    /// Group tag pre-assigned by the source, if any.
    pub group: Option<String>,
    /// Cluster node this observation came from, if any.
    pub node: Option<String>,
    pub extra_info: Option<String>,
    /// Parser-supplied override for the operational status name.
    pub oper_status_name: Option<String>,
}

impl Attributes {
    pub const OPER_STATUS_UP: &'static str = "1";
    pub const OPER_STATUS_DOWN: &'static str = "2";
    pub const OPER_STATUS_DEGRADED: &'static str = "8";

    /// Normalizes parser-delivered values: strips NUL bytes and newlines
    /// from the name fields and clamps speed readings some switches report
    /// four orders of magnitude too large.
    pub fn finalize(mut self) -> Self {
        self.descr = cleanup_if_string(&self.descr);
        self.alias = cleanup_if_string(&self.alias);
        if self.speed > 9.0 * 1000.0 * 1000.0 * 1000.0 * 1000.0 {
            self.speed /= 10000.0;
        }
        self
    }

    pub fn is_up(&self) -> bool {
        self.oper_status == Self::OPER_STATUS_UP
    }

    /// Human-readable operational status, honoring a parser override.
    pub fn oper_status_name(&self) -> &str {
        match &self.oper_status_name {
            Some(name) if !name.is_empty() => name,
            _ => if_state_name(&self.oper_status),
        }
    }

    pub fn admin_status_name(&self) -> Option<&str> {
        self.admin_status.as_deref().map(if_state_name)
    }

    /// Value-store identity of this interface. All counter baselines and
    /// averages for the interface are keyed under this id.
    pub fn store_id(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.index,
            self.descr,
            self.alias,
            self.node.as_deref().unwrap_or("")
        )
    }
}

/// Monotonically non-decreasing counters of one interface. Any counter may
/// be absent when the source does not supply it; absent is never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub in_octets: Option<u64>,
    pub in_ucast: Option<u64>,
    pub in_mcast: Option<u64>,
    pub in_bcast: Option<u64>,
    pub in_nucast: Option<u64>,
    pub in_disc: Option<u64>,
    pub in_err: Option<u64>,
    pub out_octets: Option<u64>,
    pub out_ucast: Option<u64>,
    pub out_mcast: Option<u64>,
    pub out_bcast: Option<u64>,
    pub out_nucast: Option<u64>,
    pub out_disc: Option<u64>,
    pub out_err: Option<u64>,
}

/// One canonical (attributes, counters) observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSnapshot {
    pub attributes: Attributes,
    pub counters: Counters,
}

/// Name of a network interface state code, per the standard status table.
/// Unknown codes are returned as-is.
pub fn if_state_name(state: &str) -> &str {
    match state {
        "1" => "up",
        "2" => "down",
        "3" => "testing",
        "4" => "unknown",
        "5" => "dormant",
        "6" => "not present",
        "7" => "lower layer down",
        "8" => "degraded",
        other => other,
    }
}

/// Render a physical address as an uppercase colon-separated MAC string.
pub fn render_mac_address(phys_address: &PhysAddress) -> String {
    let bytes: Vec<u8> = match phys_address {
        PhysAddress::Bytes(bytes) => bytes.clone(),
        // Pre-formatted addresses carry one byte per char.
        PhysAddress::Formatted(s) => s.chars().map(|c| c as u8).collect(),
    };
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

// Broken SNMP agents pad name strings with NUL bytes; everything after the
// first NUL would be lost downstream. Strip them, and fold newlines.
fn cleanup_if_string(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '\0')
        .collect::<String>()
        .trim()
        .replace('\n', " ")
}
