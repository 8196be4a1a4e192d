// jsonPTS wire types
//
// Models for the vendor's JSON envelope and the per-command payloads.
// Field names follow the PTS-2 protocol document exactly (PascalCase).
// `#[serde(default)]` is used liberally because embedded firmware is
// inconsistent about field presence across revisions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed protocol literal carried by every envelope.
pub const PROTOCOL_NAME: &str = "jsonPTS";

// ── Envelope ─────────────────────────────────────────────────────────

/// Request envelope: `{"Protocol":"jsonPTS","Packets":[...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    #[serde(rename = "Protocol")]
    pub protocol: &'static str,
    #[serde(rename = "Packets")]
    pub packets: Vec<RequestPacket>,
}

impl RequestEnvelope {
    /// An envelope carrying no packets. Used by the transport to confirm
    /// a freshly derived credential without side effects.
    pub fn empty() -> Self {
        Self {
            protocol: PROTOCOL_NAME,
            packets: Vec::new(),
        }
    }

    pub fn single(packet: RequestPacket) -> Self {
        Self {
            protocol: PROTOCOL_NAME,
            packets: vec![packet],
        }
    }
}

/// One command packet inside a request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RequestPacket {
    #[serde(rename = "Id")]
    pub id: u32,
    #[serde(rename = "Type")]
    pub packet_type: String,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response envelope mirroring the request shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "Protocol", default)]
    pub protocol: String,
    #[serde(rename = "Packets", default)]
    pub packets: Vec<ResponsePacket>,
}

/// One answer packet. `id` echoes the request packet it answers —
/// correlation is by id, never by position, so multi-packet batches
/// stay well-defined.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePacket {
    #[serde(rename = "Id", default)]
    pub id: u32,
    #[serde(rename = "Type", default)]
    pub packet_type: String,
    #[serde(rename = "Data", default)]
    pub data: Option<Value>,
    /// `"Success"` or `"Fail"`; absent on firmware that only reports
    /// failures explicitly.
    #[serde(rename = "Result", default)]
    pub result: Option<String>,
    #[serde(rename = "ErrorMessage", default)]
    pub error_message: Option<String>,
}

impl ResponsePacket {
    pub fn is_failure(&self) -> bool {
        self.result.as_deref() == Some("Fail")
    }
}

// ── Command payloads ─────────────────────────────────────────────────

/// `GetControllerType` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerTypeData {
    #[serde(rename = "Type", default)]
    pub controller_type: String,
}

/// `GetDateTime` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct DateTimeData {
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Time", default)]
    pub time: String,
}

/// `GetProductPrices` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct PricesData {
    #[serde(rename = "Prices", default)]
    pub prices: Vec<PriceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceEntry {
    #[serde(rename = "Product", default)]
    pub product: u32,
    #[serde(rename = "Price", default)]
    pub price: f64,
}

/// `GetTanks` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct TanksData {
    #[serde(rename = "Tanks", default)]
    pub tanks: Vec<TankEntry>,
}

/// One tank probe reading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TankEntry {
    #[serde(rename = "Tank", default)]
    pub tank: u32,
    #[serde(rename = "Product", default)]
    pub product: u32,
    #[serde(rename = "Volume", default)]
    pub volume: f64,
    #[serde(rename = "TCVolume", default)]
    pub tc_volume: f64,
    #[serde(rename = "Ullage", default)]
    pub ullage: f64,
    #[serde(rename = "Height", default)]
    pub height: f64,
    #[serde(rename = "Water", default)]
    pub water: f64,
    #[serde(rename = "Temp", default)]
    pub temperature: f64,
}

/// `GetTotalizers` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct TotalizersData {
    #[serde(rename = "Totalizers", default)]
    pub totalizers: Vec<TotalizerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalizerEntry {
    #[serde(rename = "Hose", default)]
    pub hose: u32,
    #[serde(rename = "Product", default)]
    pub product: u32,
    #[serde(rename = "Volume", default)]
    pub volume: f64,
    #[serde(rename = "Amount", default)]
    pub amount: f64,
}

/// `GetDeliveries` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveriesData {
    #[serde(rename = "Deliveries", default)]
    pub deliveries: Vec<DeliveryEntry>,
}

/// One hose delivery counter. `volume > 0` means fuel is flowing.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryEntry {
    #[serde(rename = "Hose", default)]
    pub hose: u32,
    #[serde(rename = "Product", default)]
    pub product: u32,
    #[serde(rename = "Volume", default)]
    pub volume: f64,
    #[serde(rename = "Amount", default)]
    pub amount: f64,
    #[serde(rename = "Price", default)]
    pub price: f64,
}

/// `GetAlarms` response data.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmsData {
    #[serde(rename = "Alarms", default)]
    pub alarms: Vec<AlarmEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmEntry {
    #[serde(rename = "Id", default)]
    pub id: u32,
    #[serde(rename = "Priority", default)]
    pub priority: u32,
    #[serde(rename = "Active", default)]
    pub active: bool,
    #[serde(rename = "Acknowledged", default)]
    pub acknowledged: bool,
    #[serde(rename = "Text", default)]
    pub text: String,
}

/// `Authorize` request data.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeData {
    #[serde(rename = "Hose")]
    pub hose: u32,
    /// `"Volume"` or `"Amount"`.
    #[serde(rename = "Type")]
    pub preset_type: &'static str,
    #[serde(rename = "Value")]
    pub value: f64,
}

/// `Stop` / `Clear` request data.
#[derive(Debug, Clone, Serialize)]
pub struct HoseData {
    #[serde(rename = "Hose")]
    pub hose: u32,
}
