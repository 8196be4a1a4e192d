// Typed jsonPTS client
//
// One method per controller capability, each building a single-packet
// envelope and unwrapping the one response packet correlated by echoed id.
// Composed over `ControllerTransport`; the transport owns auth and
// single-flight, this layer owns packet framing and payload typing.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::pts::wire::{
    AlarmEntry, AlarmsData, AuthorizeData, ControllerTypeData, DateTimeData, DeliveriesData,
    DeliveryEntry, HoseData, PriceEntry, PricesData, RequestEnvelope, RequestPacket,
    ResponseEnvelope, ResponsePacket, TankEntry, TanksData, TotalizerEntry, TotalizersData,
};
use crate::transport::ControllerTransport;

/// Preset kind for a hose authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeKind {
    Volume,
    Amount,
}

impl AuthorizeKind {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Volume => "Volume",
            Self::Amount => "Amount",
        }
    }
}

/// Typed client for one controller session.
pub struct PtsClient {
    transport: ControllerTransport,
    next_id: AtomicU32,
}

impl PtsClient {
    pub fn new(transport: ControllerTransport) -> Self {
        Self {
            transport,
            next_id: AtomicU32::new(1),
        }
    }

    /// The underlying transport (for busy-probing via `try_send`).
    pub fn transport(&self) -> &ControllerTransport {
        &self.transport
    }

    fn packet(&self, packet_type: &str, data: Option<Value>) -> RequestPacket {
        RequestPacket {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            packet_type: packet_type.to_owned(),
            data,
        }
    }

    /// Issue one read packet and return the response packet that echoes
    /// its id.
    async fn round_trip(&self, packet: RequestPacket) -> Result<ResponsePacket, Error> {
        let id = packet.id;
        let envelope = RequestEnvelope::single(packet);
        let response = self.transport.send(&envelope).await?;
        Self::correlate(id, response)
    }

    fn correlate(id: u32, response: ResponseEnvelope) -> Result<ResponsePacket, Error> {
        response
            .packets
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::Deserialization {
                message: format!("response carries no packet answering id {id}"),
                body: String::new(),
            })
    }

    /// Read-only round trip: retried at most once on transport-level
    /// failure with a fresh handshake. Idempotent reads are safe to
    /// repeat; nothing else is.
    async fn read(&self, packet_type: &str) -> Result<ResponsePacket, Error> {
        let first = self.round_trip(self.packet(packet_type, None)).await;
        match first {
            Err(e) if e.is_transient() => {
                warn!(command = packet_type, error = %e, "read failed, retrying once");
                self.transport.reauthenticate().await?;
                self.round_trip(self.packet(packet_type, None)).await
            }
            other => other,
        }
    }

    /// Control round trip: never retried or resent at any layer. A
    /// timeout leaves the device in an unknown state; callers must
    /// re-query deliveries and alarms before deciding to retry.
    async fn control(&self, packet_type: &str, data: Option<Value>) -> Result<(), Error> {
        let packet = self.packet(packet_type, data);
        let id = packet.id;
        let envelope = RequestEnvelope::single(packet);
        let response = self.transport.send_control(&envelope).await?;
        Self::correlate(id, response)?;
        Ok(())
    }

    fn unwrap_data<T: DeserializeOwned>(packet: ResponsePacket) -> Result<T, Error> {
        let data = packet.data.unwrap_or(Value::Null);
        serde_json::from_value(data.clone()).map_err(|e| Error::Deserialization {
            message: format!("{} payload: {e}", packet.packet_type),
            body: data.to_string(),
        })
    }

    // ── Read-only capabilities ───────────────────────────────────────

    /// `GetControllerType` — firmware identification string.
    pub async fn controller_type(&self) -> Result<String, Error> {
        let packet = self.read("GetControllerType").await?;
        let data: ControllerTypeData = Self::unwrap_data(packet)?;
        Ok(data.controller_type)
    }

    /// `GetDateTime` — the controller's clock.
    pub async fn date_time(&self) -> Result<DateTimeData, Error> {
        let packet = self.read("GetDateTime").await?;
        Self::unwrap_data(packet)
    }

    /// `GetProductPrices` — per-product unit prices configured on the
    /// controller.
    pub async fn product_prices(&self) -> Result<Vec<PriceEntry>, Error> {
        let packet = self.read("GetProductPrices").await?;
        let data: PricesData = Self::unwrap_data(packet)?;
        Ok(data.prices)
    }

    /// `GetTanks` — point-in-time tank probe readings.
    pub async fn tanks(&self) -> Result<Vec<TankEntry>, Error> {
        let packet = self.read("GetTanks").await?;
        let data: TanksData = Self::unwrap_data(packet)?;
        Ok(data.tanks)
    }

    /// `GetTotalizers` — cumulative per-hose counters.
    pub async fn totalizers(&self) -> Result<Vec<TotalizerEntry>, Error> {
        let packet = self.read("GetTotalizers").await?;
        let data: TotalizersData = Self::unwrap_data(packet)?;
        Ok(data.totalizers)
    }

    /// `GetDeliveries` — current per-hose delivery counters.
    pub async fn deliveries(&self) -> Result<Vec<DeliveryEntry>, Error> {
        let packet = self.read("GetDeliveries").await?;
        let data: DeliveriesData = Self::unwrap_data(packet)?;
        Ok(data.deliveries)
    }

    /// `GetAlarms` — active and historical controller alarms.
    pub async fn alarms(&self) -> Result<Vec<AlarmEntry>, Error> {
        let packet = self.read("GetAlarms").await?;
        let data: AlarmsData = Self::unwrap_data(packet)?;
        Ok(data.alarms)
    }

    // ── Control capabilities (device-side effects) ───────────────────

    /// `Authorize` — unlock a hose for a preset volume or amount.
    ///
    /// Never blind-retry this on timeout: a retried authorize can
    /// double-authorize the hose. Re-query [`deliveries`](Self::deliveries)
    /// and [`alarms`](Self::alarms) first.
    pub async fn authorize_hose(
        &self,
        hose: u32,
        kind: AuthorizeKind,
        value: f64,
    ) -> Result<(), Error> {
        debug!(hose, kind = kind.wire_name(), value, "authorizing hose");
        let data = AuthorizeData {
            hose,
            preset_type: kind.wire_name(),
            value,
        };
        self.control("Authorize", Some(to_value(&data))).await
    }

    /// `Stop` — stop an in-progress delivery on one hose.
    pub async fn stop_delivery(&self, hose: u32) -> Result<(), Error> {
        debug!(hose, "stopping delivery");
        self.control("Stop", Some(to_value(&HoseData { hose })))
            .await
    }

    /// `EmergencyStop` — halt every hose on the controller.
    pub async fn emergency_stop(&self) -> Result<(), Error> {
        warn!("emergency stop issued");
        self.control("EmergencyStop", None).await
    }

    /// `Clear` — clear a completed delivery from a hose so the next
    /// authorization can begin.
    pub async fn clear_delivery(&self, hose: u32) -> Result<(), Error> {
        debug!(hose, "clearing delivery");
        self.control("Clear", Some(to_value(&HoseData { hose })))
            .await
    }
}

/// Serialize a request payload struct. Payload structs contain only
/// plain fields, so this cannot fail.
fn to_value<T: serde::Serialize>(data: &T) -> Value {
    serde_json::to_value(data).expect("request payload serialization")
}
