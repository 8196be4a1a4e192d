//! Live controller reading handlers: prices, deliveries, alarms,
//! totalizers, date/time.
//!
//! Unlike `status`/`tanks`, these are direct device reads with no
//! persisted fallback: an unreachable controller is an error.

use serde::Serialize;
use tabled::Tabled;

use forecourt_core::model::{AlarmSnapshot, DeliverySnapshot};
use forecourt_core::{MemoryStore, StatusResolver};
use forecourt_pts::{Product, PtsClient};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util::CommandContext;

async fn connect(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
) -> Result<PtsClient, CliError> {
    resolver
        .connect(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))
}

fn device_err(context: &CommandContext, err: forecourt_pts::Error) -> CliError {
    CliError::from_device(&context.endpoint_label, &context.login, err)
}

// ── Prices ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PriceView {
    product: Product,
    unit_price: f64,
}

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Price")]
    price: String,
}

pub async fn prices(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = connect(resolver, context).await?;
    let entries = client
        .product_prices()
        .await
        .map_err(|e| device_err(context, e))?;

    let views: Vec<PriceView> = entries
        .iter()
        .map(|e| PriceView {
            product: Product::from_code(e.product),
            unit_price: e.price,
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &views,
        |v| PriceRow {
            product: v.product.to_string(),
            price: format!("{:.2}", v.unit_price),
        },
        |v| format!("{} {:.2}", v.product, v.unit_price),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Deliveries ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeliveryRow {
    #[tabled(rename = "Hose")]
    hose: u32,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Volume (L)")]
    volume: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Active")]
    active: String,
}

pub async fn deliveries(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = connect(resolver, context).await?;
    let entries = client
        .deliveries()
        .await
        .map_err(|e| device_err(context, e))?;

    let snapshots: Vec<DeliverySnapshot> =
        entries.iter().map(DeliverySnapshot::from_wire).collect();

    let out = output::render_list(
        &global.output,
        &snapshots,
        |d| DeliveryRow {
            hose: d.hose,
            product: d.product.to_string(),
            volume: format!("{:.2}", d.volume_litres),
            amount: format!("{:.2}", d.amount),
            price: format!("{:.2}", d.unit_price),
            active: if d.is_active() { "yes" } else { "no" }.into(),
        },
        |d| format!("{} {} {:.2}", d.hose, d.product, d.volume_litres),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Alarms ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlarmRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Priority")]
    priority: u32,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Acked")]
    acknowledged: String,
    #[tabled(rename = "Text")]
    text: String,
}

pub async fn alarms(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = connect(resolver, context).await?;
    let entries = client.alarms().await.map_err(|e| device_err(context, e))?;

    let snapshots: Vec<AlarmSnapshot> = entries.iter().map(AlarmSnapshot::from_wire).collect();

    let out = output::render_list(
        &global.output,
        &snapshots,
        |a| AlarmRow {
            id: a.id,
            priority: a.priority,
            active: if a.active { "yes" } else { "no" }.into(),
            acknowledged: if a.acknowledged { "yes" } else { "no" }.into(),
            text: a.text.clone(),
        },
        |a| format!("{} {}", a.id, a.text),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Totalizers ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct TotalizerView {
    hose: u32,
    product: Product,
    volume_litres: f64,
    amount: f64,
}

#[derive(Tabled)]
struct TotalizerRow {
    #[tabled(rename = "Hose")]
    hose: u32,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Volume (L)")]
    volume: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

pub async fn totalizers(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = connect(resolver, context).await?;
    let entries = client
        .totalizers()
        .await
        .map_err(|e| device_err(context, e))?;

    let views: Vec<TotalizerView> = entries
        .iter()
        .map(|e| TotalizerView {
            hose: e.hose,
            product: Product::from_code(e.product),
            volume_litres: e.volume,
            amount: e.amount,
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &views,
        |v| TotalizerRow {
            hose: v.hose,
            product: v.product.to_string(),
            volume: format!("{:.2}", v.volume_litres),
            amount: format!("{:.2}", v.amount),
        },
        |v| format!("{} {} {:.2}", v.hose, v.product, v.volume_litres),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Date / time ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct DateTimeView {
    date: String,
    time: String,
}

pub async fn datetime(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = connect(resolver, context).await?;
    let data = client.date_time().await.map_err(|e| device_err(context, e))?;

    let view = DateTimeView {
        date: data.date,
        time: data.time,
    };

    let out = output::render_single(
        &global.output,
        &view,
        |v| format!("Controller time: {} {}", v.date, v.time),
        |v| format!("{} {}", v.date, v.time),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
