//! Station status, detail, and tank command handlers.

use std::fmt::Write as _;

use tabled::Tabled;

use forecourt_core::model::TankStatus;
use forecourt_core::{MemoryStore, ResolvedStatus, StationDetail, StatusResolver};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util::CommandContext;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TankTableRow {
    #[tabled(rename = "Tank")]
    tank: u32,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Level (L)")]
    level: String,
    #[tabled(rename = "Capacity (L)")]
    capacity: String,
    #[tabled(rename = "Temp (°C)")]
    temperature: String,
    #[tabled(rename = "Alarms")]
    alarms: String,
}

impl From<&TankStatus> for TankTableRow {
    fn from(t: &TankStatus) -> Self {
        let mut alarms = Vec::new();
        if t.low_level_alarm {
            alarms.push("LOW");
        }
        if t.high_level_alarm {
            alarms.push("HIGH");
        }
        Self {
            tank: t.tank,
            product: t.product.to_string(),
            level: format!("{:.1}", t.level_litres),
            capacity: format!("{:.1}", t.capacity_litres),
            temperature: format!("{:.1}", t.temperature_c),
            alarms: if alarms.is_empty() {
                "-".into()
            } else {
                alarms.join(",")
            },
        }
    }
}

// ── Detail formatting ───────────────────────────────────────────────

fn format_status(resolved: &ResolvedStatus, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Station:   {}", resolved.station_id);
    let _ = writeln!(
        out,
        "Status:    {}",
        output::colored_status(resolved.status, color)
    );
    let _ = writeln!(
        out,
        "Source:    {}",
        if resolved.controller_reachable {
            "live controller"
        } else {
            "persisted (controller unreachable)"
        }
    );
    match resolved.last_heartbeat {
        Some(ts) => {
            let _ = write!(out, "Heartbeat: {}", ts.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => {
            let _ = write!(out, "Heartbeat: never");
        }
    }
    out
}

fn format_detail(detail: &StationDetail, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} — {}", detail.name, detail.address);
    let _ = writeln!(out, "{}", format_status(&detail.resolved, color));

    if !detail.tanks.tanks.is_empty() {
        let source = if detail.tanks.live { "live" } else { "persisted" };
        let _ = writeln!(out, "\nTanks ({source}):");
        let rows: Vec<TankTableRow> = detail.tanks.tanks.iter().map(Into::into).collect();
        let _ = writeln!(
            out,
            "{}",
            tabled::Table::new(rows).with(tabled::settings::Style::rounded())
        );
    }

    if !detail.pricing.is_empty() {
        let _ = writeln!(out, "Pricing:");
        for row in &detail.pricing {
            let _ = writeln!(
                out,
                "  {:<15} {:.2} {}/L",
                row.product.to_string(),
                row.unit_price,
                row.currency
            );
        }
    }

    if let Some(ref config) = detail.config {
        let _ = write!(
            out,
            "Limits: {:.0} L / {:.0} per transaction{}",
            config.max_dispense_volume,
            config.max_dispense_amount,
            if config.maintenance_mode {
                " (maintenance mode)"
            } else {
                ""
            }
        );
    }

    out.trim_end().to_owned()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn status(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resolved = resolver
        .resolve(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &resolved,
        |r| format_status(r, color),
        |r| r.status.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn detail(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let detail = resolver
        .station_detail(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &detail,
        |d| format_detail(d, color),
        |d| format!("{} {}", d.id, d.resolved.status),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn tanks(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let report = resolver
        .tank_report(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))?;

    if !global.quiet && !report.live {
        eprintln!("note: controller unreachable, showing persisted tank rows");
    }

    let out = output::render_list(
        &global.output,
        &report.tanks,
        |t| TankTableRow::from(t),
        |t| format!("{} {} {:.1}", t.tank, t.product, t.level_litres),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
