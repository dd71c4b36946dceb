use crate::error::AppError;
use crate::types::{
    ClusterAssignment, ClusterRow, CostParams, CostingSummary, LineComputation, PositionRow,
    SummaryRow,
};
use crate::util::format_number;
use serde::Serialize;
use std::fs;
use tabled::{settings::Style, Table, Tabled};

/// Serialize rows to CSV in memory, e.g. for download-style consumers.
pub fn csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        for r in rows {
            wtr.serialize(r)?;
        }
        wtr.flush()?;
    }
    Ok(buf)
}

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), AppError> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Write via a temp file and rename, so the caller either gets the new
/// content in full or keeps the old file. Failures are persistence
/// errors, the one error kind where callers promise unchanged state.
pub fn write_atomic(path: &str, bytes: &[u8]) -> Result<(), AppError> {
    let tmp = format!("{path}.tmp");
    fs::write(&tmp, bytes).map_err(|e| AppError::Persistence {
        path: path.to_string(),
        source: e,
    })?;
    fs::rename(&tmp, path).map_err(|e| AppError::Persistence {
        path: path.to_string(),
        source: e,
    })
}

/// Detail table rows, one per line item, numbers at 2-decimal display
/// precision.
pub fn position_rows(lines: &[LineComputation]) -> Vec<PositionRow> {
    lines
        .iter()
        .map(|line| PositionRow {
            category: line.category.clone(),
            device: line.device.clone(),
            quantity: line.quantity,
            hours_per_unit: format_number(line.hours_per_unit, 2),
            labor_hours: format_number(line.labor_hours, 2),
            unit_price: format_number(line.unit_price, 2),
            revenue: format_number(line.revenue, 2),
            labor_cost: format_number(line.labor_cost, 2),
            contribution: format_number(line.contribution, 2),
        })
        .collect()
}

/// The one-row summary "sheet": project header, parameters and results.
pub fn summary_row(
    site: &str,
    site_object: &str,
    note: &str,
    params: &CostParams,
    summary: &CostingSummary,
) -> SummaryRow {
    SummaryRow {
        site: site.to_string(),
        site_object: site_object.to_string(),
        note: note.to_string(),
        staff_count: params.staff_count,
        hours_per_day: format_number(params.hours_per_day, 2),
        hourly_rate: format_number(params.hourly_rate, 2),
        rate_per_km: format_number(params.rate_per_km, 2),
        distance_km: format_number(params.distance_km, 2),
        surcharge_rate: format_number(params.surcharge_rate, 2),
        surcharge_hours: format_number(params.surcharge_hours, 2),
        total_revenue: format_number(summary.total_revenue, 2),
        total_labor_hours: format_number(summary.total_labor_hours, 2),
        total_labor_cost: format_number(summary.total_labor_cost, 2),
        travel_and_surcharge: format_number(summary.travel_cost + summary.surcharge_cost, 2),
        net_contribution: format_number(summary.net_contribution, 2),
        margin_percent: format_number(summary.margin_percent, 1),
        estimated_workdays: format_number(summary.estimated_workdays, 2),
    }
}

pub fn cluster_rows(assignments: &[ClusterAssignment]) -> Vec<ClusterRow> {
    assignments
        .iter()
        .map(|a| ClusterRow {
            site: a.site.clone(),
            water_meters: a.counts.water_meters,
            heat_meters: a.counts.heat_meters,
            cold_meters: a.counts.cold_meters,
            allocators: a.counts.allocators,
            cluster_id: a.cluster_id,
            projected_x: format!("{:.4}", a.projected_x),
            projected_y: format!("{:.4}", a.projected_y),
        })
        .collect()
}

pub fn preview_table<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
