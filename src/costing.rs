use crate::types::{CatalogItem, CostParams, CostingSummary, LineComputation, LineTotals};

/// Lower bound for hours-per-day in the workday estimate, so a zero input
/// cannot divide by zero.
pub const HOURS_PER_DAY_FLOOR: f64 = 1e-4;

/// Derive per-position economics and their sums from the current line
/// items. Pure arithmetic; negative quantities or prices are not rejected
/// and flow through as-is.
pub fn compute_line_items(
    items: &[CatalogItem],
    hourly_rate: f64,
) -> (Vec<LineComputation>, LineTotals) {
    let mut lines = Vec::with_capacity(items.len());
    let mut totals = LineTotals::default();
    for item in items {
        let quantity = item.quantity as f64;
        let revenue = item.unit_price * quantity;
        let labor_hours = item.hours_per_unit * quantity;
        let labor_cost = labor_hours * hourly_rate;
        let contribution = revenue - labor_cost;

        totals.revenue += revenue;
        totals.labor_hours += labor_hours;
        totals.labor_cost += labor_cost;
        totals.contribution += contribution;
        totals.quantity += item.quantity;

        lines.push(LineComputation {
            category: item.category.clone(),
            device: item.device.clone(),
            quantity: item.quantity,
            hours_per_unit: item.hours_per_unit,
            unit_price: item.unit_price,
            revenue,
            labor_hours,
            labor_cost,
            contribution,
        });
    }
    (lines, totals)
}

/// Combine the line totals with travel and surcharge costs into the final
/// profitability summary. No rounding happens here; formatting to display
/// precision is left to the presentation layer.
pub fn assemble_summary(totals: &LineTotals, params: &CostParams) -> CostingSummary {
    let travel_cost = params.distance_km * params.rate_per_km;
    let surcharge_cost = params.surcharge_hours * params.surcharge_rate;
    let grand_total_cost = totals.labor_cost + travel_cost + surcharge_cost;
    let net_contribution = totals.revenue - grand_total_cost;
    let margin_percent = if totals.revenue > 0.0 {
        net_contribution / totals.revenue * 100.0
    } else {
        0.0
    };
    let estimated_workdays = totals.labor_hours
        / (params.staff_count as f64 * params.hours_per_day.max(HOURS_PER_DAY_FLOOR));

    CostingSummary {
        total_revenue: totals.revenue,
        total_labor_hours: totals.labor_hours,
        total_labor_cost: totals.labor_cost,
        total_contribution: totals.contribution,
        total_quantity: totals.quantity,
        travel_cost,
        surcharge_cost,
        grand_total_cost,
        net_contribution,
        margin_percent,
        estimated_workdays,
    }
}
