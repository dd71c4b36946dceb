use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// The fixed set of device kinds tracked per project site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    WaterMeter,
    HeatMeter,
    ColdMeter,
    HeatCostAllocator,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 4] = [
        DeviceKind::WaterMeter,
        DeviceKind::HeatMeter,
        DeviceKind::ColdMeter,
        DeviceKind::HeatCostAllocator,
    ];

    /// Count column header used in `projects.csv`.
    pub fn column(self) -> &'static str {
        match self {
            DeviceKind::WaterMeter => "Wasserzähler",
            DeviceKind::HeatMeter => "WMZ",
            DeviceKind::ColdMeter => "KMZ",
            DeviceKind::HeatCostAllocator => "HKV",
        }
    }

    /// Catalog category that project counts of this kind prefill into.
    /// Heat and cold meters share a single catalog category.
    pub fn category(self) -> &'static str {
        match self {
            DeviceKind::WaterMeter => "Wasserzähler",
            DeviceKind::HeatMeter | DeviceKind::ColdMeter => "Wärme-/Kältezähler",
            DeviceKind::HeatCostAllocator => "HKVE",
        }
    }
}

/// Per-kind device counts for one project row or one aggregated site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCounts {
    pub water_meters: u32,
    pub heat_meters: u32,
    pub cold_meters: u32,
    pub allocators: u32,
}

impl DeviceCounts {
    pub fn get(&self, kind: DeviceKind) -> u32 {
        match kind {
            DeviceKind::WaterMeter => self.water_meters,
            DeviceKind::HeatMeter => self.heat_meters,
            DeviceKind::ColdMeter => self.cold_meters,
            DeviceKind::HeatCostAllocator => self.allocators,
        }
    }

    pub fn add(&mut self, other: &DeviceCounts) {
        self.water_meters += other.water_meters;
        self.heat_meters += other.heat_meters;
        self.cold_meters += other.cold_meters;
        self.allocators += other.allocators;
    }
}

#[derive(Debug, Deserialize)]
pub struct RawCatalogRow {
    #[serde(rename = "Kategorie")]
    pub category: Option<String>,
    #[serde(rename = "Gerät")]
    pub device: Option<String>,
    #[serde(rename = "Std_pro_Einheit")]
    pub hours_per_unit: Option<String>,
    #[serde(rename = "Preis_EUR")]
    pub unit_price: Option<String>,
    #[serde(rename = "Anzahl")]
    pub quantity: Option<String>,
}

/// One billable catalog position. Loaded once from the catalog CSV; the
/// quantity is the only field mutated afterwards (by the user or by the
/// project prefill) and is never written back to the catalog source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub category: String,
    pub device: String,
    pub hours_per_unit: f64,
    pub unit_price: f64,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RawProjectRow {
    #[serde(rename = "Stadt")]
    pub site: Option<String>,
    #[serde(rename = "Objekt")]
    pub site_object: Option<String>,
    #[serde(rename = "Wasserzähler")]
    pub water_meters: Option<String>,
    #[serde(rename = "WMZ")]
    pub heat_meters: Option<String>,
    #[serde(rename = "KMZ")]
    pub cold_meters: Option<String>,
    #[serde(rename = "HKV")]
    pub allocators: Option<String>,
    #[serde(rename = "Bemerkungen")]
    pub note: Option<String>,
}

/// One historical project record. Read-only reference data.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub site: String,
    pub site_object: String,
    pub counts: DeviceCounts,
    pub note: String,
}

/// Derived per-position economics; recomputed on every parameter change.
#[derive(Debug, Clone)]
pub struct LineComputation {
    pub category: String,
    pub device: String,
    pub quantity: u32,
    pub hours_per_unit: f64,
    pub unit_price: f64,
    pub revenue: f64,
    pub labor_hours: f64,
    pub labor_cost: f64,
    pub contribution: f64,
}

/// Sums over all line computations, before travel/surcharge assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineTotals {
    pub revenue: f64,
    pub labor_hours: f64,
    pub labor_cost: f64,
    pub contribution: f64,
    pub quantity: u32,
}

/// Global costing parameters supplied by the user. Defaults mirror the
/// values the tool starts with before any editing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostParams {
    pub hourly_rate: f64,
    pub distance_km: f64,
    pub rate_per_km: f64,
    pub surcharge_hours: f64,
    pub surcharge_rate: f64,
    pub staff_count: u32,
    pub hours_per_day: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        CostParams {
            hourly_rate: 28.0,
            distance_km: 0.0,
            rate_per_km: 0.30,
            surcharge_hours: 0.0,
            surcharge_rate: 45.0,
            staff_count: 2,
            hours_per_day: 8.0,
        }
    }
}

/// The final profitability summary over all lines plus global parameters.
#[derive(Debug, Clone, Serialize)]
pub struct CostingSummary {
    pub total_revenue: f64,
    pub total_labor_hours: f64,
    pub total_labor_cost: f64,
    pub total_contribution: f64,
    pub total_quantity: u32,
    pub travel_cost: f64,
    pub surcharge_cost: f64,
    pub grand_total_cost: f64,
    pub net_contribution: f64,
    pub margin_percent: f64,
    pub estimated_workdays: f64,
}

/// Summed device counts for one distinct site. Feeds the cluster analysis.
#[derive(Debug, Clone)]
pub struct SiteAggregate {
    pub site: String,
    pub counts: DeviceCounts,
}

/// Cluster id plus 2D projection for one site. Ids are not stable labels:
/// re-running with other features or k may permute them.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    pub site: String,
    pub counts: DeviceCounts,
    pub cluster_id: usize,
    pub projected_x: f64,
    pub projected_y: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PositionRow {
    #[serde(rename = "Kategorie")]
    #[tabled(rename = "Kategorie")]
    pub category: String,
    #[serde(rename = "Gerät")]
    #[tabled(rename = "Gerät")]
    pub device: String,
    #[serde(rename = "Anzahl")]
    #[tabled(rename = "Anzahl")]
    pub quantity: u32,
    #[serde(rename = "Std_pro_Einheit")]
    #[tabled(rename = "Std_pro_Einheit")]
    pub hours_per_unit: String,
    #[serde(rename = "Arbeitsstunden")]
    #[tabled(rename = "Arbeitsstunden")]
    pub labor_hours: String,
    #[serde(rename = "Preis_EUR")]
    #[tabled(rename = "Preis_EUR")]
    pub unit_price: String,
    #[serde(rename = "Erlös")]
    #[tabled(rename = "Erlös")]
    pub revenue: String,
    #[serde(rename = "Lohnkosten")]
    #[tabled(rename = "Lohnkosten")]
    pub labor_cost: String,
    #[serde(rename = "DB_Pos")]
    #[tabled(rename = "DB_Pos")]
    pub contribution: String,
}

/// The single-row summary "sheet" of the costing export.
#[derive(Debug, Serialize, Clone)]
pub struct SummaryRow {
    #[serde(rename = "Stadt")]
    pub site: String,
    #[serde(rename = "Objekt")]
    pub site_object: String,
    #[serde(rename = "Bemerkungen")]
    pub note: String,
    #[serde(rename = "Mitarbeiter")]
    pub staff_count: u32,
    #[serde(rename = "Stunden_pro_Tag")]
    pub hours_per_day: String,
    #[serde(rename = "Stundenlohn")]
    pub hourly_rate: String,
    #[serde(rename = "Fahrpauschale_EUR_km")]
    pub rate_per_km: String,
    #[serde(rename = "Gesamt_km")]
    pub distance_km: String,
    #[serde(rename = "Sonder_Satz")]
    pub surcharge_rate: String,
    #[serde(rename = "Sonder_Stunden")]
    pub surcharge_hours: String,
    #[serde(rename = "Gesamterlös")]
    pub total_revenue: String,
    #[serde(rename = "Gesamtstunden")]
    pub total_labor_hours: String,
    #[serde(rename = "Lohnkosten")]
    pub total_labor_cost: String,
    #[serde(rename = "Fahrt_Sonder")]
    pub travel_and_surcharge: String,
    #[serde(rename = "Deckungsbeitrag")]
    pub net_contribution: String,
    #[serde(rename = "Marge_Prozent")]
    pub margin_percent: String,
    #[serde(rename = "Arbeitstage")]
    pub estimated_workdays: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ClusterRow {
    #[serde(rename = "Stadt")]
    #[tabled(rename = "Stadt")]
    pub site: String,
    #[serde(rename = "Wasserzähler")]
    #[tabled(rename = "Wasserzähler")]
    pub water_meters: u32,
    #[serde(rename = "WMZ")]
    #[tabled(rename = "WMZ")]
    pub heat_meters: u32,
    #[serde(rename = "KMZ")]
    #[tabled(rename = "KMZ")]
    pub cold_meters: u32,
    #[serde(rename = "HKV")]
    #[tabled(rename = "HKV")]
    pub allocators: u32,
    #[serde(rename = "Cluster")]
    #[tabled(rename = "Cluster")]
    pub cluster_id: usize,
    #[serde(rename = "PCA1")]
    #[tabled(rename = "PCA1")]
    pub projected_x: String,
    #[serde(rename = "PCA2")]
    #[tabled(rename = "PCA2")]
    pub projected_y: String,
}

/// One labeled metric for the console KPI block.
#[derive(Debug, Tabled, Clone)]
pub struct MetricRow {
    #[tabled(rename = "Kennzahl")]
    pub metric: String,
    #[tabled(rename = "Wert")]
    pub value: String,
}
