// Editable reference table of montage times and prices per device. The
// table lives in memory, ships with built-in defaults and round-trips to
// a flat CSV file. Saving is atomic (temp file + rename) so a failed
// write never clobbers the previous file.
use crate::error::AppError;
use crate::export::write_atomic;
use crate::util::coerce_f64;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tabled::Tabled;

/// Columns of the persisted montage CSV.
pub const MONTAGE_COLUMNS: [&str; 3] = ["Geraet", "Montageaufwand_h", "Preis_EUR"];

/// Built-in device defaults: (device, montage hours, price in EUR).
const DEFAULT_ROWS: [(&str, f64, f64); 9] = [
    ("UP-MK Zähler", 0.33, 12.00),
    ("Aufputzzähler, Zapfhahnzähler + Zählwerkkopf", 0.33, 15.00),
    ("Hauswasserzähler (bis Q3=16)", 0.50, 20.00),
    ("Funkmodule WZ", 0.17, 5.00),
    ("Funkmodule WMZ", 0.17, 5.00),
    ("Split WMZ bis QN 10,0 m³/h", 0.75, 75.00),
    ("Split WMZ QN 15,0 - QN 40,0 m³/h", 0.92, 120.00),
    ("Split WMZ größer QN 40,0 m³/h", 1.01, 170.00),
    ("MK- und Verschraubungszähler bis QN 2,5m³/h", 0.50, 30.00),
];

#[derive(Debug, Deserialize)]
struct RawMontageRow {
    #[serde(rename = "Geraet")]
    device: Option<String>,
    #[serde(rename = "Montageaufwand_h")]
    hours: Option<String>,
    #[serde(rename = "Preis_EUR")]
    price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct MontageRow {
    #[serde(rename = "Geraet")]
    #[tabled(rename = "Geraet")]
    pub device: String,
    #[serde(rename = "Montageaufwand_h")]
    #[tabled(rename = "Montageaufwand_h")]
    pub hours: f64,
    #[serde(rename = "Preis_EUR")]
    #[tabled(rename = "Preis_EUR")]
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct MontageTable {
    pub rows: Vec<MontageRow>,
}

impl Default for MontageTable {
    fn default() -> Self {
        MontageTable::defaults()
    }
}

impl MontageTable {
    pub fn defaults() -> Self {
        let rows = DEFAULT_ROWS
            .iter()
            .map(|&(device, hours, price)| MontageRow {
                device: device.to_string(),
                hours,
                price,
            })
            .collect();
        MontageTable { rows }
    }

    /// Startup load: a missing, unreadable or column-incomplete file falls
    /// back to the built-in defaults. Only an explicit import surfaces
    /// schema problems.
    pub fn load(path: &str) -> Self {
        if !Path::new(path).exists() {
            return MontageTable::defaults();
        }
        match std::fs::read(path) {
            Ok(bytes) => match MontageTable::import_csv(&bytes) {
                Ok(table) => table,
                Err(e) => {
                    log::warn!("montage table in {path} not usable ({e}), using defaults");
                    MontageTable::defaults()
                }
            },
            Err(e) => {
                log::warn!("could not read {path} ({e}), using defaults");
                MontageTable::defaults()
            }
        }
    }

    /// Parse a montage CSV. Hours and prices are coerced with a 0 default
    /// and clamped to be non-negative; a missing column is a schema error.
    pub fn import_csv(bytes: &[u8]) -> Result<Self, AppError> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(bytes);
        let headers = rdr.headers()?.clone();
        for col in MONTAGE_COLUMNS {
            if !headers.iter().any(|h| h == col) {
                return Err(AppError::Schema {
                    column: col,
                    file: "montage CSV".to_string(),
                });
            }
        }
        let mut rows = Vec::new();
        for result in rdr.deserialize::<RawMontageRow>() {
            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("skipping unreadable montage row: {e}");
                    continue;
                }
            };
            let (hours, _) = coerce_f64(row.hours.as_deref());
            let (price, _) = coerce_f64(row.price.as_deref());
            rows.push(MontageRow {
                device: row.device.unwrap_or_default().trim().to_string(),
                hours: hours.max(0.0),
                price: price.max(0.0),
            });
        }
        Ok(MontageTable { rows })
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, AppError> {
        crate::export::csv_bytes(&self.rows)
    }

    /// Persist the table. Either the new content is fully written or the
    /// previous file stays intact; in-memory rows are never touched.
    pub fn save(&self, path: &str) -> Result<(), AppError> {
        let bytes = self.to_csv_bytes()?;
        write_atomic(path, &bytes)
    }

    pub fn reset(&mut self) {
        self.rows = MontageTable::defaults().rows;
    }

    /// Device names that appear more than once. Duplicates are tolerated
    /// but worth warning about since the device name acts as the key.
    pub fn duplicate_devices(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for row in &self.rows {
            if !seen.insert(row.device.as_str()) && !duplicates.contains(&row.device) {
                duplicates.push(row.device.clone());
            }
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_nine_devices() {
        let table = MontageTable::defaults();
        assert_eq!(table.rows.len(), 9);
        assert_eq!(table.rows[0].device, "UP-MK Zähler");
        assert_eq!(table.rows[0].hours, 0.33);
        assert_eq!(table.rows[0].price, 12.00);
    }

    #[test]
    fn import_rejects_missing_columns() {
        let csv = b"Geraet,Montageaufwand_h\nUP-MK,0.33\n";
        assert!(MontageTable::import_csv(csv).is_err());
    }

    #[test]
    fn import_clamps_and_coerces() {
        let csv = "Geraet,Montageaufwand_h,Preis_EUR\nUP-MK,-0.5,abc\nFunk,0.17,5\n";
        let table = MontageTable::import_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].hours, 0.0);
        assert_eq!(table.rows[0].price, 0.0);
        assert_eq!(table.rows[1].price, 5.0);
    }

    #[test]
    fn csv_round_trip_preserves_rows() {
        let table = MontageTable::defaults();
        let bytes = table.to_csv_bytes().unwrap();
        let reloaded = MontageTable::import_csv(&bytes).unwrap();
        assert_eq!(reloaded.rows, table.rows);
    }

    #[test]
    fn save_writes_atomically_and_load_restores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zaehler_parameter.csv");
        let path = path.to_str().unwrap();

        let mut table = MontageTable::defaults();
        table.rows[0].price = 14.5;
        table.save(path).unwrap();
        assert!(!Path::new(&format!("{path}.tmp")).exists());

        let reloaded = MontageTable::load(path);
        assert_eq!(reloaded.rows[0].price, 14.5);
        assert_eq!(reloaded.rows.len(), 9);
    }

    #[test]
    fn failed_save_leaves_rows_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // The target path is an existing directory, so the rename fails.
        let target = dir.path().join("blocked");
        std::fs::create_dir(&target).unwrap();
        let table = MontageTable::defaults();
        let before = table.rows.clone();
        let result = table.save(target.to_str().unwrap());
        assert!(result.is_err());
        assert_eq!(table.rows, before);
    }

    #[test]
    fn load_falls_back_to_defaults_for_missing_file() {
        let table = MontageTable::load("does/not/exist.csv");
        assert_eq!(table.rows.len(), 9);
    }

    #[test]
    fn duplicate_device_names_are_reported() {
        let mut table = MontageTable::defaults();
        table.rows.push(table.rows[0].clone());
        assert_eq!(table.duplicate_devices(), vec!["UP-MK Zähler".to_string()]);
    }
}
