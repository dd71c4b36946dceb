use crate::error::AppError;
use crate::types::{CatalogItem, ProjectRecord, RawCatalogRow, RawProjectRow};
use crate::util::{coerce_count, coerce_f64};
use csv::ReaderBuilder;

/// Columns that must exist in the catalog CSV.
pub const CATALOG_COLUMNS: [&str; 5] =
    ["Kategorie", "Gerät", "Std_pro_Einheit", "Preis_EUR", "Anzahl"];

/// Columns that must exist in the projects CSV. The count and note columns
/// are optional and default to 0 / "".
pub const PROJECT_COLUMNS: [&str; 2] = ["Stadt", "Objekt"];

/// What happened during a load: every cell that fell back to the zero
/// default is counted here instead of being surfaced as an error.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub fallback_cells: usize,
}

fn check_columns(
    headers: &csv::StringRecord,
    required: &[&'static str],
    file: &str,
) -> Result<(), AppError> {
    for &col in required {
        if !headers.iter().any(|h| h == col) {
            return Err(AppError::Schema {
                column: col,
                file: file.to_string(),
            });
        }
    }
    Ok(())
}

/// Load the item catalog. A missing required column halts the load with a
/// schema error; unparsable numeric cells are coerced to 0 and counted.
pub fn load_catalog(path: &str) -> Result<(Vec<CatalogItem>, LoadReport), AppError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    check_columns(&headers, &CATALOG_COLUMNS, path)?;

    let mut report = LoadReport::default();
    let mut items = Vec::new();
    for result in rdr.deserialize::<RawCatalogRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping unreadable catalog row: {e}");
                report.skipped_rows += 1;
                continue;
            }
        };

        let (hours_per_unit, fb_hours) = coerce_f64(row.hours_per_unit.as_deref());
        let (unit_price, fb_price) = coerce_f64(row.unit_price.as_deref());
        let (quantity, fb_qty) = coerce_count(row.quantity.as_deref());
        report.fallback_cells += [fb_hours, fb_price, fb_qty].iter().filter(|f| **f).count();

        items.push(CatalogItem {
            category: row.category.unwrap_or_default().trim().to_string(),
            device: row.device.unwrap_or_default().trim().to_string(),
            hours_per_unit,
            unit_price,
            quantity,
        });
    }
    if report.fallback_cells > 0 {
        log::warn!(
            "{} numeric cell(s) in {path} fell back to 0",
            report.fallback_cells
        );
    }
    Ok((items, report))
}

/// Load the historical project records.
pub fn load_projects(path: &str) -> Result<(Vec<ProjectRecord>, LoadReport), AppError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    check_columns(&headers, &PROJECT_COLUMNS, path)?;

    let mut report = LoadReport::default();
    let mut projects = Vec::new();
    for result in rdr.deserialize::<RawProjectRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping unreadable project row: {e}");
                report.skipped_rows += 1;
                continue;
            }
        };

        // A count column that is absent altogether is a plain 0, not a
        // fallback; only present-but-unparsable cells are counted.
        let mut counts = crate::types::DeviceCounts::default();
        let mut coerce_cell = |cell: &Option<String>| -> u32 {
            match cell {
                None => 0,
                Some(raw) => {
                    let (v, fell_back) = coerce_count(Some(raw));
                    if fell_back {
                        report.fallback_cells += 1;
                    }
                    v
                }
            }
        };
        counts.water_meters = coerce_cell(&row.water_meters);
        counts.heat_meters = coerce_cell(&row.heat_meters);
        counts.cold_meters = coerce_cell(&row.cold_meters);
        counts.allocators = coerce_cell(&row.allocators);

        projects.push(ProjectRecord {
            site: row.site.unwrap_or_default().trim().to_string(),
            site_object: row.site_object.unwrap_or_default().trim().to_string(),
            counts,
            note: row.note.unwrap_or_default().trim().to_string(),
        });
    }
    if report.fallback_cells > 0 {
        log::warn!(
            "{} count cell(s) in {path} fell back to 0",
            report.fallback_cells
        );
    }
    Ok((projects, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn catalog_missing_column_is_a_schema_error() {
        let file = write_temp("Kategorie,Gerät,Std_pro_Einheit,Preis_EUR\na,b,0.5,10\n");
        let err = load_catalog(file.path().to_str().unwrap()).unwrap_err();
        match err {
            crate::error::AppError::Schema { column, .. } => assert_eq!(column, "Anzahl"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn catalog_coercion_falls_back_to_zero_and_is_counted() {
        let file = write_temp(
            "Kategorie,Gerät,Std_pro_Einheit,Preis_EUR,Anzahl\n\
             Wasserzähler,UP-MK Zähler,kaputt,12.00,3\n\
             Wasserzähler,Funkmodule WZ,0.17,,2\n",
        );
        let (items, report) = load_catalog(file.path().to_str().unwrap()).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.fallback_cells, 2);
        assert_eq!(items[0].hours_per_unit, 0.0);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[1].unit_price, 0.0);
    }

    #[test]
    fn projects_default_missing_count_columns_to_zero() {
        let file = write_temp("Stadt,Objekt,Wasserzähler\nKiel,Hafenstr. 1,12\n");
        let (projects, report) = load_projects(file.path().to_str().unwrap()).unwrap();
        assert_eq!(report.fallback_cells, 0);
        assert_eq!(projects[0].counts.water_meters, 12);
        assert_eq!(projects[0].counts.heat_meters, 0);
        assert_eq!(projects[0].counts.allocators, 0);
        assert_eq!(projects[0].note, "");
    }

    #[test]
    fn projects_missing_site_column_is_a_schema_error() {
        let file = write_temp("Objekt,Wasserzähler\nHafenstr. 1,12\n");
        assert!(load_projects(file.path().to_str().unwrap()).is_err());
    }
}
