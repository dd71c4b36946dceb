// Entry point and high-level CLI flow.
//
// The binary drives the costing workflow through a small menu loop:
// load master data, pick a project to prefill quantities, edit positions
// and parameters, show/export the calculation, cluster the sites, and
// maintain the montage reference table. All state lives in one `Session`
// owned by the loop; every handler receives it explicitly.
mod cluster;
mod costing;
mod error;
mod export;
mod loader;
mod montage;
mod prefill;
mod session;
mod types;
mod util;

use log::LevelFilter;
use session::Session;
use simple_logger::SimpleLogger;
use std::io::{self, Write};
use types::{DeviceKind, MetricRow};

const CATALOG_CSV: &str = "assets/data/catalog.csv";
const PROJECTS_CSV: &str = "assets/data/projects.csv";
const MONTAGE_CSV: &str = "assets/zaehler_parameter.csv";
const SESSION_FILE: &str = "kalkulation_session.json";
const POSITIONS_CSV: &str = "kalkulation_positionen.csv";
const SUMMARY_CSV: &str = "kalkulation_zusammenfassung.csv";
const METRICS_JSON: &str = "kalkulation_kennzahlen.json";
const CLUSTER_CSV: &str = "stadt_cluster.csv";

/// Read a single line of input after printing a prompt.
fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Prompt for a float; empty input keeps the current value, garbage input
/// keeps it too (with a note), mirroring the lenient CSV coercion.
fn prompt_f64(label: &str, current: f64) -> f64 {
    let input = read_line(&format!("{label} [{current}]: "));
    if input.is_empty() {
        return current;
    }
    let (value, fell_back) = util::coerce_f64(Some(&input));
    if fell_back {
        println!("Could not read '{input}', keeping {current}.");
        return current;
    }
    value
}

fn prompt_count(label: &str, current: u32) -> u32 {
    let input = read_line(&format!("{label} [{current}]: "));
    if input.is_empty() {
        return current;
    }
    let (value, fell_back) = util::coerce_count(Some(&input));
    if fell_back {
        println!("Could not read '{input}', keeping {current}.");
        return current;
    }
    value
}

/// Handle option [1]: load catalog and projects from the asset CSVs.
///
/// The current line items are replaced by a fresh copy of the catalog;
/// coercion fallbacks are reported but never fail the load.
fn handle_load(session: &mut Session) {
    match loader::load_catalog(CATALOG_CSV) {
        Ok((catalog, report)) => {
            println!(
                "Catalog loaded: {} row(s), {} skipped, {} cell(s) coerced to 0.",
                util::format_int(report.total_rows as i64),
                util::format_int(report.skipped_rows as i64),
                util::format_int(report.fallback_cells as i64)
            );
            session.items = catalog.clone();
            session.catalog = catalog;
        }
        Err(e) => {
            eprintln!("Failed to load catalog: {e}\n");
            return;
        }
    }
    match loader::load_projects(PROJECTS_CSV) {
        Ok((projects, report)) => {
            println!(
                "Projects loaded: {} row(s), {} skipped, {} cell(s) coerced to 0.\n",
                util::format_int(report.total_rows as i64),
                util::format_int(report.skipped_rows as i64),
                util::format_int(report.fallback_cells as i64)
            );
            session.projects = projects;
        }
        Err(e) => eprintln!("Failed to load projects: {e}\n"),
    }
}

/// Handle option [2]: pick a historical project and prefill quantities,
/// or fall back to the plain catalog for manual entry.
fn handle_choose_project(session: &mut Session) {
    if session.catalog.is_empty() {
        println!("No master data loaded. Please load the CSVs first (option 1).\n");
        return;
    }
    println!("[0] Manual entry (catalog quantities as-is)");
    for (idx, project) in session.projects.iter().enumerate() {
        println!("[{}] {} – {}", idx + 1, project.site, project.site_object);
    }
    let choice = read_choice();
    let Ok(index) = choice.parse::<usize>() else {
        println!("Invalid choice.\n");
        return;
    };
    if index == 0 {
        session.items = session.catalog.clone();
        session.site.clear();
        session.site_object.clear();
        session.note.clear();
        println!("Manual entry selected.\n");
        return;
    }
    let Some(project) = session.projects.get(index - 1) else {
        println!("Invalid choice.\n");
        return;
    };
    session.items = prefill::prefill_from_project(&session.catalog, project);
    session.site = project.site.clone();
    session.site_object = project.site_object.clone();
    session.note = project.note.clone();
    println!("Selected: {} – {}", project.site, project.site_object);
    if !project.note.is_empty() {
        println!("Note: {}", project.note);
    }
    println!();
}

fn handle_edit(session: &mut Session) {
    loop {
        println!("[1] Edit a position quantity");
        println!("[2] Edit global parameters");
        println!("[0] Back\n");
        match read_choice().as_str() {
            "1" => edit_quantity(session),
            "2" => edit_params(session),
            "0" => return,
            _ => println!("Invalid choice.\n"),
        }
    }
}

fn edit_quantity(session: &mut Session) {
    if session.items.is_empty() {
        println!("No positions loaded.\n");
        return;
    }
    for (idx, item) in session.items.iter().enumerate() {
        println!(
            "[{:>2}] {} | {} | Anzahl: {}",
            idx + 1,
            item.category,
            item.device,
            item.quantity
        );
    }
    let input = read_line("Position number (empty to cancel): ");
    if input.is_empty() {
        return;
    }
    let Some(item) = input
        .parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| session.items.get_mut(i))
    else {
        println!("Invalid position.\n");
        return;
    };
    item.quantity = prompt_count("New quantity", item.quantity);
    println!();
}

fn edit_params(session: &mut Session) {
    let p = &mut session.params;
    p.staff_count = prompt_count("Staff count", p.staff_count).max(1);
    p.hours_per_day = prompt_f64("Hours per day", p.hours_per_day);
    p.hourly_rate = prompt_f64("Hourly rate (€/h)", p.hourly_rate);
    p.rate_per_km = prompt_f64("Travel rate (€/km)", p.rate_per_km);
    p.distance_km = prompt_f64("Total distance (km)", p.distance_km);
    p.surcharge_rate = prompt_f64("Surcharge rate (€/h)", p.surcharge_rate);
    p.surcharge_hours = prompt_f64("Surcharge hours", p.surcharge_hours);
    println!();
}

fn euro(v: f64) -> String {
    format!("{} €", util::format_number(v, 2))
}

/// Handle option [4]: recompute everything and print the detail table
/// plus the KPI block. Recomputation is cheap and side-effect-free, so
/// this runs from scratch on every call.
fn handle_compute(session: &Session) {
    if session.items.is_empty() {
        println!("No positions loaded. Please load the CSVs first (option 1).\n");
        return;
    }
    let (lines, totals) = costing::compute_line_items(&session.items, session.params.hourly_rate);
    let summary = costing::assemble_summary(&totals, &session.params);

    println!("Detailkalkulation je Position\n");
    let rows = export::position_rows(&lines);
    export::preview_table(&rows, rows.len());

    let metrics = vec![
        MetricRow {
            metric: "Gesamterlös".to_string(),
            value: euro(summary.total_revenue),
        },
        MetricRow {
            metric: "Arbeitsstunden (gesamt)".to_string(),
            value: format!("{} h", util::format_number(summary.total_labor_hours, 2)),
        },
        MetricRow {
            metric: "Lohnkosten".to_string(),
            value: euro(summary.total_labor_cost),
        },
        MetricRow {
            metric: "Fahrt- & Sonderkosten".to_string(),
            value: euro(summary.travel_cost + summary.surcharge_cost),
        },
        MetricRow {
            metric: "Deckungsbeitrag (gesamt)".to_string(),
            value: euro(summary.net_contribution),
        },
        MetricRow {
            metric: "Kalk. Arbeitstage".to_string(),
            value: format!("{} d", util::format_number(summary.estimated_workdays, 2)),
        },
        MetricRow {
            metric: "Marge".to_string(),
            value: format!("{} %", util::format_number(summary.margin_percent, 1)),
        },
    ];
    println!("Kennzahlen\n");
    export::preview_table(&metrics, metrics.len());
}

/// Handle option [5]: write the detail table and the one-row summary as
/// the two CSV documents of the costing export.
fn handle_export(session: &Session) {
    if session.items.is_empty() {
        println!("No positions loaded. Please load the CSVs first (option 1).\n");
        return;
    }
    let (lines, totals) = costing::compute_line_items(&session.items, session.params.hourly_rate);
    let summary = costing::assemble_summary(&totals, &session.params);

    let rows = export::position_rows(&lines);
    if let Err(e) = export::write_csv(POSITIONS_CSV, &rows) {
        eprintln!("Write error: {e}");
        return;
    }
    let summary_row = export::summary_row(
        &session.site,
        &session.site_object,
        &session.note,
        &session.params,
        &summary,
    );
    if let Err(e) = export::write_csv(SUMMARY_CSV, &[summary_row]) {
        eprintln!("Write error: {e}");
        return;
    }
    if let Err(e) = export::write_json(METRICS_JSON, &summary) {
        eprintln!("Write error: {e}");
        return;
    }
    log::info!("costing exported to {POSITIONS_CSV}, {SUMMARY_CSV} and {METRICS_JSON}");
    println!("Exported {POSITIONS_CSV}, {SUMMARY_CSV} and {METRICS_JSON}.\n");
}

/// Handle option [6]: aggregate sites, ask for features and k, run the
/// clustering and export the result table.
fn handle_cluster(session: &Session) {
    if session.projects.is_empty() {
        println!("No projects loaded. Please load the CSVs first (option 1).\n");
        return;
    }
    let aggregates = cluster::aggregate_sites(&session.projects);

    // Features with at least one installed device are preselected; an
    // all-zero column only flattens the distance space.
    let preselected: Vec<DeviceKind> = DeviceKind::ALL
        .into_iter()
        .filter(|&kind| aggregates.iter().any(|a| a.counts.get(kind) > 0))
        .collect();
    let preselected = if preselected.is_empty() {
        DeviceKind::ALL.to_vec()
    } else {
        preselected
    };

    for (idx, kind) in DeviceKind::ALL.iter().enumerate() {
        println!("[{}] {}", idx + 1, kind.column());
    }
    let input = read_line("Features (comma-separated numbers, empty = preselected): ");
    let mut features: Vec<DeviceKind> = Vec::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<usize>().ok().and_then(|i| {
            i.checked_sub(1)
                .and_then(|i| DeviceKind::ALL.get(i).copied())
        }) {
            Some(kind) if !features.contains(&kind) => features.push(kind),
            Some(_) => {}
            None => println!("Ignoring '{token}'."),
        }
    }
    if features.is_empty() {
        features = preselected;
    }

    let k = prompt_count("Number of clusters k (2-8)", 3) as usize;
    match cluster::cluster_sites(&aggregates, &features, k) {
        Ok(assignments) => {
            println!("\nCluster-Zuordnung je Stadt\n");
            let rows = export::cluster_rows(&assignments);
            export::preview_table(&rows, rows.len());
            if let Err(e) = export::write_csv(CLUSTER_CSV, &rows) {
                eprintln!("Write error: {e}");
            } else {
                println!("(Full table exported to {CLUSTER_CSV})\n");
            }
        }
        Err(e) => println!("Clustering not possible: {e}\n"),
    }
}

/// Handle option [7]: the montage reference table submenu.
fn handle_montage(session: &mut Session) {
    loop {
        println!("Zähler-Montage: Zeiten & Preise");
        println!("[1] Show table");
        println!("[2] Import CSV");
        println!("[3] Export CSV");
        println!("[4] Reset to defaults");
        println!("[5] Save to {MONTAGE_CSV}");
        println!("[0] Back\n");
        match read_choice().as_str() {
            "1" => {
                export::preview_table(&session.montage.rows, session.montage.rows.len());
                let duplicates = session.montage.duplicate_devices();
                if !duplicates.is_empty() {
                    println!("Warning: duplicate device name(s): {}\n", duplicates.join(", "));
                }
            }
            "2" => {
                let path = read_line("CSV path to import: ");
                if path.is_empty() {
                    continue;
                }
                match std::fs::read(&path) {
                    Ok(bytes) => match montage::MontageTable::import_csv(&bytes) {
                        Ok(table) => {
                            println!("Imported {} row(s).\n", table.rows.len());
                            session.montage = table;
                        }
                        Err(e) => println!("Import failed: {e}\n"),
                    },
                    Err(e) => println!("Could not read {path}: {e}\n"),
                }
            }
            "3" => {
                let path = read_line("Export path [zaehler_parameter_export.csv]: ");
                let path = if path.is_empty() {
                    "zaehler_parameter_export.csv".to_string()
                } else {
                    path
                };
                let result = session
                    .montage
                    .to_csv_bytes()
                    .and_then(|bytes| std::fs::write(&path, bytes).map_err(Into::into));
                match result {
                    Ok(()) => println!("Exported to {path}.\n"),
                    Err(e) => println!("Export failed: {e}\n"),
                }
            }
            "4" => {
                session.montage.reset();
                println!("Reset to built-in defaults.\n");
            }
            "5" => match session.montage.save(MONTAGE_CSV) {
                Ok(()) => println!("Saved to {MONTAGE_CSV}.\n"),
                Err(e) => println!("{e} (table kept in memory)\n"),
            },
            "0" => return,
            _ => println!("Invalid choice.\n"),
        }
    }
}

fn main() {
    let _ = SimpleLogger::new().with_level(LevelFilter::Info).init();

    let mut session = Session::default();
    session.montage = montage::MontageTable::load(MONTAGE_CSV);

    loop {
        println!("Zähler-Kalkulation");
        println!("[1] Load master data");
        println!("[2] Choose project (prefill quantities)");
        println!("[3] Edit positions & parameters");
        println!("[4] Show calculation");
        println!("[5] Export calculation (CSV)");
        println!("[6] Cluster sites");
        println!("[7] Montage reference table");
        println!("[8] Save session");
        println!("[9] Restore session");
        println!("[0] Quit\n");
        match read_choice().as_str() {
            "1" => handle_load(&mut session),
            "2" => handle_choose_project(&mut session),
            "3" => handle_edit(&mut session),
            "4" => handle_compute(&session),
            "5" => handle_export(&session),
            "6" => handle_cluster(&session),
            "7" => handle_montage(&mut session),
            "8" => match session.save(SESSION_FILE) {
                Ok(()) => println!("Session saved to {SESSION_FILE}.\n"),
                Err(e) => println!("{e} (session kept in memory)\n"),
            },
            "9" => match session.restore(SESSION_FILE) {
                Ok(()) => println!("Session restored from {SESSION_FILE}.\n"),
                Err(e) => println!("Could not restore session: {e}\n"),
            },
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-9.\n"),
        }
    }
}
