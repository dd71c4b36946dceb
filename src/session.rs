use crate::error::AppError;
use crate::export::write_atomic;
use crate::montage::MontageTable;
use crate::types::{CatalogItem, CostParams, ProjectRecord};
use serde::{Deserialize, Serialize};

/// All mutable state of one working session: master data, the editable
/// line items, the global parameters and the montage reference table.
/// The main loop owns exactly one of these; tests create their own, so
/// nothing global is shared.
#[derive(Debug, Default)]
pub struct Session {
    pub catalog: Vec<CatalogItem>,
    pub projects: Vec<ProjectRecord>,
    pub items: Vec<CatalogItem>,
    pub params: CostParams,
    pub site: String,
    pub site_object: String,
    pub note: String,
    pub montage: MontageTable,
}

/// The saved-to-disk slice of a session: parameters, header and the
/// edited line items. Master data is reloaded from its own CSVs, the
/// montage table persists to its own file.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub saved_at: String,
    pub site: String,
    pub site_object: String,
    pub note: String,
    pub params: CostParams,
    pub items: Vec<CatalogItem>,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            saved_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            site: self.site.clone(),
            site_object: self.site_object.clone(),
            note: self.note.clone(),
            params: self.params.clone(),
            items: self.items.clone(),
        }
    }

    /// Save the session snapshot as JSON. Atomic like every save here: on
    /// failure the previous file and the in-memory session both survive.
    pub fn save(&self, path: &str) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        write_atomic(path, json.as_bytes())
    }

    /// Restore parameters, header and line items from a saved snapshot.
    pub fn restore(&mut self, path: &str) -> Result<(), AppError> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: SessionSnapshot = serde_json::from_str(&text)?;
        log::info!("restoring session saved at {}", snapshot.saved_at);
        self.site = snapshot.site;
        self.site_object = snapshot.site_object;
        self.note = snapshot.note;
        self.params = snapshot.params;
        self.items = snapshot.items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let path = path.to_str().unwrap();

        let mut session = Session::default();
        session.site = "Kiel".to_string();
        session.params.hourly_rate = 31.5;
        session.items.push(CatalogItem {
            category: "Wasserzähler".to_string(),
            device: "UP-MK Zähler".to_string(),
            hours_per_unit: 0.33,
            unit_price: 12.0,
            quantity: 6,
        });
        session.save(path).unwrap();

        let mut restored = Session::default();
        restored.restore(path).unwrap();
        assert_eq!(restored.site, "Kiel");
        assert_eq!(restored.params.hourly_rate, 31.5);
        assert_eq!(restored.items, session.items);
    }

    #[test]
    fn restore_from_missing_file_is_an_error() {
        let mut session = Session::default();
        assert!(session.restore("does/not/exist.json").is_err());
    }

    #[test]
    fn fresh_session_starts_with_default_montage_table() {
        let session = Session::default();
        assert_eq!(session.montage.rows.len(), 9);
    }
}
