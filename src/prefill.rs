use crate::types::{CatalogItem, DeviceKind, ProjectRecord};

/// Prefill quantities from a project by putting each device-kind total on
/// the first catalog row of the mapped category. This is a starting point;
/// the user re-allocates counts across the category afterwards.
///
/// A count whose mapped category has no catalog row is dropped (with a
/// warning), not treated as an error. Heat and cold meter counts land on
/// the same shared category row.
pub fn prefill_from_project(catalog: &[CatalogItem], project: &ProjectRecord) -> Vec<CatalogItem> {
    let mut items: Vec<CatalogItem> = catalog.to_vec();
    for item in &mut items {
        item.quantity = 0;
    }
    for kind in DeviceKind::ALL {
        let total = project.counts.get(kind);
        if total == 0 {
            continue;
        }
        match items.iter_mut().find(|i| i.category == kind.category()) {
            Some(first) => first.quantity += total,
            None => log::warn!(
                "no catalog row in category '{}', dropping {} unit(s) from prefill for {}",
                kind.category(),
                total,
                project.site
            ),
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceCounts;

    fn catalog() -> Vec<CatalogItem> {
        let mk = |category: &str, device: &str| CatalogItem {
            category: category.to_string(),
            device: device.to_string(),
            hours_per_unit: 0.5,
            unit_price: 20.0,
            quantity: 7,
        };
        vec![
            mk("Wasserzähler", "UP-MK Zähler"),
            mk("Wasserzähler", "Hauswasserzähler"),
            mk("Wärme-/Kältezähler", "Split WMZ"),
            mk("HKVE", "Heizkostenverteiler"),
        ]
    }

    fn project(counts: DeviceCounts) -> ProjectRecord {
        ProjectRecord {
            site: "Kiel".to_string(),
            site_object: "Hafenstr. 1".to_string(),
            counts,
            note: String::new(),
        }
    }

    #[test]
    fn empty_project_zeroes_every_quantity() {
        let items = prefill_from_project(&catalog(), &project(DeviceCounts::default()));
        assert!(items.iter().all(|i| i.quantity == 0));
    }

    #[test]
    fn count_lands_on_first_row_of_the_category() {
        let counts = DeviceCounts {
            water_meters: 5,
            ..DeviceCounts::default()
        };
        let items = prefill_from_project(&catalog(), &project(counts));
        assert_eq!(items[0].quantity, 5);
        assert!(items[1..].iter().all(|i| i.quantity == 0));
    }

    #[test]
    fn heat_and_cold_counts_share_one_category_row() {
        let counts = DeviceCounts {
            heat_meters: 3,
            cold_meters: 4,
            ..DeviceCounts::default()
        };
        let items = prefill_from_project(&catalog(), &project(counts));
        assert_eq!(items[2].quantity, 7);
    }

    #[test]
    fn count_without_matching_category_is_dropped() {
        let counts = DeviceCounts {
            allocators: 9,
            ..DeviceCounts::default()
        };
        let water_only: Vec<CatalogItem> = catalog()
            .into_iter()
            .filter(|i| i.category == "Wasserzähler")
            .collect();
        let items = prefill_from_project(&water_only, &project(counts));
        assert!(items.iter().all(|i| i.quantity == 0));
    }

    #[test]
    fn prefill_is_deterministic() {
        let counts = DeviceCounts {
            water_meters: 5,
            heat_meters: 2,
            ..DeviceCounts::default()
        };
        let a = prefill_from_project(&catalog(), &project(counts));
        let b = prefill_from_project(&catalog(), &project(counts));
        assert_eq!(a, b);
    }
}
