//! NJ MVC appointment types and the agency locations offering them.

use slotwatch_core::catalog::{Catalog, CatalogEntry};
use slotwatch_core::model::{AppointmentType, Location};

// Types the site lists without published location codes keep an empty table.
const TYPES: &[(&str, u32, &[(&str, u32)])] = &[
    ("INITIAL PERMIT (NOT FOR KNOWLEDGE TEST)", 15, INITIAL_PERMIT),
    ("CDL PERMIT OR ENDORSEMENT - (NOT FOR KNOWLEDGE TEST)", 14, &[]),
    ("REAL ID", 12, REAL_ID),
    ("NON-DRIVER ID", 16, &[]),
    ("KNOWLEDGE TESTING (NOT CDL)", 19, KNOWLEDGE_TESTING),
    ("RENEWAL: LICENSE OR NON-DRIVER ID", 11, &[]),
    ("RENEWAL: CDL", 6, &[]),
    ("TRANSFER FROM OUT OF STATE", 7, TRANSFER_FROM_OUT_OF_STATE),
    ("NEW TITLE OR REGISTRATION", 8, &[]),
    ("SENIOR NEW TITLE OR REGISTRATION (65+)", 9, &[]),
    ("REGISTRATION RENEWAL", 10, &[]),
    ("TITLE DUPLICATE/REPLACEMENT", 13, &[]),
];

const KNOWLEDGE_TESTING: &[(&str, u32)] = &[
    ("BAYONNE", 268),
    ("NEWARK", 281),
    ("NORTH BERGEN", 282),
    ("ELIZABETH", 290),
    ("EDISON", 275),
    ("WAYNE", 283),
    ("PATERSON", 285),
    ("LODI", 279),
];

const TRANSFER_FROM_OUT_OF_STATE: &[(&str, u32)] = &[
    ("ELIZABETH", 263),
    ("OAKLAND", 58),
    ("PATERSON", 59),
    ("LODI", 55),
    ("WAYNE", 67),
    ("RANDOLPH", 61),
    ("NORTH BERGEN", 57),
    ("NEWARK", 56),
    ("BAYONNE", 47),
    ("RAHWAY", 60),
    ("SOUTH PLAINFIELD", 63),
    ("EDISON", 52),
    ("FLEMINGTON", 53),
    ("BAKERS BASIN", 46),
    ("FREEHOLD", 54),
    ("EATONTOWN", 51),
    ("TOMS RIVER", 65),
    ("DELANCO", 50),
    ("CAMDEN", 49),
    ("WEST DEPTFORD", 68),
    ("SALEM", 64),
    ("VINELAND", 66),
    ("CARDIFF", 48),
    ("RIO GRANDE", 62),
];

const REAL_ID: &[(&str, u32)] = &[
    ("OAKLAND", 141),
    ("PATERSON", 142),
    ("LODI", 136),
    ("WAYNE", 140),
    ("RANDOLPH", 145),
    ("NORTH BERGEN", 139),
    ("NEWARK", 138),
    ("BAYONNE", 125),
    ("RAHWAY", 144),
    ("SOUTH PLAINFIELD", 131),
    ("EDISON", 132),
    ("FLEMINGTON", 133),
    ("BAKERS BASIN", 124),
    ("FREEHOLD", 135),
    ("EATONTOWN", 130),
    ("TOMS RIVER", 134),
    ("DELANCO", 129),
    ("CAMDEN", 127),
    ("WEST DEPTFORD", 143),
    ("SALEM", 128),
    ("VINELAND", 137),
    ("CARDIFF", 146),
    ("RIO GRANDE", 126),
];

const INITIAL_PERMIT: &[(&str, u32)] = &[
    ("OAKLAND", 203),
    ("PATERSON", 204),
    ("LODI", 198),
    ("WAYNE", 202),
    ("RANDOLPH", 207),
    ("NORTH BERGEN", 201),
    ("NEWARK", 200),
    ("BAYONNE", 187),
    ("RAHWAY", 206),
    ("SOUTH PLAINFIELD", 193),
    ("EDISON", 194),
    ("FLEMINGTON", 195),
    ("BAKERS BASIN", 186),
    ("FREEHOLD", 197),
    ("EATONTOWN", 192),
    ("TOMS RIVER", 196),
    ("DELANCO", 191),
    ("CAMDEN", 189),
    ("WEST DEPTFORD", 205),
    ("SALEM", 190),
    ("VINELAND", 199),
    ("CARDIFF", 208),
    ("RIO GRANDE", 188),
];

/// Build the static NJ MVC catalog.
#[must_use]
pub fn catalog() -> Catalog {
    Catalog::new(
        TYPES
            .iter()
            .map(|&(name, code, locations)| {
                CatalogEntry::new(
                    AppointmentType::new(name, code),
                    locations
                        .iter()
                        .map(|&(location, location_code)| Location::new(location, location_code))
                        .collect(),
                )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_every_type() {
        assert_eq!(catalog().appointment_types().count(), 12, "twelve appointment types");
    }

    #[test]
    fn resolves_known_codes() {
        let catalog = catalog();
        assert_eq!(catalog.type_code("REAL ID"), Ok(12), "real id code");
        assert_eq!(
            catalog.location_code("KNOWLEDGE TESTING (NOT CDL)", "ELIZABETH"),
            Ok(290),
            "knowledge testing elizabeth"
        );
        assert_eq!(
            catalog.location_code("TRANSFER FROM OUT OF STATE", "ELIZABETH"),
            Ok(263),
            "codes are scoped per type"
        );
    }

    #[test]
    fn locations_keep_table_order() {
        let catalog = catalog();
        let locations = catalog
            .locations_for("KNOWLEDGE TESTING (NOT CDL)")
            .unwrap_or_default();
        assert_eq!(locations.first().copied(), Some("BAYONNE"), "first location");
        assert_eq!(locations.len(), 8, "eight locations");
        assert_eq!(catalog.locations_for("RENEWAL: CDL"), Ok(Vec::new()), "no locations");
    }
}
