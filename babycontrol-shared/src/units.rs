/// Unit-of-measure catalogue.
///
/// The set of units is fixed; families choose defaults from it in their
/// settings and log entries record the abbreviation.

use serde::Serialize;

/// A unit and the activity types it applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub abbr: &'static str,
    pub name: &'static str,
    pub activity_types: &'static [&'static str],
}

#[rustfmt::skip]
pub const UNITS: &[Unit] = &[
    Unit {
        abbr: "OZ",
        name: "Ounces",
        activity_types: &["bottle", "solids", "pump", "medicine", "weight"],
    },
    Unit { abbr: "ML", name: "Milliliters", activity_types: &["bottle", "pump", "medicine"] },
    Unit { abbr: "TBSP", name: "Tablespoon", activity_types: &["solids", "medicine"] },
    Unit { abbr: "TSP", name: "Teaspoon", activity_types: &["solids", "medicine"] },
    Unit { abbr: "G", name: "Grams", activity_types: &["solids", "weight"] },
    Unit { abbr: "MG", name: "Milligrams", activity_types: &["medicine"] },
    Unit { abbr: "DROP", name: "Drops", activity_types: &["medicine"] },
    Unit { abbr: "LB", name: "Pounds", activity_types: &["weight"] },
    Unit { abbr: "KG", name: "Kilograms", activity_types: &["weight"] },
    Unit { abbr: "IN", name: "Inches", activity_types: &["height"] },
    Unit { abbr: "CM", name: "Centimeters", activity_types: &["height"] },
    Unit { abbr: "F", name: "Fahrenheit", activity_types: &["temp"] },
    Unit { abbr: "C", name: "Celsius", activity_types: &["temp"] },
];

/// Looks up a unit by abbreviation, case-insensitively
pub fn find(abbr: &str) -> Option<&'static Unit> {
    UNITS.iter().find(|u| u.abbr.eq_ignore_ascii_case(abbr))
}

/// Units usable for an activity type such as `"bottle"` or `"weight"`
pub fn for_activity(activity_type: &str) -> Vec<&'static Unit> {
    UNITS
        .iter()
        .filter(|u| u.activity_types.contains(&activity_type))
        .collect()
}

/// Whether `abbr` may be a default for `activity_type`
pub fn applies_to(abbr: &str, activity_type: &str) -> bool {
    find(abbr).is_some_and(|u| u.activity_types.contains(&activity_type))
}
