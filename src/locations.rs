use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// A normalized output location: ISO3 code plus canonical display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub code: String,
    pub name: String,
}

/// Country-name resolution seam. A miss returns `None` and never fails
/// the run; the resolver handles the known exceptions itself.
pub trait CountryMatcher: Send + Sync {
    fn match_iso3(&self, name: &str) -> Option<Location>;
}

/// Matcher backed by the ISO 3166 table: case-insensitive exact match
/// first, then a containment pass that only accepts a unique candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoTableMatcher;

impl CountryMatcher for IsoTableMatcher {
    fn match_iso3(&self, name: &str) -> Option<Location> {
        let query = name.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        for country in rust_iso3166::ALL.iter() {
            if country.name.to_lowercase() == query {
                return Some(location_from(country));
            }
        }

        let mut candidates = rust_iso3166::ALL.iter().filter(|country| {
            let table_name = country.name.to_lowercase();
            table_name.contains(&query) || query.contains(&table_name)
        });
        match (candidates.next(), candidates.next()) {
            (Some(country), None) => Some(location_from(country)),
            _ => None,
        }
    }
}

fn location_from(country: &rust_iso3166::CountryCode) -> Location {
    Location {
        code: country.alpha3.to_string(),
        name: country.name.to_string(),
    }
}

/// Derives the sorted location list from forecast rows.
///
/// Unmatched names are skipped with a warning; the upstream data always
/// carries Kosovo under a spelling no general-purpose matcher resolves, so
/// the XKX entry is appended here as an explicit exception rather than
/// hidden inside the matcher.
pub fn resolve_locations(rows: &[Map<String, Value>], matcher: &dyn CountryMatcher) -> Vec<Location> {
    let names: BTreeSet<&str> = rows
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str))
        .collect();

    let mut locations = Vec::new();
    for name in names {
        match matcher.match_iso3(name) {
            Some(location) => locations.push(location),
            None => warn!("could not match country name {name:?}"),
        }
    }

    locations.push(Location {
        code: "XKX".to_string(),
        name: "Kosovo".to_string(),
    });

    locations.sort_by(|a, b| a.name.cmp(&b.name));
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_with_names(names: &[&str]) -> Vec<Map<String, Value>> {
        names
            .iter()
            .map(|name| {
                let mut row = Map::new();
                row.insert("name".to_string(), Value::String((*name).to_string()));
                row.insert("month_id".to_string(), Value::from(542));
                row
            })
            .collect()
    }

    #[test]
    fn matches_standard_names() {
        let matcher = IsoTableMatcher;
        let afg = matcher.match_iso3("Afghanistan").unwrap();
        assert_eq!(afg.code, "AFG");
        assert_eq!(afg.name, "Afghanistan");
        assert_eq!(matcher.match_iso3("albania").unwrap().code, "ALB");
    }

    #[test]
    fn kosovo_is_not_in_the_table() {
        assert_eq!(IsoTableMatcher.match_iso3("Kosovo"), None);
    }

    #[test]
    fn resolves_and_sorts_with_kosovo_sentinel() {
        // Duplicate rows per country mimic real month-by-month data.
        let rows = rows_with_names(&[
            "Algeria",
            "Afghanistan",
            "Kosovo",
            "Albania",
            "Afghanistan",
        ]);
        let locations = resolve_locations(&rows, &IsoTableMatcher);
        let pairs: Vec<(&str, &str)> = locations
            .iter()
            .map(|l| (l.code.as_str(), l.name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("AFG", "Afghanistan"),
                ("ALB", "Albania"),
                ("DZA", "Algeria"),
                ("XKX", "Kosovo"),
            ]
        );
    }

    #[test]
    fn sentinel_present_even_for_empty_input() {
        let locations = resolve_locations(&[], &IsoTableMatcher);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].code, "XKX");
        assert_eq!(locations[0].name, "Kosovo");
    }

    #[test]
    fn unresolvable_names_are_skipped() {
        let rows = rows_with_names(&["Afghanistan", "Atlantis", "Kosovo"]);
        let locations = resolve_locations(&rows, &IsoTableMatcher);
        assert_eq!(locations.len(), 2);
        assert!(locations.iter().all(|l| l.name != "Atlantis"));
    }
}
