use std::collections::{HashMap, HashSet};

use crate::records::{City, Country};

/// Identifier sets used to classify alternate names.
///
/// Built once from fully parsed countries and cities, read only afterwards.
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    city_ids: HashSet<u32>,
    country_codes: HashSet<String>,
    country_code_by_geonameid: HashMap<u32, String>,
}

impl IdentifierIndex {
    pub fn new(countries: &[Country], cities: &[City]) -> Self {
        Self {
            city_ids: cities.iter().map(|city| city.id).collect(),
            country_codes: countries.iter().map(|c| c.code.clone()).collect(),
            country_code_by_geonameid: countries
                .iter()
                .filter(|c| c.geonameid != 0)
                .map(|c| (c.geonameid, c.code.clone()))
                .collect(),
        }
    }

    /// Assemble an index from sets prepared elsewhere
    pub fn from_parts(
        city_ids: HashSet<u32>,
        country_codes: HashSet<String>,
        country_code_by_geonameid: HashMap<u32, String>,
    ) -> Self {
        Self {
            city_ids,
            country_codes,
            country_code_by_geonameid,
        }
    }

    pub fn contains_city(&self, id: u32) -> bool {
        self.city_ids.contains(&id)
    }

    pub fn contains_country(&self, code: &str) -> bool {
        self.country_codes.contains(code)
    }

    /// Country code for a country geonameid, only if that code is known
    pub fn resolve_country(&self, geonameid: u32) -> Option<&str> {
        self.country_code_by_geonameid
            .get(&geonameid)
            .map(String::as_str)
            .filter(|code| self.contains_country(code))
    }

    pub fn cities_len(&self) -> usize {
        self.city_ids.len()
    }

    pub fn countries_len(&self) -> usize {
        self.country_codes.len()
    }
}
