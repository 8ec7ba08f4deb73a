use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::records::{City, CityTranslation, Country, CountryTranslation};
use crate::reverse;

/// Language used when none is requested and as the first fallback
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_LIMIT: usize = 10;
/// Shortest accepted suggest query, in characters
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CityResult<'a> {
    pub id: u32,
    pub name: &'a str,
    pub country: &'a str,
    pub country_code: &'a str,
    pub population: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CityDetail<'a> {
    pub id: u32,
    pub name: &'a str,
    pub country: &'a str,
    pub coordinates: Coordinates,
    pub elevation: Option<i32>,
    pub population: u64,
    pub timezone: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NearestCity<'a> {
    pub city: CityDetail<'a>,
    pub request_coordinates: Coordinates,
    pub distance_km: f64,
}

/// Searchable lowercase name of a city
struct Entry {
    id: u32,
    value: String,
}

/// Read side over seeded tables: localized names, substring suggest,
/// city details and localized nearest city.
pub struct Catalog {
    cities: Vec<City>,
    city_by_id: HashMap<u32, usize>,
    countries: HashMap<String, Country>,
    // id -> lang -> name
    city_names: HashMap<u32, HashMap<String, String>>,
    // code -> lang -> name
    country_names: HashMap<String, HashMap<String, String>>,
    entries: Vec<Entry>,
}

impl Catalog {
    /// Later translations of the same `(id, lang)` replace earlier ones
    pub fn new(
        countries: Vec<Country>,
        cities: Vec<City>,
        city_translations: Vec<CityTranslation>,
        country_translations: Vec<CountryTranslation>,
    ) -> Self {
        let city_by_id: HashMap<u32, usize> = cities
            .iter()
            .enumerate()
            .map(|(position, city)| (city.id, position))
            .collect();

        let mut entries: Vec<Entry> = cities
            .iter()
            .map(|city| Entry {
                id: city.id,
                value: city.name.to_lowercase(),
            })
            .collect();

        let mut city_names: HashMap<u32, HashMap<String, String>> = HashMap::new();
        for item in city_translations {
            if !city_by_id.contains_key(&item.city_id) {
                continue;
            }
            entries.push(Entry {
                id: item.city_id,
                value: item.name.to_lowercase(),
            });
            city_names
                .entry(item.city_id)
                .or_default()
                .insert(item.lang, item.name);
        }

        let mut country_names: HashMap<String, HashMap<String, String>> = HashMap::new();
        for item in country_translations {
            country_names
                .entry(item.country_code)
                .or_default()
                .insert(item.lang, item.name);
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Catalog: {} cities, {} countries, {} search entries",
            cities.len(),
            countries.len(),
            entries.len()
        );

        Self {
            countries: countries
                .into_iter()
                .map(|country| (country.code.clone(), country))
                .collect(),
            cities,
            city_by_id,
            city_names,
            country_names,
            entries,
        }
    }

    pub fn get(&self, id: u32) -> Option<&City> {
        self.city_by_id.get(&id).map(|position| &self.cities[*position])
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    /// City name in `lang`, then in english, then the default name
    pub fn city_name(&self, id: u32, lang: &str) -> Option<&str> {
        let city = self.get(id)?;
        let translated = self
            .city_names
            .get(&id)
            .and_then(|names| names.get(lang).or_else(|| names.get(DEFAULT_LANG)));
        Some(translated.map(String::as_str).unwrap_or(&city.name))
    }

    /// Country name in `lang`, then in english, then the default name
    pub fn country_name(&self, code: &str, lang: &str) -> Option<&str> {
        let translated = self
            .country_names
            .get(code)
            .and_then(|names| names.get(lang).or_else(|| names.get(DEFAULT_LANG)));
        match translated {
            Some(name) => Some(name.as_str()),
            None => self.countries.get(code).map(|c| c.name.as_str()),
        }
    }

    /// Languages present in city or country translations, sorted
    pub fn languages(&self) -> Vec<&str> {
        self.city_names
            .values()
            .chain(self.country_names.values())
            .flat_map(|names| names.keys().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cities whose default or translated name contains `query` (case
    /// insensitive), most populated first.
    ///
    /// Empty `lang` means english, `limit == 0` means [`DEFAULT_LIMIT`].
    /// Cities of unknown countries are not suggested.
    pub fn suggest(&self, query: &str, lang: &str, limit: usize) -> Result<Vec<CityResult<'_>>> {
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(Error::QueryTooShort {
                min: MIN_QUERY_CHARS,
            });
        }
        let lang = if lang.is_empty() { DEFAULT_LANG } else { lang };
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        let pattern = query.to_lowercase();

        let mut found = self
            .entries
            .iter()
            .filter(|entry| entry.value.contains(&pattern))
            .unique_by(|entry| entry.id)
            .filter_map(|entry| self.get(entry.id))
            .filter(|city| self.countries.contains_key(&city.country_code))
            .collect::<Vec<_>>();

        // stable, equal populations keep file order
        found.sort_by(|lhs, rhs| rhs.population.cmp(&lhs.population));

        Ok(found
            .into_iter()
            .take(limit)
            .map(|city| CityResult {
                id: city.id,
                name: self.city_name(city.id, lang).unwrap_or(&city.name),
                country: self.country(city, lang),
                country_code: &city.country_code,
                population: city.population,
            })
            .collect())
    }

    /// Localized city details, `None` for an unknown id
    pub fn city(&self, id: u32, lang: &str) -> Option<CityDetail<'_>> {
        let lang = if lang.is_empty() { DEFAULT_LANG } else { lang };
        self.get(id).map(|city| self.detail(city, lang))
    }

    /// Localized nearest city, `None` only for an empty catalog
    pub fn nearest(&self, loc: (f64, f64), lang: &str) -> Option<NearestCity<'_>> {
        let lang = if lang.is_empty() { DEFAULT_LANG } else { lang };
        let item = reverse::nearest(&self.cities, loc)?;
        Some(NearestCity {
            city: self.detail(item.city, lang),
            request_coordinates: Coordinates {
                lat: loc.0,
                lon: loc.1,
            },
            distance_km: item.distance,
        })
    }

    fn country<'a>(&'a self, city: &'a City, lang: &str) -> &'a str {
        self.country_name(&city.country_code, lang)
            .unwrap_or(&city.country_code)
    }

    fn detail<'a>(&'a self, city: &'a City, lang: &str) -> CityDetail<'a> {
        CityDetail {
            id: city.id,
            name: self.city_name(city.id, lang).unwrap_or(&city.name),
            country: self.country(city, lang),
            coordinates: Coordinates {
                lat: city.latitude,
                lon: city.longitude,
            },
            elevation: city.elevation,
            population: city.population,
            timezone: city.timezone.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(id: u32, name: &str, country_code: &str, population: u64, loc: (f64, f64)) -> City {
        City {
            id,
            country_code: country_code.to_owned(),
            name: name.to_owned(),
            population,
            latitude: loc.0,
            longitude: loc.1,
            elevation: None,
            timezone: Some("Europe/Moscow".to_owned()),
        }
    }

    fn city_tr(city_id: u32, lang: &str, name: &str) -> CityTranslation {
        CityTranslation {
            city_id,
            lang: lang.to_owned(),
            name: name.to_owned(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                Country {
                    code: "RU".to_owned(),
                    name: "Russia".to_owned(),
                    geonameid: 2017370,
                },
                Country {
                    code: "DE".to_owned(),
                    name: "Germany".to_owned(),
                    geonameid: 2921044,
                },
            ],
            vec![
                city(472045, "Voronezh", "RU", 848752, (51.67204, 39.1843)),
                city(524901, "Moscow", "RU", 10381222, (55.75222, 37.61556)),
                city(2950159, "Berlin", "DE", 3426354, (52.52437, 13.41053)),
                city(1, "Vorona", "XX", 90000000, (0.0, 0.0)),
            ],
            vec![
                city_tr(472045, "ru", "Воронеж"),
                city_tr(524901, "ru", "Москва"),
                city_tr(524901, "en", "Moscow City"),
                city_tr(2950159, "de", "Berlin"),
                city_tr(404, "ru", "Нигде"),
            ],
            vec![
                CountryTranslation {
                    country_code: "RU".to_owned(),
                    lang: "ru".to_owned(),
                    name: "Россия".to_owned(),
                },
                CountryTranslation {
                    country_code: "DE".to_owned(),
                    lang: "de".to_owned(),
                    name: "Deutschland".to_owned(),
                },
            ],
        )
    }

    #[test]
    fn localized_names() {
        let catalog = catalog();

        assert_eq!(catalog.city_name(472045, "ru"), Some("Воронеж"));
        // no french name, no english name
        assert_eq!(catalog.city_name(472045, "fr"), Some("Voronezh"));
        // no french name, english one exists
        assert_eq!(catalog.city_name(524901, "fr"), Some("Moscow City"));
        assert_eq!(catalog.city_name(404, "ru"), None);

        assert_eq!(catalog.country_name("RU", "ru"), Some("Россия"));
        assert_eq!(catalog.country_name("RU", "de"), Some("Russia"));
        assert_eq!(catalog.country_name("XX", "ru"), None);
    }

    #[test]
    fn languages() {
        assert_eq!(catalog().languages(), vec!["de", "en", "ru"]);
    }

    #[test]
    fn suggest() {
        let catalog = catalog();

        let items = catalog.suggest("вОрОн", "ru", 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Воронеж");
        assert_eq!(items[0].country, "Россия");
        assert_eq!(items[0].country_code, "RU");

        // default name match, localized by english fallback, unknown country skipped
        let items = catalog.suggest("vor", "", 0).unwrap();
        assert_eq!(items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![472045]);
        assert_eq!(items[0].name, "Voronezh");
        assert_eq!(items[0].country, "Russia");

        let items = catalog.suggest("o", "en", 10);
        assert!(matches!(items, Err(Error::QueryTooShort { min: 2 })));
        let items = catalog.suggest("er", "de", 10).unwrap();
        assert_eq!(items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2950159]);
        let items = catalog.suggest("os", "", 10).unwrap();
        assert_eq!(items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![524901]);
        let items = catalog.suggest("о", "ru", 10);
        assert!(items.is_err());

        let items = catalog.suggest("ro", "ru", 1).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn population_order() {
        let catalog = Catalog::new(
            vec![Country {
                code: "RU".to_owned(),
                name: "Russia".to_owned(),
                geonameid: 2017370,
            }],
            vec![
                city(1, "Anna", "RU", 10, (0.0, 0.0)),
                city(2, "Bolshaya Anna", "RU", 30, (0.0, 0.0)),
                city(3, "Malaya Anna", "RU", 20, (0.0, 0.0)),
                city(4, "Novaya Anna", "RU", 20, (0.0, 0.0)),
            ],
            vec![city_tr(1, "ru", "Анна")],
            Vec::new(),
        );

        let items = catalog.suggest("anna", "en", 10).unwrap();
        assert_eq!(
            items.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![2, 3, 4, 1]
        );

        let items = catalog.suggest("ANNA", "en", 2).unwrap();
        assert_eq!(items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);

        // translated names are searched too, but each city once
        let items = catalog.suggest("анна", "ru", 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Анна");
    }

    #[test]
    fn details() {
        let catalog = catalog();
        let item = catalog.city(2950159, "de").unwrap();
        assert_eq!(item.name, "Berlin");
        assert_eq!(item.country, "Deutschland");
        assert_eq!(item.population, 3426354);
        assert_eq!(item.timezone, Some("Europe/Moscow"));

        // unknown country falls back to its code
        assert_eq!(catalog.city(1, "en").unwrap().country, "XX");
        assert!(catalog.city(404, "en").is_none());
    }

    #[test]
    fn nearest_localized() {
        let catalog = catalog();
        let item = catalog.nearest((51.6372, 39.1937), "ru").unwrap();
        assert_eq!(item.city.id, 472045);
        assert_eq!(item.city.name, "Воронеж");
        assert_eq!(item.city.country, "Россия");
        assert_eq!(item.request_coordinates.lat, 51.6372);
        assert!(item.distance_km < 10.0);

        let item = catalog.nearest((51.6372, 39.1937), "").unwrap();
        assert_eq!(item.city.name, "Voronezh");
    }
}
