use std::io::Read;
use std::path::PathBuf;

#[cfg(feature = "tracing")]
use std::time::Instant;

use crate::error::{Error, Result};
use crate::index::IdentifierIndex;
use crate::names::{LanguageFilter, NamesProcessor, NamesReport, DEFAULT_BATCH_SIZE};
use crate::records::{City, CityTranslation, Country, CountryTranslation};
use crate::sink::BatchSink;
use crate::source::{self, Source};
use crate::tsv;

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ParserSettings {
    /// directory with geonames dumps
    pub source_dir: PathBuf,
    /// translations per sink call, values <= 0 mean the default
    pub batch_size: i64,
    /// cities with less population are dropped
    pub min_population: u64,
    /// 2-letter language codes to keep, empty keeps all
    pub allowed_languages: Vec<String>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data"),
            batch_size: DEFAULT_BATCH_SIZE as i64,
            min_population: 10_000,
            allowed_languages: Vec::new(),
        }
    }
}

impl ParserSettings {
    pub fn effective_batch_size(&self) -> usize {
        if self.batch_size <= 0 {
            DEFAULT_BATCH_SIZE
        } else {
            usize::try_from(self.batch_size).unwrap_or(DEFAULT_BATCH_SIZE)
        }
    }
}

// countryInfo.txt columns
const COUNTRY_ISO: usize = 0;
const COUNTRY_NAME: usize = 4;
const COUNTRY_GEONAMEID: usize = 16;
const COUNTRY_MIN_FIELDS: usize = 17;

// geoname table columns
const CITY_GEONAMEID: usize = 0;
const CITY_NAME: usize = 1;
const CITY_LATITUDE: usize = 4;
const CITY_LONGITUDE: usize = 5;
const CITY_COUNTRY_CODE: usize = 8;
const CITY_POPULATION: usize = 14;
const CITY_ELEVATION: usize = 15;
const CITY_TIMEZONE: usize = 17;
const CITY_MIN_FIELDS: usize = 19;

/// Read countries from `countryInfo.txt` content
pub fn read_countries<R: Read>(reader: R, source_name: &str) -> Result<Vec<Country>> {
    let mut rows = tsv::Rows::new(reader, source_name, true);
    let mut countries = Vec::new();

    while let Some(fields) = rows.next_row()? {
        if let Some(country) = country_from_row(&fields) {
            countries.push(country);
        }
    }

    Ok(countries)
}

fn country_from_row(fields: &[&str]) -> Option<Country> {
    if fields.len() < COUNTRY_MIN_FIELDS {
        return None;
    }

    let code = fields[COUNTRY_ISO];
    let name = fields[COUNTRY_NAME];
    if code.is_empty() || name.is_empty() {
        return None;
    }

    Some(Country {
        code: code.to_owned(),
        name: name.to_owned(),
        geonameid: fields[COUNTRY_GEONAMEID].parse().unwrap_or(0),
    })
}

/// Read cities from a geoname table dump, dropping cities below `min_population`
pub fn read_cities<R: Read>(
    reader: R,
    source_name: &str,
    min_population: u64,
) -> Result<Vec<City>> {
    let mut rows = tsv::Rows::new(reader, source_name, false);
    let mut cities = Vec::new();

    while let Some(fields) = rows.next_row()? {
        if let Some(city) = city_from_row(&fields, min_population) {
            cities.push(city);
        }
    }

    Ok(cities)
}

fn city_from_row(fields: &[&str], min_population: u64) -> Option<City> {
    if fields.len() < CITY_MIN_FIELDS {
        return None;
    }

    let id = fields[CITY_GEONAMEID].parse::<u32>().ok()?;

    let population = fields[CITY_POPULATION].parse::<u64>().ok()?;
    if population < min_population {
        return None;
    }

    let latitude = fields[CITY_LATITUDE].parse::<f64>().ok()?;
    let longitude = fields[CITY_LONGITUDE].parse::<f64>().ok()?;
    // rejects nan and inf too
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    let elevation = match fields[CITY_ELEVATION] {
        "" => None,
        value => value.parse::<i32>().ok(),
    };

    let timezone = match fields[CITY_TIMEZONE] {
        "" => None,
        value => Some(value.to_owned()),
    };

    Some(City {
        id,
        country_code: fields[CITY_COUNTRY_CODE].to_owned(),
        name: fields[CITY_NAME].to_owned(),
        population,
        latitude,
        longitude,
        elevation,
        timezone,
    })
}

/// Parser over a directory of geonames dumps
pub struct Parser {
    settings: ParserSettings,
    filter: LanguageFilter,
}

impl Parser {
    pub fn new(settings: ParserSettings) -> Self {
        Self {
            filter: LanguageFilter::new(settings.allowed_languages.as_slice()),
            settings,
        }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Parse `countryInfo.txt`
    pub fn parse_countries(&self) -> Result<Vec<Country>> {
        #[cfg(feature = "tracing")]
        let now = Instant::now();

        let path = self.settings.source_dir.join(source::COUNTRIES.plain);
        let file = std::fs::File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        let countries = read_countries(file, &path.display().to_string())?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Read {} countries took {}ms",
            countries.len(),
            now.elapsed().as_millis(),
        );

        Ok(countries)
    }

    /// Parse `cities1000.zip` or `cities1000.txt`
    pub fn parse_cities(&self) -> Result<Vec<City>> {
        #[cfg(feature = "tracing")]
        let now = Instant::now();

        let mut source = Source::resolve(&self.settings.source_dir, &source::CITIES)?;
        let name = source.name();

        #[cfg(feature = "tracing")]
        tracing::info!("Read cities from {name}");

        let cities = read_cities(source.open()?, &name, self.settings.min_population)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Read {} cities (min population {}) took {}ms",
            cities.len(),
            self.settings.min_population,
            now.elapsed().as_millis(),
        );

        Ok(cities)
    }

    /// Stream `alternateNames.zip` or `alternateNames.txt` into the sinks.
    ///
    /// Country translations are only produced when `country_sink` is given.
    pub fn process_alternate_names(
        &self,
        index: &IdentifierIndex,
        city_sink: &mut dyn BatchSink<CityTranslation>,
        country_sink: Option<&mut dyn BatchSink<CountryTranslation>>,
    ) -> Result<NamesReport> {
        let mut source = Source::resolve(&self.settings.source_dir, &source::ALTERNATE_NAMES)?;
        let name = source.name();

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Read alternate names from {name} (batch size {})",
            self.settings.effective_batch_size()
        );

        let reader = source.open()?;
        self.names_processor(index)
            .process(reader, &name, city_sink, country_sink)
    }

    /// Processor with this parser's language filter and batch size
    pub fn names_processor<'a>(&'a self, index: &'a IdentifierIndex) -> NamesProcessor<'a> {
        NamesProcessor::new(index, &self.filter, self.settings.effective_batch_size())
    }
}
