use anyhow::Result;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

#[cfg(feature = "tracing")]
use std::time::Instant;

use serde::de::DeserializeOwned;

use geocity_core::{
    BatchSink, Catalog, City, CityTranslation, CountryTranslation, IdentifierIndex, JsonLinesSink,
    NamesReport, Parser, ParserSettings,
};

pub const COUNTRIES_FILENAME: &str = "countries.jsonl";
pub const CITIES_FILENAME: &str = "cities.jsonl";
pub const CITY_TRANSLATIONS_FILENAME: &str = "city_translations.jsonl";
pub const COUNTRY_TRANSLATIONS_FILENAME: &str = "country_translations.jsonl";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub countries: usize,
    pub cities: usize,
    pub names: NamesReport,
}

fn create(path: &Path) -> Result<JsonLinesSink<BufWriter<File>>> {
    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("On create {}: {e}", path.display()))?;
    Ok(JsonLinesSink::new(BufWriter::new(file)))
}

fn write_chunks<T: serde::Serialize>(path: &Path, records: &[T], batch_size: usize) -> Result<()> {
    let mut sink = create(path)?;
    for chunk in records.chunks(batch_size) {
        sink.accept(chunk)
            .map_err(|e| anyhow::anyhow!("On write {}: {e}", path.display()))?;
    }
    sink.finish()?;
    Ok(())
}

/// Parse the dumps from `settings.source_dir` and write every table as JSON
/// lines into `output_dir`.
pub fn run(settings: &ParserSettings, output_dir: &Path) -> Result<SeedReport> {
    #[cfg(feature = "tracing")]
    let now = Instant::now();

    std::fs::create_dir_all(output_dir)?;

    let parser = Parser::new(settings.clone());
    let batch_size = settings.effective_batch_size();

    let countries = parser
        .parse_countries()
        .map_err(|e| anyhow::anyhow!("Failed to parse countries: {e}"))?;
    write_chunks(&output_dir.join(COUNTRIES_FILENAME), &countries, batch_size)?;

    let cities = parser
        .parse_cities()
        .map_err(|e| anyhow::anyhow!("Failed to parse cities: {e}"))?;
    write_chunks(&output_dir.join(CITIES_FILENAME), &cities, batch_size)?;

    let index = IdentifierIndex::new(&countries, &cities);

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Index ready: {} cities, {} countries",
        index.cities_len(),
        index.countries_len()
    );

    let mut city_sink = create(&output_dir.join(CITY_TRANSLATIONS_FILENAME))?;
    let mut country_sink = create(&output_dir.join(COUNTRY_TRANSLATIONS_FILENAME))?;

    let names = parser
        .process_alternate_names(
            &index,
            &mut city_sink as &mut dyn BatchSink<CityTranslation>,
            Some(&mut country_sink as &mut dyn BatchSink<CountryTranslation>),
        )
        .map_err(|e| anyhow::anyhow!("Failed to process alternate names: {e}"))?;

    city_sink.finish()?;
    country_sink.finish()?;

    #[cfg(feature = "tracing")]
    tracing::info!("Seed done. took {}ms", now.elapsed().as_millis());

    Ok(SeedReport {
        countries: countries.len(),
        cities: cities.len(),
        names,
    })
}

/// Read records written by a [`JsonLinesSink`], blank lines are ignored
pub fn load_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| anyhow::anyhow!("On open {}: {e}", path.display()))?;

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("On read {}:{}: {e}", path.display(), number + 1))?;
        records.push(record);
    }

    Ok(records)
}

/// Read back `cities.jsonl` written by [`run`]
pub fn load_cities(path: &Path) -> Result<Vec<City>> {
    load_json_lines(path)
}

/// Load every table written by [`run`] from `dir`
pub fn load_catalog(dir: &Path) -> Result<Catalog> {
    #[cfg(feature = "tracing")]
    let now = Instant::now();

    let catalog = Catalog::new(
        load_json_lines(&dir.join(COUNTRIES_FILENAME))?,
        load_json_lines(&dir.join(CITIES_FILENAME))?,
        load_json_lines(&dir.join(CITY_TRANSLATIONS_FILENAME))?,
        load_json_lines(&dir.join(COUNTRY_TRANSLATIONS_FILENAME))?,
    );

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Catalog loaded from {}. took {}ms",
        dir.display(),
        now.elapsed().as_millis()
    );

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("geocity-seed-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test_log::test]
    fn seed_fixtures() -> Result<()> {
        let output = temp_dir("fixtures");
        let settings = ParserSettings {
            source_dir: PathBuf::from("../geocity-core/tests/misc"),
            batch_size: 4,
            allowed_languages: vec!["en".to_owned(), "ru".to_owned()],
            ..Default::default()
        };

        let report = run(&settings, &output)?;
        assert_eq!(report.countries, 5);
        assert_eq!(report.cities, 8);
        assert_eq!(report.names.city_translations, 8);
        assert_eq!(report.names.city_batches, 2);
        assert_eq!(report.names.country_translations, 5);
        assert_eq!(report.names.country_batches, 2);

        assert_eq!(lines(&output.join(COUNTRIES_FILENAME)).len(), 5);
        assert_eq!(
            lines(&output.join(COUNTRIES_FILENAME))[0],
            r#"{"code":"DE","name":"Germany"}"#
        );
        assert_eq!(lines(&output.join(CITY_TRANSLATIONS_FILENAME)).len(), 8);
        assert_eq!(lines(&output.join(COUNTRY_TRANSLATIONS_FILENAME)).len(), 5);

        let cities = load_cities(&output.join(CITIES_FILENAME))?;
        assert_eq!(cities.len(), 8);
        let item = geocity_core::nearest(&cities, (51.6372, 39.1937))
            .ok_or_else(|| anyhow::anyhow!("no cities"))?;
        assert_eq!(item.city.name, "Voronezh");

        let catalog = load_catalog(&output)?;
        assert_eq!(catalog.languages(), vec!["en", "ru"]);

        let item = catalog
            .nearest((51.6372, 39.1937), "ru")
            .ok_or_else(|| anyhow::anyhow!("no cities"))?;
        assert_eq!(item.city.name, "Воронеж");
        assert_eq!(item.city.country, "Россия");

        let items = catalog.suggest("моск", "en", 10)?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Moscow");
        assert_eq!(items[0].country, "Russia");

        // no translation in german, english fallback
        let item = catalog
            .city(2643743, "de")
            .ok_or_else(|| anyhow::anyhow!("no London"))?;
        assert_eq!(item.name, "London");
        assert_eq!(item.country, "United Kingdom");
        assert_eq!(item.elevation, Some(25));
        Ok(())
    }

    #[test_log::test]
    fn missing_sources() {
        let output = temp_dir("missing");
        let settings = ParserSettings {
            source_dir: output.join("nowhere"),
            ..Default::default()
        };
        let err = run(&settings, &output).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse countries"));
    }

    #[test]
    fn broken_cities_file() -> Result<()> {
        let dir = temp_dir("broken");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(CITIES_FILENAME);
        std::fs::write(&path, "\n{\"id\":1}\n")?;
        let err = load_cities(&path).unwrap_err();
        assert!(err.to_string().contains(":2:"));
        Ok(())
    }
}
