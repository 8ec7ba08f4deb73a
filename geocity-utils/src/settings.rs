use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use geocity_core::ParserSettings;
use serde::Deserialize;

const CONFIG_PREFIX: &str = "SEEDER";
const CONFIG_FILE_PATH: &str = "./seeder.toml";
const CONFIG_FILE_ENV_PATH_KEY: &str = "GEOCITY_SEEDER_CONFIG_FILE";

/// Languages are a list in config files and a comma separated string in env
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Languages {
    Joined(String),
    List(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    source_dir: Option<PathBuf>,
    batch_size: Option<i64>,
    min_population: Option<u64>,
    allowed_languages: Option<Languages>,
}

/// Load seeder settings from `./seeder.toml`, the file named by
/// `GEOCITY_SEEDER_CONFIG_FILE` and `SEEDER_*` environment variables,
/// later sources win.
pub fn load() -> Result<ParserSettings, ConfigError> {
    let mut builder =
        Config::builder().add_source(File::with_name(CONFIG_FILE_PATH).required(false));

    if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV_PATH_KEY) {
        #[cfg(feature = "tracing")]
        tracing::info!("Try read config from: {config_path}");
        builder = builder.add_source(File::with_name(&config_path));
    }

    builder = builder.add_source(Environment::with_prefix(CONFIG_PREFIX));

    from_config(builder.build()?)
}

/// Settings from an assembled config, missing keys keep their defaults
pub fn from_config(config: Config) -> Result<ParserSettings, ConfigError> {
    let raw: RawSettings = config.try_deserialize()?;
    let mut settings = ParserSettings::default();

    if let Some(source_dir) = raw.source_dir {
        settings.source_dir = source_dir;
    }
    if let Some(batch_size) = raw.batch_size {
        settings.batch_size = batch_size;
    }
    if let Some(min_population) = raw.min_population {
        settings.min_population = min_population;
    }
    settings.allowed_languages = match raw.allowed_languages {
        Some(Languages::Joined(value)) => parse_languages(&value),
        Some(Languages::List(values)) => clean_languages(values),
        None => Vec::new(),
    };

    Ok(settings)
}

/// Split `en, ru,,de` into `["en", "ru", "de"]`
pub fn parse_languages(value: &str) -> Vec<String> {
    clean_languages(value.split(','))
}

fn clean_languages<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|lang| lang.as_ref().trim().to_owned())
        .filter(|lang| !lang.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn env(vars: &[(&str, &str)]) -> Environment {
        Environment::with_prefix(CONFIG_PREFIX).source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn defaults() -> Result<(), ConfigError> {
        let settings = from_config(Config::builder().add_source(env(&[])).build()?)?;
        assert_eq!(settings, ParserSettings::default());
        assert_eq!(settings.source_dir, PathBuf::from("data"));
        assert_eq!(settings.batch_size, 10_000);
        assert_eq!(settings.min_population, 10_000);
        assert!(settings.allowed_languages.is_empty());
        Ok(())
    }

    #[test]
    fn environment() -> Result<(), ConfigError> {
        let config = Config::builder()
            .add_source(env(&[
                ("SEEDER_SOURCE_DIR", "/srv/geonames"),
                ("SEEDER_BATCH_SIZE", "500"),
                ("SEEDER_MIN_POPULATION", "1000"),
                ("SEEDER_ALLOWED_LANGUAGES", " en, ru,,de "),
            ]))
            .build()?;
        let settings = from_config(config)?;

        assert_eq!(settings.source_dir, PathBuf::from("/srv/geonames"));
        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.min_population, 1000);
        assert_eq!(settings.allowed_languages, vec!["en", "ru", "de"]);
        Ok(())
    }

    #[test]
    fn file_then_environment() -> Result<(), ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(
                r#"
                source_dir = "dumps"
                batch_size = -1
                allowed_languages = ["en", " "]
                "#,
                FileFormat::Toml,
            ))
            .add_source(env(&[("SEEDER_MIN_POPULATION", "0")]))
            .build()?;
        let settings = from_config(config)?;

        assert_eq!(settings.source_dir, PathBuf::from("dumps"));
        assert_eq!(settings.batch_size, -1);
        assert_eq!(settings.effective_batch_size(), 10_000);
        assert_eq!(settings.min_population, 0);
        assert_eq!(settings.allowed_languages, vec!["en"]);
        Ok(())
    }

    #[test]
    fn languages() {
        assert_eq!(parse_languages("en,ru"), vec!["en", "ru"]);
        assert!(parse_languages("").is_empty());
        assert!(parse_languages(" , ").is_empty());
    }
}
