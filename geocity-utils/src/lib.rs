#![doc = include_str!("../README.md")]
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use std::time::Instant;

pub mod seed;
pub mod settings;

/// File with the ETags of the last fetch, stored next to the dumps
pub const METADATA_FILENAME: &str = "sources.json";

#[derive(Serialize, Clone, Debug)]
pub struct SourceItem<'a> {
    /// key in [`SourcesMetadata::etag`]
    pub name: &'a str,
    pub url: &'a str,
    /// file name inside the source directory
    pub filename: &'a str,
}

#[derive(Serialize, Clone, Debug)]
pub struct SourceFetcherSettings<'a> {
    pub http_timeout_ms: u64,
    pub sources: Vec<SourceItem<'a>>,
}

impl Default for SourceFetcherSettings<'_> {
    fn default() -> Self {
        SourceFetcherSettings {
            http_timeout_ms: 600_000,
            sources: vec![
                SourceItem {
                    name: "countries",
                    url: "https://download.geonames.org/export/dump/countryInfo.txt",
                    filename: "countryInfo.txt",
                },
                SourceItem {
                    name: "cities",
                    url: "https://download.geonames.org/export/dump/cities1000.zip",
                    filename: "cities1000.zip",
                },
                SourceItem {
                    name: "alternate_names",
                    url: "https://download.geonames.org/export/dump/alternateNamesV2.zip",
                    filename: "alternateNames.zip",
                },
            ],
        }
    }
}

/// What was fetched and when
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct SourcesMetadata {
    /// unix timestamp of the fetch
    pub created: u64,
    /// source name -> url
    pub urls: HashMap<String, String>,
    /// source name -> ETag header
    pub etag: HashMap<String, String>,
}

impl SourcesMetadata {
    /// Read `sources.json` from `dir`, `None` when there is none yet
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(METADATA_FILENAME);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read(&path)?;
        let metadata = serde_json::from_slice(&content)
            .map_err(|e| anyhow::anyhow!("On read {}: {e}", path.display()))?;
        Ok(Some(metadata))
    }

    pub fn store(&self, dir: &Path) -> Result<()> {
        let path = dir.join(METADATA_FILENAME);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

/// Downloads geonames dumps into a source directory
pub struct SourceFetcher<'a> {
    http_client: reqwest::Client,
    settings: SourceFetcherSettings<'a>,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(settings: SourceFetcherSettings<'a>) -> Result<Self> {
        Ok(SourceFetcher {
            http_client: reqwest::ClientBuilder::new()
                .timeout(std::time::Duration::from_millis(settings.http_timeout_ms))
                .build()?,
            settings,
        })
    }

    pub fn settings(&self) -> &SourceFetcherSettings<'a> {
        &self.settings
    }

    /// True when any remote ETag differs from the recorded one
    pub async fn has_updates(&self, metadata: &SourcesMetadata) -> Result<bool> {
        #[cfg(feature = "tracing")]
        tracing::info!("Check updates");
        if metadata.etag.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::info!("No recorded source ETags");
            return Ok(true);
        }

        let requests = self
            .settings
            .sources
            .iter()
            .map(|item| self.get_etag(item.url));
        let responses = futures::future::join_all(requests).await;

        for (item, etag) in self.settings.sources.iter().zip(responses) {
            let current_etag = metadata
                .etag
                .get(item.name)
                .map(AsRef::as_ref)
                .unwrap_or("");
            let new_etag = etag?;
            if new_etag.is_empty() || current_etag != new_etag {
                #[cfg(feature = "tracing")]
                tracing::info!("New version of {}", item.name);
                return Ok(true);
            }
        }

        Ok(false)
    }

    pub async fn get_etag(&self, url: &str) -> Result<String> {
        #[cfg(feature = "tracing")]
        tracing::info!("Try HEAD {url}");
        let response = self.http_client.head(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("HEAD {url} return status {}", response.status())
        }

        Ok(etag_of(&response))
    }

    /// Download one source into `dir`, returns its ETag.
    ///
    /// The body goes to `<filename>.part` first and is renamed once complete.
    pub async fn download(&self, item: &SourceItem<'_>, dir: &Path) -> Result<String> {
        #[cfg(feature = "tracing")]
        tracing::info!("Try GET {}", item.url);
        #[cfg(feature = "tracing")]
        let now = Instant::now();

        let mut response = self.http_client.get(item.url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("GET {} return status {}", item.url, response.status())
        }

        let etag = etag_of(&response);
        let target = dir.join(item.filename);
        let partial = partial_path(&target);

        let mut file = std::io::BufWriter::new(std::fs::File::create(&partial)?);
        let mut size = 0;
        while let Some(chunk) = response.chunk().await? {
            size += chunk.len();
            file.write_all(&chunk)?;
        }
        file.flush()?;
        drop(file);
        std::fs::rename(&partial, &target)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Downloaded {} to {} size: {size}. took {}ms",
            item.url,
            target.display(),
            now.elapsed().as_millis()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = size;

        Ok(etag)
    }

    /// Download every source into `dir` and record `sources.json`
    pub async fn fetch_all(&self, dir: &Path) -> Result<SourcesMetadata> {
        std::fs::create_dir_all(dir)?;

        let requests = self
            .settings
            .sources
            .iter()
            .map(|item| self.download(item, dir));
        let responses = futures::future::join_all(requests).await;

        let mut metadata = SourcesMetadata {
            created: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)?
                .as_secs(),
            ..Default::default()
        };
        for (item, etag) in self.settings.sources.iter().zip(responses) {
            let etag = etag.map_err(|e| anyhow::anyhow!("On fetch {}: {e}", item.name))?;
            metadata.urls.insert(item.name.to_owned(), item.url.to_owned());
            metadata.etag.insert(item.name.to_owned(), etag);
        }

        metadata.store(dir)?;

        Ok(metadata)
    }
}

fn etag_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_default()
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("geocity-utils-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_sources() {
        let settings = SourceFetcherSettings::default();
        let names = settings
            .sources
            .iter()
            .map(|item| item.filename)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["countryInfo.txt", "cities1000.zip", "alternateNames.zip"]
        );
    }

    #[test]
    fn metadata_file() -> Result<()> {
        let dir = temp_dir("metadata");
        assert_eq!(SourcesMetadata::load(&dir)?, None);

        let metadata = SourcesMetadata {
            created: 1_700_000_000,
            urls: HashMap::from([("cities".to_owned(), "http://localhost/c.zip".to_owned())]),
            etag: HashMap::from([("cities".to_owned(), "\"abc\"".to_owned())]),
        };
        metadata.store(&dir)?;
        assert_eq!(SourcesMetadata::load(&dir)?, Some(metadata));

        std::fs::write(dir.join(METADATA_FILENAME), b"{")?;
        assert!(SourcesMetadata::load(&dir).is_err());
        Ok(())
    }

    #[test]
    fn partial_name() {
        assert_eq!(
            partial_path(Path::new("data/cities1000.zip")),
            PathBuf::from("data/cities1000.zip.part")
        );
    }

    #[test_log::test(tokio::test)]
    async fn updates_without_etags() -> Result<()> {
        let fetcher = SourceFetcher::new(SourceFetcherSettings::default())?;
        // nothing recorded, no request needed
        assert!(fetcher.has_updates(&SourcesMetadata::default()).await?);
        Ok(())
    }
}
