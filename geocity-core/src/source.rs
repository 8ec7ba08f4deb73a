use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{Error, Result};

/// Conventional location of one extract inside the source directory.
pub struct SourceSpec {
    /// human readable name for errors and logs
    pub name: &'static str,
    /// zip container checked first
    pub archive: Option<&'static str>,
    /// plain text fallback
    pub plain: &'static str,
    /// entry names inside the container, most preferred first;
    /// any `.txt` entry is used when none of them matches
    pub entries: &'static [&'static str],
}

pub const COUNTRIES: SourceSpec = SourceSpec {
    name: "countryInfo",
    archive: None,
    plain: "countryInfo.txt",
    entries: &[],
};

pub const CITIES: SourceSpec = SourceSpec {
    name: "cities",
    archive: Some("cities1000.zip"),
    plain: "cities1000.txt",
    entries: &["cities1000.txt"],
};

pub const ALTERNATE_NAMES: SourceSpec = SourceSpec {
    name: "alternateNames",
    archive: Some("alternateNames.zip"),
    plain: "alternateNames.txt",
    entries: &["alternateNames.txt", "alternateNamesV2.txt"],
};

const TEXT_EXTENSION: &str = ".txt";

/// Resolved extract: either an entry of a zip container or a plain file.
///
/// Resolution happens once, before any row is read, so the row scanners only
/// ever see a `Read`.
pub enum Source {
    Archive {
        path: PathBuf,
        archive: ZipArchive<BufReader<File>>,
        entry: usize,
        entry_name: String,
    },
    Plain {
        path: PathBuf,
    },
}

impl Source {
    pub fn resolve(dir: &Path, spec: &SourceSpec) -> Result<Self> {
        if let Some(archive_name) = spec.archive {
            let path = dir.join(archive_name);
            if path.is_file() {
                return Self::from_archive(path, spec.entries);
            }
        }

        let path = dir.join(spec.plain);
        if !path.is_file() {
            return Err(Error::SourceNotFound {
                name: spec.name,
                archive: dir.join(spec.archive.unwrap_or(spec.plain)),
                plain: path,
            });
        }

        Ok(Source::Plain { path })
    }

    pub fn from_archive(path: PathBuf, preferred: &[&'static str]) -> Result<Self> {
        let file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|source| Error::Archive {
                path: path.clone(),
                source,
            })?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(|source| Error::Archive {
                path: path.clone(),
                source,
            })?;
            names.push(entry.name().to_owned());
        }

        let entry = select_entry(&names, preferred).ok_or_else(|| Error::MissingEntry {
            path: path.clone(),
            expected: if preferred.is_empty() {
                TEXT_EXTENSION
            } else {
                preferred[0]
            },
        })?;

        Ok(Source::Archive {
            path,
            archive,
            entry,
            entry_name: names.swap_remove(entry),
        })
    }

    /// Open a fresh stream over the extract
    pub fn open(&mut self) -> Result<Box<dyn Read + '_>> {
        match self {
            Source::Archive {
                path,
                archive,
                entry,
                ..
            } => {
                let file = archive.by_index(*entry).map_err(|source| Error::Archive {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(file))
            }
            Source::Plain { path } => {
                let file = File::open(path.as_path()).map_err(|source| Error::Open {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(file))
            }
        }
    }

    /// `archive.zip:entry.txt` or `file.txt`
    pub fn name(&self) -> String {
        match self {
            Source::Archive {
                path, entry_name, ..
            } => format!("{}:{}", path.display(), entry_name),
            Source::Plain { path } => path.display().to_string(),
        }
    }
}

/// Preferred names in order (matched as suffix, entries may live in folders),
/// then the first text entry.
fn select_entry(names: &[String], preferred: &[&str]) -> Option<usize> {
    preferred
        .iter()
        .find_map(|wanted| names.iter().position(|name| name.ends_with(wanted)))
        .or_else(|| names.iter().position(|name| name.ends_with(TEXT_EXTENSION)))
}
