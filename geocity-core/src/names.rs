use std::collections::HashMap;
use std::hash::Hash;
use std::io::Read;

#[cfg(feature = "tracing")]
use std::time::Instant;

use crate::error::{Error, Result, SinkKind};
use crate::index::IdentifierIndex;
use crate::records::{CityTranslation, CountryTranslation};
use crate::sink::BatchSink;
use crate::tsv;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

// The table 'alternate names' :
// -----------------------------
// alternateNameId   : the id of this alternate name, int
// geonameid         : geonameId referring to id in table 'geoname', int
// isolanguage       : iso 639 language code 2- or 3-characters; 4-characters 'post' for postal codes and 'iata','icao' and faac for airport codes, fr_1793 for French Revolution names,  abbr for abbreviation, link to a website (mostly to wikipedia), wkdt for the wikidataid, varchar(7)
// alternate name    : alternate name or name variant, varchar(400)
// isPreferredName   : '1', if this alternate name is an official/preferred name
// isShortName       : '1', if this is a short name like 'California' for 'State of California'
// isColloquial      : '1', if this alternate name is a colloquial or slang term. Example: 'Big Apple' for 'New York'.
// isHistoric        : '1', if this alternate name is historic and was used in the past. Example 'Bombay' for 'Mumbai'.
// from		  : from period when the name was used
// to		  : to period when the name was used
const GEONAMEID: usize = 1;
const ISOLANGUAGE: usize = 2;
const ALTERNATE_NAME: usize = 3;
const IS_PREFERRED_NAME: usize = 4;
const IS_COLLOQUIAL: usize = 6;
const IS_HISTORIC: usize = 7;

const MIN_FIELDS: usize = 4;

/// isolanguage values which are codes or links, not languages
pub const TECHNICAL_LANGUAGES: [&str; 8] = [
    "link", "post", "iata", "icao", "faac", "fr_1793", "abbr", "wkdt",
];

/// Accepted alternate name row
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AlternateName<'a> {
    geonameid: u32,
    /// language truncated to 2 characters
    lang: &'a str,
    name: &'a str,
    is_preferred: bool,
}

/// Languages to keep. Empty means all of them.
#[derive(Debug, Clone, Default)]
pub struct LanguageFilter {
    allowed: Vec<String>,
}

impl LanguageFilter {
    pub fn new<T: AsRef<str>>(allowed: &[T]) -> Self {
        Self {
            allowed: allowed.iter().map(|l| l.as_ref().to_owned()).collect(),
        }
    }

    pub fn allows(&self, lang: &str) -> bool {
        self.allowed.is_empty() || self.allowed.iter().any(|l| l == lang)
    }
}

fn flag(fields: &[&str], at: usize) -> bool {
    fields.get(at).is_some_and(|v| *v == "1")
}

fn truncate_language(lang: &str) -> &str {
    match lang.char_indices().nth(2) {
        Some((end, _)) => &lang[..end],
        None => lang,
    }
}

/// Apply the row filters in order, the first failing one rejects the row.
pub(crate) fn accept_row<'a>(
    fields: &[&'a str],
    filter: &LanguageFilter,
) -> Option<AlternateName<'a>> {
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let geonameid = fields[GEONAMEID].parse::<u32>().ok()?;

    let lang = fields[ISOLANGUAGE];
    let name = fields[ALTERNATE_NAME];
    if lang.is_empty() || name.is_empty() {
        return None;
    }

    if flag(fields, IS_COLLOQUIAL) || flag(fields, IS_HISTORIC) {
        return None;
    }

    if TECHNICAL_LANGUAGES.contains(&lang) {
        return None;
    }

    let lang = truncate_language(lang);
    if !filter.allows(lang) {
        return None;
    }

    Some(AlternateName {
        geonameid,
        lang,
        name,
        is_preferred: flag(fields, IS_PREFERRED_NAME),
    })
}

/// One batch worth of records with its dedup table.
///
/// Records keep insertion order; `positions` maps a dedup key to the record
/// slot. Both are cleared together on flush.
pub(crate) struct BatchWindow<K, T> {
    records: Vec<T>,
    positions: HashMap<K, usize>,
    capacity: usize,
}

impl<K: Hash + Eq, T> BatchWindow<K, T> {
    fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// First occurrence of a key is stored. A later one replaces it only when
    /// preferred.
    fn upsert<F: FnOnce() -> T>(&mut self, key: K, is_preferred: bool, record: F) {
        match self.positions.get(&key) {
            Some(&position) => {
                if is_preferred {
                    self.records[position] = record();
                }
            }
            None => {
                self.positions.insert(key, self.records.len());
                self.records.push(record());
            }
        }
    }

    fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand the records to `sink` and start a new window
    fn flush<S>(&mut self, sink: &mut S) -> crate::sink::SinkResult
    where
        S: BatchSink<T> + ?Sized,
    {
        let result = sink.accept(&self.records);
        self.records.clear();
        self.positions.clear();
        result
    }
}

/// Counters of one alternate names pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NamesReport {
    pub rows: u64,
    pub city_translations: u64,
    pub country_translations: u64,
    pub city_batches: u64,
    pub country_batches: u64,
}

/// Streaming classifier for the alternate names extract.
///
/// Holds at most one city window and one country window at a time.
pub struct NamesProcessor<'a> {
    index: &'a IdentifierIndex,
    filter: &'a LanguageFilter,
    batch_size: usize,
}

impl<'a> NamesProcessor<'a> {
    /// `batch_size == 0` falls back to [`DEFAULT_BATCH_SIZE`]
    pub fn new(index: &'a IdentifierIndex, filter: &'a LanguageFilter, batch_size: usize) -> Self {
        Self {
            index,
            filter,
            batch_size: if batch_size == 0 {
                DEFAULT_BATCH_SIZE
            } else {
                batch_size
            },
        }
    }

    pub fn process<R: Read>(
        &self,
        reader: R,
        source_name: &str,
        city_sink: &mut dyn BatchSink<CityTranslation>,
        mut country_sink: Option<&mut dyn BatchSink<CountryTranslation>>,
    ) -> Result<NamesReport> {
        #[cfg(feature = "tracing")]
        let now = Instant::now();

        let mut report = NamesReport::default();
        let mut cities: BatchWindow<(u32, String), CityTranslation> =
            BatchWindow::new(self.batch_size);
        let mut countries: BatchWindow<(String, String), CountryTranslation> =
            BatchWindow::new(self.batch_size);

        let mut rows = tsv::Rows::new(reader, source_name, false);
        while let Some(fields) = rows.next_row()? {
            report.rows += 1;

            let Some(item) = accept_row(&fields, self.filter) else {
                continue;
            };

            if self.index.contains_city(item.geonameid) {
                cities.upsert(
                    (item.geonameid, item.lang.to_owned()),
                    item.is_preferred,
                    || CityTranslation {
                        city_id: item.geonameid,
                        lang: item.lang.to_owned(),
                        name: item.name.to_owned(),
                    },
                );

                if cities.is_full() {
                    flush_cities(&mut cities, city_sink, &mut report)?;
                }
            }

            if let Some(sink) = country_sink.as_deref_mut() {
                if let Some(code) = self.index.resolve_country(item.geonameid) {
                    countries.upsert(
                        (code.to_owned(), item.lang.to_owned()),
                        item.is_preferred,
                        || CountryTranslation {
                            country_code: code.to_owned(),
                            lang: item.lang.to_owned(),
                            name: item.name.to_owned(),
                        },
                    );

                    if countries.is_full() {
                        flush_countries(&mut countries, sink, &mut report)?;
                    }
                }
            }
        }

        if !cities.is_empty() {
            flush_cities(&mut cities, city_sink, &mut report)?;
        }

        if let Some(sink) = country_sink {
            if !countries.is_empty() {
                flush_countries(&mut countries, sink, &mut report)?;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Processed {} alternate names rows (city translations {}, country translations {}). took {}ms",
            report.rows,
            report.city_translations,
            report.country_translations,
            now.elapsed().as_millis(),
        );

        Ok(report)
    }
}

fn flush_cities(
    window: &mut BatchWindow<(u32, String), CityTranslation>,
    sink: &mut dyn BatchSink<CityTranslation>,
    report: &mut NamesReport,
) -> Result<()> {
    let len = window.len() as u64;

    #[cfg(feature = "tracing")]
    tracing::debug!("Flush {len} city translations");

    window.flush(sink).map_err(|source| Error::Sink {
        kind: SinkKind::City,
        source,
    })?;
    report.city_translations += len;
    report.city_batches += 1;
    Ok(())
}

fn flush_countries(
    window: &mut BatchWindow<(String, String), CountryTranslation>,
    sink: &mut dyn BatchSink<CountryTranslation>,
    report: &mut NamesReport,
) -> Result<()> {
    let len = window.len() as u64;

    #[cfg(feature = "tracing")]
    tracing::debug!("Flush {len} country translations");

    window.flush(sink).map_err(|source| Error::Sink {
        kind: SinkKind::Country,
        source,
    })?;
    report.country_translations += len;
    report.country_batches += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line: &str) -> Vec<&str> {
        line.split('\t').collect()
    }

    #[test]
    fn rejects_in_order() {
        let all = LanguageFilter::default();

        assert_eq!(accept_row(&row("1\t100\ten"), &all), None);
        assert_eq!(accept_row(&row("1\tabc\ten\tLondon"), &all), None);
        assert_eq!(accept_row(&row("1\t-5\ten\tLondon"), &all), None);
        assert_eq!(accept_row(&row("1\t100\t\tLondon"), &all), None);
        assert_eq!(accept_row(&row("1\t100\ten\t"), &all), None);
        assert_eq!(accept_row(&row("1\t100\ten\tBig Smoke\t0\t0\t1\t0"), &all), None);
        assert_eq!(accept_row(&row("1\t100\ten\tLondinium\t1\t0\t0\t1"), &all), None);
        for lang in TECHNICAL_LANGUAGES {
            let line = format!("1\t100\t{lang}\tEGLL\t1");
            assert_eq!(accept_row(&row(&line), &all), None, "{lang}");
        }
    }

    #[test]
    fn minimal_row() {
        let item = accept_row(&row("1\t100\ten\tLondon"), &LanguageFilter::default());
        assert_eq!(
            item,
            Some(AlternateName {
                geonameid: 100,
                lang: "en",
                name: "London",
                is_preferred: false,
            })
        );
    }

    #[test]
    fn language_truncation() {
        let all = LanguageFilter::default();
        let item = accept_row(&row("1\t100\tzh-CN\t伦敦\t1"), &all).unwrap();
        assert_eq!(item.lang, "zh");
        assert!(item.is_preferred);

        let item = accept_row(&row("1\t100\tfra\tLondres"), &all).unwrap();
        assert_eq!(item.lang, "fr");

        // truncation happens after the technical tag check
        let item = accept_row(&row("1\t100\tfr_1792\tLondres"), &all).unwrap();
        assert_eq!(item.lang, "fr");

        let item = accept_row(&row("1\t100\tß\tx"), &all).unwrap();
        assert_eq!(item.lang, "ß");
    }

    #[test]
    fn language_filter() {
        let filter = LanguageFilter::new(&["en", "ru"]);
        assert!(accept_row(&row("1\t100\ten-GB\tLondon"), &filter).is_some());
        assert!(accept_row(&row("1\t100\tru\tЛондон"), &filter).is_some());
        assert!(accept_row(&row("1\t100\tfr\tLondres"), &filter).is_none());

        let all = LanguageFilter::new::<&str>(&[]);
        assert!(all.allows("xx"));
    }

    #[test]
    fn window_dedup() {
        let mut window: BatchWindow<u32, &str> = BatchWindow::new(10);

        window.upsert(1, false, || "first");
        window.upsert(1, true, || "preferred");
        window.upsert(1, false, || "ignored");
        window.upsert(2, true, || "preferred");
        window.upsert(2, false, || "ignored");
        window.upsert(2, true, || "later preferred");

        assert_eq!(window.records, vec!["preferred", "later preferred"]);
    }

    #[test]
    fn window_flush_resets() {
        let mut window: BatchWindow<u32, u32> = BatchWindow::new(2);
        window.upsert(1, false, || 1);
        assert!(!window.is_full());
        window.upsert(2, false, || 2);
        assert!(window.is_full());

        let mut seen = Vec::new();
        let mut sink = |batch: &[u32]| -> crate::sink::SinkResult {
            seen.push(batch.to_vec());
            Ok(())
        };
        window.flush(&mut sink).unwrap();
        assert!(window.is_empty());

        // key table is gone together with the records
        window.upsert(1, false, || 10);
        assert_eq!(window.records, vec![10]);
        assert_eq!(seen, vec![vec![1, 2]]);
    }
}
