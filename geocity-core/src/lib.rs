#![doc = include_str!("../README.md")]

pub mod catalog;
pub mod error;
pub mod index;
pub mod names;
pub mod parser;
pub mod records;
pub mod reverse;
pub mod sink;
pub mod source;
mod tsv;

pub use catalog::{Catalog, CityDetail, CityResult, Coordinates, NearestCity};
pub use error::{Error, Result, SinkKind};
pub use index::IdentifierIndex;
pub use names::{NamesProcessor, NamesReport, DEFAULT_BATCH_SIZE};
pub use parser::{read_cities, read_countries, Parser, ParserSettings};
pub use records::{City, CityTranslation, Country, CountryTranslation};
pub use reverse::{haversine_km, nearest, ReverseItem};
pub use sink::{BatchSink, JsonLinesSink, SinkError, SinkResult};
