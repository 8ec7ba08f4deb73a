use std::io::Read;

use crate::error::{Error, Result};

/// Forward only reader over tab separated rows.
///
/// GeoNames dumps are not quoted, so quotes are plain characters. Rows may
/// have any number of fields; rows with invalid UTF-8 are skipped. A bare
/// `\r` inside a row is data.
pub struct Rows<R: Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
    name: String,
}

impl<R: Read> Rows<R> {
    /// `comments` skips lines starting with `#`
    pub fn new(reader: R, name: &str, comments: bool) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .comment(if comments { Some(b'#') } else { None })
            .from_reader(reader);

        Self {
            reader,
            record: csv::StringRecord::new(),
            name: name.to_owned(),
        }
    }

    /// Next row split into fields, `None` at the end of the stream
    pub fn next_row(&mut self) -> Result<Option<Vec<&str>>> {
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(true) => {
                    if self.record.len() == 1 && matches!(self.record.get(0), Some("" | "\r")) {
                        continue;
                    }
                    let mut fields: Vec<&str> = self.record.iter().collect();
                    // rows end at `\n` only, a `\r` before it belongs to no field
                    if let Some(last) = fields.last_mut() {
                        let value: &str = *last;
                        *last = value.strip_suffix('\r').unwrap_or(value);
                    }
                    return Ok(Some(fields));
                }
                Ok(false) => return Ok(None),
                Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Skip row of {}: {e}", self.name);
                    continue;
                }
                Err(source) => {
                    return Err(Error::Read {
                        name: self.name.clone(),
                        source,
                    })
                }
            }
        }
    }
}
