use std::io::Write;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;
pub type SinkResult = Result<(), SinkError>;

/// Consumer of bounded record batches (bulk loader, file writer, ...).
///
/// Called synchronously: a slow sink throttles the ingestion pass and an error
/// aborts it.
pub trait BatchSink<T> {
    /// Accept one batch. The slice is only valid for the duration of the call.
    fn accept(&mut self, batch: &[T]) -> SinkResult;
}

impl<T, F> BatchSink<T> for F
where
    F: FnMut(&[T]) -> SinkResult,
{
    fn accept(&mut self, batch: &[T]) -> SinkResult {
        self(batch)
    }
}

/// Writes every record as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W, T> BatchSink<T> for JsonLinesSink<W>
where
    W: Write,
    T: serde::Serialize,
{
    fn accept(&mut self, batch: &[T]) -> SinkResult {
        for record in batch {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.written += batch.len() as u64;

        #[cfg(feature = "tracing")]
        tracing::debug!("Wrote {} records (total {})", batch.len(), self.written);

        Ok(())
    }
}
