use crate::error::{LoaderError, LoaderResult};
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Delimited writer shared by every export worker. Each row is written
/// whole under the lock.
pub struct SharedWriter<W: Write> {
    inner: Mutex<csv::Writer<W>>,
}

impl SharedWriter<File> {
    pub fn create(path: impl AsRef<Path>, delimiter: u8) -> LoaderResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| LoaderError::io(path.display().to_string(), e))?;
        Ok(Self::from_writer(file, delimiter))
    }
}

impl<W: Write> SharedWriter<W> {
    pub fn from_writer(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote(b'"')
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(line_terminator())
            .from_writer(writer);
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub fn write_row<I, T>(&self, cells: I) -> LoaderResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.inner.lock().write_record(cells)?;
        Ok(())
    }

    pub fn flush(&self) -> LoaderResult<()> {
        self.inner
            .lock()
            .flush()
            .map_err(|e| LoaderError::io("export output", e))
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> LoaderResult<W> {
        self.inner
            .into_inner()
            .into_inner()
            .map_err(|e| LoaderError::io("export output", e.into_error()))
    }
}

#[cfg(windows)]
fn line_terminator() -> csv::Terminator {
    csv::Terminator::CRLF
}

#[cfg(not(windows))]
fn line_terminator() -> csv::Terminator {
    csv::Terminator::Any(b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_only_when_required() {
        let writer = SharedWriter::from_writer(Vec::new(), b',');
        writer.write_row(["plain", "a,b", "two\nlines", "say \"hi\""]).unwrap();

        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let expected = "plain,\"a,b\",\"two\nlines\",\"say \"\"hi\"\"\"";
        assert!(text.starts_with(expected), "unexpected output {text:?}");
    }

    #[test]
    fn test_rows_from_many_threads_stay_whole() {
        let writer = SharedWriter::from_writer(Vec::new(), b',');
        std::thread::scope(|scope| {
            for worker in 0..4 {
                let writer = &writer;
                scope.spawn(move || {
                    for row in 0..25 {
                        let key = format!("{worker}-{row}");
                        writer.write_row([key.as_str(), "Table", "x"]).unwrap();
                    }
                });
            }
        });

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 100);
        assert!(lines.iter().all(|line| line.ends_with(",Table,x")));
    }
}
