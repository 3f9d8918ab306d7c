use crate::error::{LoaderError, LoaderResult};
use crate::mapper::Header;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Delimited input file with a validated header.
///
/// Opening the file reads it once to validate the header and count data
/// rows, so malformed input fails before anything reaches the store.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    header: Header,
    total_rows: usize,
}

impl CsvSource {
    pub fn open(path: impl AsRef<Path>, delimiter: u8) -> LoaderResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| LoaderError::io(path.display().to_string(), e))?;
        let mut reader = reader_builder(delimiter).from_reader(file);

        let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let header = Header::parse(names)?;

        let mut total_rows = 0;
        for record in reader.records() {
            record?;
            total_rows += 1;
        }
        log::debug!(
            "{}: {} columns, {} rows",
            path.display(),
            header.len(),
            total_rows
        );

        Ok(Self {
            path,
            delimiter,
            header,
            total_rows,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Streams the data rows from the start of the file.
    pub fn rows(
        &self,
    ) -> LoaderResult<impl Iterator<Item = Result<Vec<String>, csv::Error>> + Send + use<>> {
        let file = File::open(&self.path)
            .map_err(|e| LoaderError::io(self.path.display().to_string(), e))?;
        let reader = reader_builder(self.delimiter).from_reader(file);
        Ok(reader
            .into_records()
            .map(|record| record.map(|cells| cells.iter().map(str::to_string).collect())))
    }
}

fn reader_builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .quote(b'"')
        .has_headers(true)
        .flexible(false);
    builder
}
