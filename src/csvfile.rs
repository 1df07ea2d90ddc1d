//! Delimited-text reader and writer, with transparent gzip support
//!
//! The header row is the field-name list. A path ending in `.gz` is wrapped
//! in a gzip filter on both sides, invisibly to every other layer; the read
//! side uses a multi-member decoder because append sessions add a fresh
//! gzip member to the file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::datafile::{DataFile, DataReader, DataWriter};
use crate::error::{DataSourceError, Result};
use crate::record::RowMap;
use crate::types::{ReadMode, Value, WriteMode};

fn is_gz(path: &str) -> bool {
    path.to_lowercase().ends_with(".gz")
}

/// CSV file reader.
///
/// The first record is the header and supplies the field names; every later
/// record becomes one row whose values are the raw decoded text tokens.
///
/// # Examples
///
/// ```no_run
/// use tabsource::{CsvReader, DataReader};
///
/// # fn main() -> tabsource::Result<()> {
/// let mut reader = CsvReader::open("data.csv")?;
/// for row in reader.rows() {
///     println!("{:?}", row?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CsvReader {
    file_name: Option<String>,
    field_names: Vec<String>,
    mode: ReadMode,
    encoding: &'static Encoding,
    records: csv::StringRecordsIntoIter<Box<dyn Read>>,
}

impl CsvReader {
    /// Open a CSV file (gzipped when the name ends in `.gz`) in
    /// [`ReadMode::Object`] with UTF-8 encoding
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ReadMode::default(), UTF_8)
    }

    /// Open a CSV file with an explicit read mode and text encoding
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        mode: ReadMode,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let file_name = path.as_ref().display().to_string();
        let file = File::open(path.as_ref())?;
        let raw: Box<dyn Read> = if is_gz(&file_name) {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let decoded: Box<dyn Read> = Box::new(
            DecodeReaderBytesBuilder::new()
                .encoding(Some(encoding))
                .build(raw),
        );
        Self::from_parts(Some(file_name), decoded, mode, encoding)
    }

    /// Read from a caller-supplied stream.
    ///
    /// No gzip or encoding wrapping is applied; the stream is consumed as
    /// UTF-8 CSV exactly as handed over.
    pub fn from_reader<R: Read + 'static>(input: R, mode: ReadMode) -> Result<Self> {
        Self::from_parts(None, Box::new(input), mode, UTF_8)
    }

    fn from_parts(
        file_name: Option<String>,
        input: Box<dyn Read>,
        mode: ReadMode,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(input);
        let field_names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        Ok(CsvReader {
            file_name,
            field_names,
            mode,
            encoding,
            records: reader.into_records(),
        })
    }

    /// The configured text encoding
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

impl DataFile for CsvReader {
    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// A read-only session never rewrites data; the stream is released on
    /// drop.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl DataReader for CsvReader {
    fn mode(&self) -> ReadMode {
        self.mode
    }

    fn read_row(&mut self) -> Result<RowMap> {
        match self.records.next() {
            None => Err(DataSourceError::EndOfData),
            Some(record) => {
                let record = record?;
                Ok(self
                    .field_names
                    .iter()
                    .cloned()
                    .zip(record.iter().map(|token| Value::Text(token.to_string())))
                    .collect())
            }
        }
    }
}

/// CSV file writer.
///
/// The field-name list is fixed at construction and written verbatim as the
/// header exactly once, only in [`WriteMode::Write`]. Append sessions
/// position at the end and write no header; when no field names are given
/// they are discovered from the existing header.
///
/// # Examples
///
/// ```no_run
/// use tabsource::{CsvWriter, DataFile, DataWriter, Value};
///
/// # fn main() -> tabsource::Result<()> {
/// let fields = vec!["id".to_string(), "name".to_string()];
/// let mut writer = CsvWriter::create("data.csv", fields)?;
/// writer.write_list(&[Value::Int(1), Value::Text("John".to_string())])?;
/// writer.close()?;
/// # Ok(())
/// # }
/// ```
pub struct CsvWriter {
    file_name: Option<String>,
    field_names: Vec<String>,
    encoding: &'static Encoding,
    writer: Option<csv::Writer<Box<dyn Write>>>,
}

impl std::fmt::Debug for CsvWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvWriter")
            .field("file_name", &self.file_name)
            .field("field_names", &self.field_names)
            .field("encoding", &self.encoding.name())
            .finish_non_exhaustive()
    }
}

impl CsvWriter {
    /// Create a CSV file (gzipped when the name ends in `.gz`), truncating
    /// any existing content and writing the header row immediately
    pub fn create<P: AsRef<Path>>(path: P, field_names: Vec<String>) -> Result<Self> {
        Self::new(path, Some(field_names), WriteMode::Write, UTF_8)
    }

    /// Open a CSV file for writing with explicit mode and text encoding.
    ///
    /// In [`WriteMode::Append`] with `field_names` of `None` the field
    /// names are read from the existing file's header.
    pub fn new<P: AsRef<Path>>(
        path: P,
        field_names: Option<Vec<String>>,
        mode: WriteMode,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let file_name = path.as_ref().display().to_string();
        let field_names = Self::resolve_fields(path.as_ref(), field_names, mode, encoding)?;

        let file = match mode {
            WriteMode::Write => File::create(path.as_ref())?,
            WriteMode::Append => OpenOptions::new()
                .append(true)
                .create(true)
                .open(path.as_ref())?,
        };
        let sink: Box<dyn Write> = if is_gz(&file_name) {
            Box::new(GzEncoder::new(file, Compression::default()))
        } else {
            Box::new(file)
        };
        Self::from_parts(Some(file_name), sink, field_names, mode, encoding)
    }

    /// Write to a caller-supplied stream.
    ///
    /// No gzip wrapping is applied. The header is written only in
    /// [`WriteMode::Write`].
    pub fn from_writer<W: Write + 'static>(
        sink: W,
        field_names: Vec<String>,
        mode: WriteMode,
    ) -> Result<Self> {
        if field_names.is_empty() {
            return Err(DataSourceError::MissingFieldNames(
                "a stream-bound CSV writer needs an explicit field-name list".to_string(),
            ));
        }
        Self::from_parts(None, Box::new(sink), field_names, mode, UTF_8)
    }

    fn resolve_fields(
        path: &Path,
        field_names: Option<Vec<String>>,
        mode: WriteMode,
        encoding: &'static Encoding,
    ) -> Result<Vec<String>> {
        if let Some(fields) = field_names {
            if !fields.is_empty() {
                return Ok(fields);
            }
        }
        if mode == WriteMode::Append {
            if let Ok(reader) = CsvReader::open_with(path, ReadMode::Mapping, encoding) {
                if !reader.field_names().is_empty() {
                    return Ok(reader.field_names().to_vec());
                }
            }
        }
        Err(DataSourceError::MissingFieldNames(format!(
            "'{}' needs an explicit field-name list or an existing header to append to",
            path.display()
        )))
    }

    fn from_parts(
        file_name: Option<String>,
        sink: Box<dyn Write>,
        field_names: Vec<String>,
        mode: WriteMode,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(sink);
        if mode == WriteMode::Write {
            let header: Vec<Vec<u8>> = field_names
                .iter()
                .map(|field| encoding.encode(field).0.into_owned())
                .collect();
            writer.write_record(&header)?;
        }
        Ok(CsvWriter {
            file_name,
            field_names,
            encoding,
            writer: Some(writer),
        })
    }

    /// The configured text encoding
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    fn display_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| "<stream>".to_string())
    }
}

impl DataFile for CsvWriter {
    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Flush buffered rows and finalize the stream (including the gzip
    /// trailer for compressed files). Later writes fail with
    /// [`DataSourceError::Closed`].
    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl DataWriter for CsvWriter {
    fn write_row(&mut self, row: &RowMap) -> Result<()> {
        if self.writer.is_none() {
            return Err(DataSourceError::Closed(self.display_name()));
        }
        let tokens: Vec<Vec<u8>> = self
            .field_names
            .iter()
            .map(|field| {
                let text = row.get(field).map(Value::as_string).unwrap_or_default();
                self.encoding.encode(&text).0.into_owned()
            })
            .collect();
        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(&tokens)?;
        }
        Ok(())
    }
}

impl Drop for CsvWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn fields() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_roundtrip_values_come_back_as_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let mut writer = CsvWriter::create(&path, fields()).unwrap();
        writer
            .write_lists(&[
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
                vec![Value::Int(4), Value::Int(5), Value::Int(6)],
            ])
            .unwrap();
        writer.close().unwrap();

        let mut reader = CsvReader::open_with(&path, ReadMode::List, UTF_8).unwrap();
        assert_eq!(reader.field_names(), &fields()[..]);
        let rows = reader.read_lists().unwrap();
        assert_eq!(
            rows[0],
            vec![
                Value::Text("1".to_string()),
                Value::Text("2".to_string()),
                Value::Text("3".to_string())
            ]
        );
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv.gz");

        let mut writer = CsvWriter::create(&path, fields()).unwrap();
        writer
            .write_list(&[
                Value::Text("x".to_string()),
                Value::Text("y".to_string()),
                Value::Text("z".to_string()),
            ])
            .unwrap();
        writer.close().unwrap();
        drop(writer);

        let mut reader = CsvReader::open(&path).unwrap();
        let rows = reader.read_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("b"), Some(&Value::Text("y".to_string())));
    }

    #[test]
    fn test_append_discovers_fields_from_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let mut writer = CsvWriter::create(&path, fields()).unwrap();
        writer
            .write_list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        writer.close().unwrap();
        drop(writer);

        let mut writer = CsvWriter::new(&path, None, WriteMode::Append, UTF_8).unwrap();
        assert_eq!(writer.field_names(), &fields()[..]);
        writer
            .write_list(&[Value::Int(4), Value::Int(5), Value::Int(6)])
            .unwrap();
        writer.close().unwrap();
        drop(writer);

        let mut reader = CsvReader::open(&path).unwrap();
        let rows = reader.read_lists().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], Value::Text("4".to_string()));
    }

    #[test]
    fn test_gzip_append_adds_a_member() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv.gz");

        let mut writer = CsvWriter::create(&path, fields()).unwrap();
        writer
            .write_list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        writer.close().unwrap();
        drop(writer);

        // the append session writes a second gzip member; the multi-member
        // decoder must read across the boundary
        let mut writer = CsvWriter::new(&path, None, WriteMode::Append, UTF_8).unwrap();
        assert_eq!(writer.field_names(), &fields()[..]);
        writer
            .write_list(&[Value::Int(4), Value::Int(5), Value::Int(6)])
            .unwrap();
        writer.close().unwrap();
        drop(writer);

        let mut reader = CsvReader::open(&path).unwrap();
        let rows = reader.read_lists().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::Text("1".to_string()));
        assert_eq!(rows[1][2], Value::Text("6".to_string()));
    }

    #[test]
    fn test_latin1_encoding_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.csv");

        let mut writer =
            CsvWriter::new(&path, Some(fields()), WriteMode::Write, WINDOWS_1252).unwrap();
        writer
            .write_list(&[
                Value::Text("café".to_string()),
                Value::Text("y".to_string()),
                Value::Text("z".to_string()),
            ])
            .unwrap();
        writer.close().unwrap();
        drop(writer);

        // "é" on disk is the single windows-1252 byte, not the UTF-8 pair
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.contains(&0xE9));
        assert!(!bytes.windows(2).any(|w| w == [0xC3, 0xA9]));

        let mut reader = CsvReader::open_with(&path, ReadMode::Mapping, WINDOWS_1252).unwrap();
        let rows = reader.read_rows().unwrap();
        assert_eq!(rows[0].get("a"), Some(&Value::Text("café".to_string())));
    }

    #[test]
    fn test_append_without_header_or_fields_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let err = CsvWriter::new(&path, None, WriteMode::Append, UTF_8).unwrap_err();
        assert!(matches!(err, DataSourceError::MissingFieldNames(_)));
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut writer = CsvWriter::create(&path, fields()).unwrap();
        writer.close().unwrap();
        let err = writer
            .write_list(&[Value::Empty, Value::Empty, Value::Empty])
            .unwrap_err();
        assert!(matches!(err, DataSourceError::Closed(_)));
    }

    #[test]
    fn test_stream_bound_reader() {
        let input = Cursor::new("a,b\n1,2\n3,4\n");
        let mut reader = CsvReader::from_reader(input, ReadMode::Mapping).unwrap();
        assert!(reader.file_name().is_none());
        let rows = reader.read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("a"), Some(&Value::Text("3".to_string())));
        assert!(reader.read_row().unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_missing_fields_written_empty_extra_keys_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sparse.csv");
        {
            let mut writer = CsvWriter::create(&path, fields()).unwrap();
            let mut row = RowMap::new();
            row.insert("c".to_string(), Value::Int(3));
            row.insert("ignored".to_string(), Value::Int(9));
            writer.write_row(&row).unwrap();
            writer.close().unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b,c\n,,3\n");
    }

    #[test]
    fn test_stream_bound_writer_requires_fields() {
        let err =
            CsvWriter::from_writer(Cursor::new(Vec::new()), Vec::new(), WriteMode::Write)
                .unwrap_err();
        assert!(matches!(err, DataSourceError::MissingFieldNames(_)));
    }
}
