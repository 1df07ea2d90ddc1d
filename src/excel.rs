//! Spreadsheet reader and writer
//!
//! Reading goes through calamine with one engine per format, selected by
//! extension at construction: legacy binary `.xls` or zipped-XML `.xlsx`.
//! Writing goes through rust_xlsxwriter, a stream-writing engine distinct
//! from the read engines, which is why append mode re-reads the existing
//! file and replays every row into a fresh workbook — an explicit cost of
//! the format, not an oversight.
//!
//! Row 0 is always the header; data rows begin at row 1.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xls, Xlsx};
use rust_xlsxwriter::Workbook;

use crate::datafile::{DataFile, DataReader, DataWriter};
use crate::error::{DataSourceError, Result};
use crate::record::RowMap;
use crate::types::{ReadMode, SheetRef, Value, WriteMode};

fn has_extension(path: &str, ext: &str) -> bool {
    path.to_lowercase().ends_with(ext)
}

/// The two concrete read engines behind one interface.
///
/// Selected once at construction from the file extension and stored; never
/// re-inspected afterward.
enum ReadEngine {
    /// Legacy fixed-binary workbook (`.xls`)
    Legacy(Xls<BufReader<File>>),
    /// Zipped-XML workbook (`.xlsx`)
    ZippedXml(Xlsx<BufReader<File>>),
}

impl ReadEngine {
    fn open(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        if has_extension(&name, ".xls") {
            Ok(ReadEngine::Legacy(open_workbook(path)?))
        } else {
            Ok(ReadEngine::ZippedXml(open_workbook(path)?))
        }
    }

    fn sheet_names(&self) -> Vec<String> {
        match self {
            ReadEngine::Legacy(workbook) => workbook.sheet_names().to_vec(),
            ReadEngine::ZippedXml(workbook) => workbook.sheet_names().to_vec(),
        }
    }

    fn worksheet_range(&mut self, name: &str) -> Result<Range<Data>> {
        match self {
            ReadEngine::Legacy(workbook) => Ok(workbook.worksheet_range(name)?),
            ReadEngine::ZippedXml(workbook) => Ok(workbook.worksheet_range(name)?),
        }
    }
}

/// Convert an engine cell to our cell value
fn data_to_value(data: &Data) -> Value {
    match data {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Float(*f),
        Data::Int(i) => Value::Int(*i),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(d) => Value::DateTime(d.as_f64()),
        Data::Error(e) => Value::Error(format!("{:?}", e)),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Resolve a sheet selector against the workbook's sheet list
fn resolve_sheet(sheet: &SheetRef, names: &[String]) -> Result<String> {
    let found = match sheet {
        SheetRef::Index(index) => names.get(*index).cloned(),
        SheetRef::Name(name) => names.iter().find(|n| *n == name).cloned(),
    };
    found.ok_or_else(|| DataSourceError::SheetNotFound {
        sheet: match sheet {
            SheetRef::Index(index) => format!("index {}", index),
            SheetRef::Name(name) => name.clone(),
        },
        available: names.join(", "),
    })
}

/// Spreadsheet reader over one sheet of an `.xls` or `.xlsx` workbook.
///
/// The header row supplies the field names; trailing empty header cells are
/// trimmed to tolerate ragged headers. Cell values keep the native type the
/// engine produced — numbers come back as numbers, not text.
///
/// The engine materializes the sheet range up front; `read_row` walks it.
///
/// # Examples
///
/// ```no_run
/// use tabsource::{DataReader, ExcelReader};
///
/// # fn main() -> tabsource::Result<()> {
/// let mut reader = ExcelReader::open("data.xlsx")?;
/// for row in reader.rows() {
///     println!("{:?}", row?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ExcelReader {
    file_name: String,
    sheet_name: String,
    field_names: Vec<String>,
    mode: ReadMode,
    total_rows: usize,
    rows: std::vec::IntoIter<RowMap>,
}

impl std::fmt::Debug for ExcelReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExcelReader")
            .field("file_name", &self.file_name)
            .field("sheet_name", &self.sheet_name)
            .field("field_names", &self.field_names)
            .field("mode", &self.mode)
            .field("total_rows", &self.total_rows)
            .finish_non_exhaustive()
    }
}

impl ExcelReader {
    /// Open the first sheet in [`ReadMode::Object`]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, SheetRef::default(), ReadMode::default())
    }

    /// Open a sheet selected by name or zero-based index, with an explicit
    /// read mode
    pub fn open_with<P, S>(path: P, sheet: S, mode: ReadMode) -> Result<Self>
    where
        P: AsRef<Path>,
        S: Into<SheetRef>,
    {
        let file_name = path.as_ref().display().to_string();
        let sheet = sheet.into();
        let mut engine = ReadEngine::open(path.as_ref())?;
        let sheet_name = resolve_sheet(&sheet, &engine.sheet_names())?;
        let range = engine.worksheet_range(&sheet_name)?;

        let mut range_rows = range.rows();
        let mut field_names: Vec<String> = range_rows
            .next()
            .map(|header| header.iter().map(|cell| data_to_value(cell).as_string()).collect())
            .unwrap_or_default();
        // tolerate ragged headers: scan back from the last column
        while field_names.last().is_some_and(|name| name.is_empty()) {
            field_names.pop();
        }

        let rows: Vec<RowMap> = range_rows
            .map(|cells| {
                field_names
                    .iter()
                    .enumerate()
                    .map(|(i, field)| {
                        let value = cells.get(i).map(data_to_value).unwrap_or(Value::Empty);
                        (field.clone(), value)
                    })
                    .collect()
            })
            .collect();

        Ok(ExcelReader {
            file_name,
            sheet_name,
            field_names,
            mode,
            total_rows: rows.len(),
            rows: rows.into_iter(),
        })
    }

    /// The resolved sheet name
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// The number of data rows in the sheet (the header does not count)
    pub fn len(&self) -> usize {
        self.total_rows
    }

    /// True when the sheet has no data rows
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

impl DataFile for ExcelReader {
    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn file_name(&self) -> Option<&str> {
        Some(&self.file_name)
    }

    /// A read-only session performs no write on close
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl DataReader for ExcelReader {
    fn mode(&self) -> ReadMode {
        self.mode
    }

    fn read_row(&mut self) -> Result<RowMap> {
        self.rows.next().ok_or(DataSourceError::EndOfData)
    }
}

/// Spreadsheet writer producing `.xlsx` workbooks.
///
/// The header is written at row 0 on construction; `close` performs the
/// actual save (the engine defers all file I/O to close). Appending opens
/// the existing file with the read engine, captures its field names and
/// rows, and replays everything into a fresh workbook before the new rows —
/// spreadsheet formats have no in-place append.
///
/// Writing legacy `.xls` workbooks is not possible: no BIFF-writing engine
/// exists in the ecosystem, and the constructor says so.
///
/// # Examples
///
/// ```no_run
/// use tabsource::{DataFile, DataWriter, ExcelWriter, Value};
///
/// # fn main() -> tabsource::Result<()> {
/// let fields = vec!["id".to_string(), "name".to_string()];
/// let mut writer = ExcelWriter::new("data.xlsx", "People", fields)?;
/// writer.write_list(&[Value::Int(1), Value::Text("John".to_string())])?;
/// writer.close()?;
/// # Ok(())
/// # }
/// ```
pub struct ExcelWriter {
    file_name: String,
    sheet_name: String,
    field_names: Vec<String>,
    workbook: Option<Workbook>,
    next_row: u32,
}

impl std::fmt::Debug for ExcelWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExcelWriter")
            .field("file_name", &self.file_name)
            .field("sheet_name", &self.sheet_name)
            .field("field_names", &self.field_names)
            .field("next_row", &self.next_row)
            .finish_non_exhaustive()
    }
}

impl ExcelWriter {
    /// Create a workbook, truncating any existing file
    pub fn new<P, S>(path: P, sheet: S, field_names: Vec<String>) -> Result<Self>
    where
        P: AsRef<Path>,
        S: Into<SheetRef>,
    {
        Self::with_mode(path, sheet, Some(field_names), WriteMode::Write)
    }

    /// Create a workbook writer with an explicit write mode.
    ///
    /// In [`WriteMode::Append`] with `field_names` of `None` the field
    /// names are read from the existing sheet's header. Appending to a
    /// path that does not exist yet degrades to a plain write when field
    /// names were given explicitly.
    pub fn with_mode<P, S>(
        path: P,
        sheet: S,
        field_names: Option<Vec<String>>,
        mode: WriteMode,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        S: Into<SheetRef>,
    {
        let file_name = path.as_ref().display().to_string();
        if has_extension(&file_name, ".xls") {
            return Err(DataSourceError::EngineUnavailable {
                engine: "legacy .xls write".to_string(),
                hint: "no Rust crate writes BIFF workbooks; write a .xlsx file instead"
                    .to_string(),
            });
        }
        let sheet = sheet.into();

        let mut existing_rows: Vec<RowMap> = Vec::new();
        let mut field_names = field_names.filter(|fields| !fields.is_empty());
        if mode == WriteMode::Append && path.as_ref().exists() {
            let mut reader = ExcelReader::open_with(path.as_ref(), sheet.clone(), ReadMode::Mapping)?;
            if field_names.is_none() {
                field_names = Some(reader.field_names().to_vec());
            }
            existing_rows = reader.read_rows()?;
        }
        let field_names = field_names.filter(|fields| !fields.is_empty()).ok_or_else(|| {
            DataSourceError::MissingFieldNames(format!(
                "'{}' needs an explicit field-name list or an existing header to append to",
                file_name
            ))
        })?;

        let sheet_name = match &sheet {
            SheetRef::Name(name) => name.clone(),
            SheetRef::Index(index) => format!("Sheet{}", index + 1),
        };

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name.as_str())?;
        for (col, field) in field_names.iter().enumerate() {
            worksheet.write_string(0, col as u16, field.as_str())?;
        }

        let mut writer = ExcelWriter {
            file_name,
            sheet_name,
            field_names,
            workbook: Some(workbook),
            next_row: 1,
        };
        // full rewrite on append: replay every captured row before new ones
        for row in &existing_rows {
            writer.write_row(row)?;
        }
        Ok(writer)
    }

    /// The sheet name being written
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }
}

impl DataFile for ExcelWriter {
    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn file_name(&self) -> Option<&str> {
        Some(&self.file_name)
    }

    /// Save the workbook to disk. All file I/O is deferred to this point.
    fn close(&mut self) -> Result<()> {
        if let Some(mut workbook) = self.workbook.take() {
            workbook.save(&self.file_name)?;
        }
        Ok(())
    }
}

impl DataWriter for ExcelWriter {
    fn write_row(&mut self, row: &RowMap) -> Result<()> {
        let row_idx = self.next_row;
        let workbook = match self.workbook.as_mut() {
            Some(workbook) => workbook,
            None => return Err(DataSourceError::Closed(self.file_name.clone())),
        };
        let worksheet = workbook.worksheet_from_index(0)?;
        for (col, field) in self.field_names.iter().enumerate() {
            let col = col as u16;
            match row.get(field) {
                None | Some(Value::Empty) => {}
                Some(Value::Text(s)) => {
                    worksheet.write_string(row_idx, col, s.as_str())?;
                }
                Some(Value::Int(i)) => {
                    worksheet.write_number(row_idx, col, *i as f64)?;
                }
                Some(Value::Float(f)) => {
                    worksheet.write_number(row_idx, col, *f)?;
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row_idx, col, *b)?;
                }
                Some(Value::DateTime(d)) => {
                    worksheet.write_number(row_idx, col, *d)?;
                }
                // same rendering as the CSV token, `#ERROR: {msg}`
                Some(value @ Value::Error(_)) => {
                    worksheet.write_string(row_idx, col, value.as_string())?;
                }
            }
        }
        self.next_row += 1;
        Ok(())
    }
}

impl Drop for ExcelWriter {
    fn drop(&mut self) {
        if let Some(mut workbook) = self.workbook.take() {
            let _ = workbook.save(&self.file_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fields() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_roundtrip_preserves_numeric_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut writer = ExcelWriter::new(&path, 0, fields()).unwrap();
        writer
            .write_lists(&[
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
                vec![
                    Value::Float(4.5),
                    Value::Bool(true),
                    Value::Text("x".to_string()),
                ],
            ])
            .unwrap();
        writer.close().unwrap();

        let mut reader = ExcelReader::open_with(&path, 0, ReadMode::List).unwrap();
        assert_eq!(reader.field_names(), &fields()[..]);
        assert_eq!(reader.len(), 2);
        let rows = reader.read_lists().unwrap();
        // the write engine has no integer cells, numbers come back as floats
        assert_eq!(
            rows[0],
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]
        );
        assert_eq!(
            rows[1],
            vec![
                Value::Float(4.5),
                Value::Bool(true),
                Value::Text("x".to_string())
            ]
        );
    }

    #[test]
    fn test_error_cells_render_like_csv_tokens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errors.xlsx");

        let error = Value::Error("DIV/0!".to_string());
        let mut writer = ExcelWriter::new(&path, 0, fields()).unwrap();
        writer
            .write_list(&[error.clone(), Value::Int(1), Value::Int(2)])
            .unwrap();
        writer.close().unwrap();

        let mut reader = ExcelReader::open_with(&path, 0, ReadMode::List).unwrap();
        let rows = reader.read_lists().unwrap();
        assert_eq!(rows[0][0], Value::Text(error.as_string()));
        assert_eq!(rows[0][0], Value::Text("#ERROR: DIV/0!".to_string()));
    }

    #[test]
    fn test_sheet_by_name_and_missing_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut writer = ExcelWriter::new(&path, "People", fields()).unwrap();
        writer
            .write_list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        writer.close().unwrap();

        let reader = ExcelReader::open_with(&path, "People", ReadMode::Object).unwrap();
        assert_eq!(reader.sheet_name(), "People");

        let err = ExcelReader::open_with(&path, "Missing", ReadMode::Object).unwrap_err();
        match err {
            DataSourceError::SheetNotFound { sheet, available } => {
                assert_eq!(sheet, "Missing");
                assert_eq!(available, "People");
            }
            other => panic!("expected SheetNotFound, got {:?}", other),
        }

        let err = ExcelReader::open_with(&path, 3, ReadMode::Object).unwrap_err();
        assert!(matches!(err, DataSourceError::SheetNotFound { .. }));
    }

    #[test]
    fn test_ragged_header_is_trimmed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ragged.xlsx");

        // header cells only in the first three columns, data in five: the
        // trailing header cells come back empty and must be trimmed
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, name) in ["a", "b", "c"].iter().enumerate() {
            worksheet.write_string(0, col as u16, *name).unwrap();
        }
        for col in 0..5u16 {
            worksheet.write_number(1, col, f64::from(col)).unwrap();
        }
        workbook.save(&path).unwrap();

        let mut reader = ExcelReader::open_with(&path, 0, ReadMode::List).unwrap();
        assert_eq!(reader.field_names(), &fields()[..]);
        let rows = reader.read_lists().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            vec![Value::Float(0.0), Value::Float(1.0), Value::Float(2.0)]
        );
    }

    #[test]
    fn test_append_replays_existing_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut writer = ExcelWriter::new(&path, 0, fields()).unwrap();
        writer
            .write_list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        writer.close().unwrap();

        let mut writer = ExcelWriter::with_mode(&path, 0, None, WriteMode::Append).unwrap();
        assert_eq!(writer.field_names(), &fields()[..]);
        writer
            .write_list(&[Value::Int(4), Value::Int(5), Value::Int(6)])
            .unwrap();
        writer.close().unwrap();

        let mut reader = ExcelReader::open_with(&path, 0, ReadMode::List).unwrap();
        let rows = reader.read_lists().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]
        );
        assert_eq!(
            rows[1],
            vec![Value::Float(4.0), Value::Float(5.0), Value::Float(6.0)]
        );
    }

    #[test]
    fn test_append_to_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.xlsx");

        // no fields and nothing to discover them from
        let err = ExcelWriter::with_mode(&path, 0, None, WriteMode::Append).unwrap_err();
        assert!(matches!(err, DataSourceError::MissingFieldNames(_)));

        // explicit fields degrade to a plain write
        let mut writer =
            ExcelWriter::with_mode(&path, 0, Some(fields()), WriteMode::Append).unwrap();
        writer
            .write_list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        writer.close().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_legacy_write_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xls");
        let err = ExcelWriter::new(&path, 0, fields()).unwrap_err();
        assert!(matches!(err, DataSourceError::EngineUnavailable { .. }));
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        let mut writer = ExcelWriter::new(&path, 0, fields()).unwrap();
        writer.close().unwrap();
        let err = writer
            .write_list(&[Value::Empty, Value::Empty, Value::Empty])
            .unwrap_err();
        assert!(matches!(err, DataSourceError::Closed(_)));
    }

    #[test]
    fn test_end_of_data_is_sticky() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut writer = ExcelWriter::new(&path, 0, fields()).unwrap();
        writer
            .write_list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        writer.close().unwrap();

        let mut reader = ExcelReader::open(&path).unwrap();
        assert!(reader.read_row().is_ok());
        assert!(reader.read_row().unwrap_err().is_end_of_data());
        assert!(reader.read_row().unwrap_err().is_end_of_data());
    }
}
