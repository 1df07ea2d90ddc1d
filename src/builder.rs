//! Extension-based format dispatch and the convenience facade
//!
//! `open_reader` / `open_writer` route a file name to the concrete CSV or
//! spreadsheet implementation by its extension (case-insensitive):
//! `.csv`, `.csv.gz` and `.gz` go to the CSV types, `.xls` and `.xlsx` to
//! the spreadsheet types. Everything else in this module is a thin
//! composition of those two calls with the reader/writer contracts — no
//! state of its own.

use std::path::Path;

use encoding_rs::UTF_8;

use crate::csvfile::{CsvReader, CsvWriter};
use crate::datafile::{DataReader, DataWriter};
use crate::error::{DataSourceError, Result};
use crate::excel::{ExcelReader, ExcelWriter};
use crate::record::{fields_of_mapping, Record, Row, RowMap, ToRow};
use crate::types::{ReadMode, SheetRef, Value, WriteMode};

fn is_csv(name: &str) -> bool {
    name.ends_with(".csv") || name.ends_with(".csv.gz") || name.ends_with(".gz")
}

fn is_excel(name: &str) -> bool {
    name.ends_with(".xls") || name.ends_with(".xlsx")
}

/// Open a reader chosen by the file-name extension.
///
/// # Examples
///
/// ```no_run
/// use tabsource::{open_reader, ReadMode};
///
/// # fn main() -> tabsource::Result<()> {
/// let mut reader = open_reader("data.xlsx", ReadMode::Mapping)?;
/// for row in reader.read_rows()? {
///     println!("{:?}", row);
/// }
/// # Ok(())
/// # }
/// ```
pub fn open_reader<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Box<dyn DataReader>> {
    let name = path.as_ref().display().to_string().to_lowercase();
    if is_csv(&name) {
        Ok(Box::new(CsvReader::open_with(path, mode, UTF_8)?))
    } else if is_excel(&name) {
        Ok(Box::new(ExcelReader::open_with(
            path,
            SheetRef::default(),
            mode,
        )?))
    } else {
        Err(DataSourceError::UnsupportedExtension(
            path.as_ref().display().to_string(),
        ))
    }
}

/// Open a writer chosen by the file-name extension, truncating the file
/// and writing the header row
pub fn open_writer<P: AsRef<Path>>(
    path: P,
    field_names: Vec<String>,
) -> Result<Box<dyn DataWriter>> {
    open_writer_with(path, Some(field_names), WriteMode::Write)
}

/// Open a writer chosen by the file-name extension, with an explicit write
/// mode. In append mode field names may be discovered from the existing
/// file.
pub fn open_writer_with<P: AsRef<Path>>(
    path: P,
    field_names: Option<Vec<String>>,
    mode: WriteMode,
) -> Result<Box<dyn DataWriter>> {
    let name = path.as_ref().display().to_string().to_lowercase();
    if is_csv(&name) {
        Ok(Box::new(CsvWriter::new(path, field_names, mode, UTF_8)?))
    } else if is_excel(&name) {
        Ok(Box::new(ExcelWriter::with_mode(
            path,
            SheetRef::default(),
            field_names,
            mode,
        )?))
    } else {
        Err(DataSourceError::UnsupportedExtension(
            path.as_ref().display().to_string(),
        ))
    }
}

/// Load a whole file in the given read mode. Materializes fully in memory.
pub fn load<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Vec<Row>> {
    let mut reader = open_reader(path, mode)?;
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row()? {
        rows.push(row);
    }
    reader.close()?;
    Ok(rows)
}

/// Load a whole file as records
pub fn load_objects<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let mut reader = open_reader(path, ReadMode::Object)?;
    let objects = reader.read_objects()?;
    reader.close()?;
    Ok(objects)
}

/// Load a whole file as field-name → value mappings
pub fn load_mappings<P: AsRef<Path>>(path: P) -> Result<Vec<RowMap>> {
    let mut reader = open_reader(path, ReadMode::Mapping)?;
    let rows = reader.read_rows()?;
    reader.close()?;
    Ok(rows)
}

/// Load a whole file as ordered value lists
pub fn load_lists<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<Value>>> {
    let mut reader = open_reader(path, ReadMode::List)?;
    let lists = reader.read_lists()?;
    reader.close()?;
    Ok(lists)
}

/// Save a sequence of row-exposable values; field names come from the
/// first element. The sequence must not be empty.
pub fn save_objects<P: AsRef<Path>, T: ToRow>(path: P, objects: &[T]) -> Result<()> {
    let first = objects
        .first()
        .ok_or(DataSourceError::EmptyInput("the list of objects"))?;
    let mut writer = open_writer(path, first.field_names())?;
    for object in objects {
        writer.write_record(object)?;
    }
    writer.close()
}

/// Save a sequence of mapping rows; field names come from the keys of the
/// first mapping. The sequence must not be empty.
pub fn save_mappings<P: AsRef<Path>>(path: P, rows: &[RowMap]) -> Result<()> {
    let first = rows
        .first()
        .ok_or(DataSourceError::EmptyInput("the list of mappings"))?;
    let mut writer = open_writer(path, fields_of_mapping(first))?;
    writer.write_rows(rows)?;
    writer.close()
}

/// Save a sequence of value-list rows under an explicit field-name list.
/// The sequence must not be empty.
pub fn save_lists<P: AsRef<Path>>(
    path: P,
    rows: &[Vec<Value>],
    field_names: Vec<String>,
) -> Result<()> {
    if rows.is_empty() {
        return Err(DataSourceError::EmptyInput("the list of lists"));
    }
    let mut writer = open_writer(path, field_names)?;
    writer.write_lists(rows)?;
    writer.close()
}

/// Convert a file into another, in either direction between formats.
///
/// The two paths must not be the same file.
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let from_name = from.as_ref().display().to_string();
    if from.as_ref() == to.as_ref() {
        return Err(DataSourceError::SamePath(from_name));
    }
    let mut reader = open_reader(from, ReadMode::Mapping)?;
    let mut writer = open_writer(to, reader.field_names().to_vec())?;
    writer.import_reader(&mut *reader)?;
    reader.close()?;
    writer.close()
}

/// Check whether two data files hold the same content, independently of
/// format.
///
/// Length is compared first; then every key of a row must exist with an
/// equal value in the other file's row at the same position. Extra keys on
/// the second file's side do not fail the comparison. Comparing a CSV
/// against a spreadsheet is only meaningful when all values are textual,
/// since numeric cells and their text representation differ between
/// engines.
pub fn equals<P: AsRef<Path>, Q: AsRef<Path>>(file1: P, file2: Q) -> Result<bool> {
    let rows1 = load_mappings(file1)?;
    let rows2 = load_mappings(file2)?;
    if rows1.len() != rows2.len() {
        return Ok(false);
    }
    for (row1, row2) in rows1.iter().zip(rows2.iter()) {
        for (key, value) in row1 {
            if row2.get(key) != Some(value) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
