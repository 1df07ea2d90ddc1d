//! The uniform reader/writer contracts every concrete format implements
//!
//! Each concrete reader supplies one primitive, [`DataReader::read_row`],
//! and each concrete writer supplies [`DataWriter::write_row`]. Everything
//! else — shape dispatch, bulk helpers, reader-to-writer import — is
//! derived here and shared by all formats.

use crate::error::Result;
use crate::record::{list_to_mapping, mapping_to_list, Record, Row, RowMap, ToRow};
use crate::types::{ReadMode, Value};

/// Shared lifecycle contract for every data file reader and writer.
pub trait DataFile {
    /// The ordered field-name list of this file
    fn field_names(&self) -> &[String];

    /// The bound file path, or `None` for a caller-supplied stream
    fn file_name(&self) -> Option<&str>;

    /// Release resources and finalize the backing store.
    ///
    /// Safe to call exactly once; concrete types also finalize from `Drop`
    /// so that every exit path releases the file.
    fn close(&mut self) -> Result<()>;
}

/// The read contract: a forward-only, single-pass sequence of rows.
pub trait DataReader: DataFile {
    /// The shape iteration yields, fixed at construction
    fn mode(&self) -> ReadMode;

    /// Read the next row as a field-name → value mapping.
    ///
    /// Returns [`EndOfData`](crate::DataSourceError::EndOfData) once the
    /// source is exhausted, and keeps returning it on every later call.
    fn read_row(&mut self) -> Result<RowMap>;

    /// Read the next row as a [`Record`], or `None` at end-of-data.
    fn read(&mut self) -> Result<Option<Record>> {
        match self.read_row() {
            Ok(row) => Ok(Some(Record::from_mapping(row))),
            Err(e) if e.is_end_of_data() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The mode-aware iteration step: the next row in the reader's
    /// configured shape, or `None` at end-of-data.
    fn next_row(&mut self) -> Result<Option<Row>> {
        let row = match self.read_row() {
            Ok(row) => row,
            Err(e) if e.is_end_of_data() => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(match self.mode() {
            ReadMode::Object => Row::Object(Record::from_mapping(row)),
            ReadMode::Mapping => Row::Mapping(row),
            ReadMode::List => Row::List(mapping_to_list(&row, self.field_names())),
        }))
    }

    /// Drain the remaining rows as records. Materializes fully in memory.
    fn read_objects(&mut self) -> Result<Vec<Record>> {
        let mut objects = Vec::new();
        while let Some(record) = self.read()? {
            objects.push(record);
        }
        Ok(objects)
    }

    /// Drain the remaining rows as mappings. Materializes fully in memory.
    fn read_rows(&mut self) -> Result<Vec<RowMap>> {
        let mut rows = Vec::new();
        loop {
            match self.read_row() {
                Ok(row) => rows.push(row),
                Err(e) if e.is_end_of_data() => return Ok(rows),
                Err(e) => return Err(e),
            }
        }
    }

    /// Drain the remaining rows as ordered value lists. Materializes fully
    /// in memory.
    fn read_lists(&mut self) -> Result<Vec<Vec<Value>>> {
        let mut lists = Vec::new();
        loop {
            match self.read_row() {
                Ok(row) => lists.push(mapping_to_list(&row, self.field_names())),
                Err(e) if e.is_end_of_data() => return Ok(lists),
                Err(e) => return Err(e),
            }
        }
    }

    /// Lazy iterator over [`next_row`](DataReader::next_row)
    fn rows(&mut self) -> Rows<'_>
    where
        Self: Sized,
    {
        Rows::new(self)
    }
}

/// Iterator adapter over a reader's mode-aware iteration step.
///
/// Stops at end-of-data without surfacing it as an error.
pub struct Rows<'a> {
    reader: &'a mut (dyn DataReader + 'a),
}

impl<'a> Rows<'a> {
    /// Wrap a reader, including a boxed `dyn DataReader`
    pub fn new(reader: &'a mut (dyn DataReader + 'a)) -> Self {
        Rows { reader }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_row().transpose()
    }
}

/// The write contract: rows in, one `write_row` call per row, in order.
pub trait DataWriter: DataFile {
    /// Write exactly one row from a field-name → value mapping.
    ///
    /// The writer's fixed field-name list determines column positions.
    /// Fields absent from the mapping are written empty; mapping keys
    /// outside the field list are silently dropped.
    fn write_row(&mut self, row: &RowMap) -> Result<()>;

    /// Write one row in any presentation shape
    fn write(&mut self, row: Row) -> Result<()> {
        match row {
            Row::Object(record) => self.write_row(&record.to_mapping()),
            Row::Mapping(row) => self.write_row(&row),
            Row::List(values) => self.write_list(&values),
        }
    }

    /// Write one row from an ordered value list, zipped with the field
    /// names. The list must match the field-name list in length.
    fn write_list(&mut self, values: &[Value]) -> Result<()> {
        let fields = self.field_names().to_vec();
        let row = list_to_mapping(values, &fields)?;
        self.write_row(&row)
    }

    /// Write one row from any value exposable as a row
    fn write_record(&mut self, value: &dyn ToRow) -> Result<()> {
        self.write_row(&value.to_row())
    }

    /// Write a sequence of mapping rows, in order
    fn write_rows(&mut self, rows: &[RowMap]) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Write a sequence of value-list rows, in order
    fn write_lists(&mut self, rows: &[Vec<Value>]) -> Result<()> {
        for row in rows {
            self.write_list(row)?;
        }
        Ok(())
    }

    /// Write a sequence of row-exposable values, in order
    fn write_objects<T: ToRow>(&mut self, objects: &[T]) -> Result<()>
    where
        Self: Sized,
    {
        for object in objects {
            self.write_record(object)?;
        }
        Ok(())
    }

    /// Drain a reader and write every produced row, preserving order.
    ///
    /// The reader's configured shape is fed straight into [`write`]'s shape
    /// dispatch, which is what makes format conversion a one-liner.
    ///
    /// [`write`]: DataWriter::write
    fn import_reader(&mut self, reader: &mut dyn DataReader) -> Result<()> {
        while let Some(row) = reader.next_row()? {
            self.write(row)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for dyn DataReader + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("file_name", &self.file_name())
            .field("field_names", &self.field_names())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for dyn DataWriter + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataWriter")
            .field("file_name", &self.file_name())
            .field("field_names", &self.field_names())
            .finish_non_exhaustive()
    }
}
