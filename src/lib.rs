//! # tabsource
//!
//! Uniform reader/writer access to tabular data files: CSV (plain or
//! gzipped) and Excel workbooks (`.xls`, `.xlsx`) behind one contract.
//!
//! ## Features
//!
//! - **One abstraction**: every format implements the same
//!   [`DataReader`]/[`DataWriter`] contracts around a single
//!   read-one-row / write-one-row primitive
//! - **Three row shapes**: objects ([`Record`]), mappings ([`RowMap`]) and
//!   ordered value lists, losslessly interchangeable given the field names
//! - **Format dispatch**: [`open_reader`]/[`open_writer`] pick the
//!   implementation from the file extension; [`convert`] moves data
//!   between formats in one call
//! - **Transparent gzip**: a `.gz` suffix compresses and decompresses
//!   invisibly
//! - **No coercion**: CSV yields text, spreadsheets yield the native cell
//!   types; nothing is reinterpreted on the way through
//!
//! ## Quick Start
//!
//! ### Writing and reading a CSV file
//!
//! ```no_run
//! use tabsource::{CsvReader, CsvWriter, DataFile, DataReader, DataWriter, Value};
//!
//! # fn main() -> tabsource::Result<()> {
//! let fields = vec!["id".to_string(), "name".to_string()];
//! let mut writer = CsvWriter::create("people.csv", fields)?;
//! writer.write_list(&[Value::Int(1), Value::Text("John".to_string())])?;
//! writer.close()?;
//!
//! let mut reader = CsvReader::open("people.csv")?;
//! for row in reader.rows() {
//!     println!("{:?}", row?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Converting a CSV file into a workbook
//!
//! ```no_run
//! # fn main() -> tabsource::Result<()> {
//! tabsource::convert("people.csv", "people.xlsx")?;
//! assert!(tabsource::equals("people.csv", "people.xlsx")?);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod csvfile;
pub mod datafile;
pub mod error;
pub mod excel;
pub mod record;
pub mod types;

pub use builder::{
    convert, equals, load, load_lists, load_mappings, load_objects, open_reader, open_writer,
    open_writer_with, save_lists, save_mappings, save_objects,
};
pub use csvfile::{CsvReader, CsvWriter};
pub use datafile::{DataFile, DataReader, DataWriter, Rows};
pub use error::{DataSourceError, Result};
pub use excel::{ExcelReader, ExcelWriter};
pub use record::{normalize_identifier, Record, Row, RowMap, ToRow};
pub use types::{ReadMode, SheetRef, Value, WriteMode};
