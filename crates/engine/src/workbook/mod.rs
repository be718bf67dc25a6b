//! In-memory workbook document.
//!
//! A [`Workbook`] is fully materialised before validation starts and is never
//! mutated afterwards. Tables only expose their data rows: header and totals
//! rows are stripped by whoever builds the document.
use std::{fs::File, io::BufReader, path::Path};

pub use cell::{Cell, CellKind, DateSystem};

use crate::ResultImport;

mod cell;
mod xlsx;
mod xml;

static BLANK: Cell = Cell::Blank;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    date_system: DateSystem,
}

impl Workbook {
    /// Return a builder for `Workbook`.
    pub fn builder() -> WorkbookBuilder {
        WorkbookBuilder::default()
    }

    /// Loads an `.xlsx` file from disk.
    pub fn open(path: impl AsRef<Path>) -> ResultImport<Self> {
        let file = File::open(path.as_ref())?;
        let workbook = xlsx::load(BufReader::new(file))?;
        tracing::info!(
            "loaded workbook {} with {} sheet(s)",
            path.as_ref().display(),
            workbook.sheets.len()
        );
        Ok(workbook)
    }

    /// Loads an `.xlsx` package from any seekable reader.
    pub fn from_xlsx<R: std::io::Read + std::io::Seek>(reader: R) -> ResultImport<Self> {
        xlsx::load(reader)
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn date_system(&self) -> DateSystem {
        self.date_system
    }
}

#[derive(Debug, Default)]
pub struct WorkbookBuilder {
    sheets: Vec<Worksheet>,
    date_system: DateSystem,
}

impl WorkbookBuilder {
    pub fn sheet(mut self, sheet: Worksheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub fn date_system(mut self, date_system: DateSystem) -> Self {
        self.date_system = date_system;
        self
    }

    pub fn build(self) -> Workbook {
        Workbook {
            sheets: self.sheets,
            date_system: self.date_system,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worksheet {
    name: String,
    tables: Vec<Table>,
}

impl Worksheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// A named table: ordered column names plus data rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a data row. Missing trailing cells read as blank.
    #[must_use]
    pub fn with_row<I, C>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        self.push_row(cells.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), Cell::Blank);
        self.rows.push(cells);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at a data row and column position; out of range reads as blank.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&BLANK)
    }

    /// Cell at a data row in the named column, `None` when the column does
    /// not exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        self.column_index(column).map(|index| self.cell(row, index))
    }
}
