//! The module contains the errors the import engine can report.
//!
//! There are two families:
//!
//! - [`ImportError`] is fatal and aborts the whole run (unreadable workbook,
//!   broken schema metadata, or a workbook that failed validation).
//! - [`ImportIssue`] wraps every recoverable problem: [`StructuralError`],
//!   [`RowRangeError`], [`ReferenceResolutionError`], [`ValueError`] and
//!   [`DuplicateNameError`]. Issues are accumulated in lists and never stop the
//!   processing of sibling tables, columns or rows.
use std::fmt;

use thiserror::Error;

use crate::{schema::EntityKind, schema::ValueType, workbook::CellKind};

/// Fatal engine errors.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Schema definition error: {0}")]
    SchemaDefinition(String),
    #[error("Malformed workbook: {0}")]
    Workbook(String),
    #[error("Workbook failed validation with {} error(s)", .0.len())]
    Structural(Vec<StructuralError>),
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),
    #[error(transparent)]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
}

impl PartialEq for ImportError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SchemaDefinition(a), Self::SchemaDefinition(b)) => a == b,
            (Self::Workbook(a), Self::Workbook(b)) => a == b,
            (Self::Structural(a), Self::Structural(b)) => a == b,
            (Self::ThreadPool(a), Self::ThreadPool(b)) => a == b,
            (Self::Io(a), Self::Io(b)) => a.to_string() == b.to_string(),
            (Self::Zip(a), Self::Zip(b)) => a.to_string() == b.to_string(),
            (Self::Xml(a), Self::Xml(b)) => a.to_string() == b.to_string(),
            (Self::XmlEncoding(a), Self::XmlEncoding(b)) => a.to_string() == b.to_string(),
            (Self::XmlAttribute(a), Self::XmlAttribute(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Violations of the required workbook layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("A valid workbook must have at least two sheets, found {found}")]
    TooFewSheets { found: usize },
    #[error("Workbook must have exactly one setup worksheet named \"{expected}\", found {found}")]
    SetupSheetCount { expected: &'static str, found: usize },
    #[error("Workbook has an invalid sheet name \"{sheet}\"")]
    InvalidSheetName { sheet: String },
    #[error("Workbook has more than one sheet named \"{sheet}\"")]
    DuplicateSheet { sheet: String },
    #[error("Worksheet \"{sheet}\" does not contain table \"{table}\"")]
    MissingTable { sheet: String, table: String },
    #[error("Worksheet \"{sheet}\" table \"{table}\" does not contain column \"{column}\"")]
    MissingColumn {
        sheet: String,
        table: String,
        column: String,
    },
    #[error("Worksheet \"{sheet}\" table \"{table}\" has an illegal blank cell in column \"{column}\" at row {}", .row + 1)]
    IllegalBlank {
        sheet: String,
        table: String,
        column: String,
        row: usize,
    },
    #[error("Worksheet \"{sheet}\" table \"{table}\" has a {found} cell in {expected} column \"{column}\" at row {}", .row + 1)]
    WrongCellKind {
        sheet: String,
        table: String,
        column: String,
        row: usize,
        expected: ValueType,
        found: CellKind,
    },
    #[error("Worksheet \"{sheet}\" contains extra table \"{table}\"")]
    UnexpectedTable { sheet: String, table: String },
}

/// Failures while locating the child rows of a parent row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowRangeError {
    #[error("the table ends before the child rows of row {}", .parent + 1)]
    EndOfTable { parent: usize },
    #[error("row {} is followed by another parent row instead of its child rows", .parent + 1)]
    NoChildren { parent: usize },
    #[error("column \"{0}\" not found")]
    MissingColumn(String),
}

/// A name that is not present in the registry of its entity kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no {kind} named \"{name}\"")]
pub struct ReferenceResolutionError {
    pub kind: EntityKind,
    pub name: String,
}

/// A name registered twice for the same entity kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} \"{name}\" is already defined")]
pub struct DuplicateNameError {
    pub kind: EntityKind,
    pub name: String,
}

/// A cell whose content cannot become a record field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("a value is required")]
    Blank,
    #[error("expected a {expected} value, found a {found} cell")]
    WrongKind { expected: ValueType, found: CellKind },
    #[error("{0}")]
    Invalid(String),
}

impl From<records::RecordError> for ValueError {
    fn from(value: records::RecordError) -> Self {
        Self::Invalid(value.to_string())
    }
}

/// Where a recoverable issue was found.
///
/// Rows are 0-based data row indices; they are displayed 1-based.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellLocation {
    pub sheet: String,
    pub table: String,
    pub column: Option<String>,
    pub row: Option<usize>,
}

impl CellLocation {
    pub fn table(sheet: &str, table: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            table: table.to_string(),
            column: None,
            row: None,
        }
    }

    #[must_use]
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn at_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worksheet \"{}\" table \"{}\"", self.sheet, self.table)?;
        if let Some(column) = &self.column {
            write!(f, " column \"{column}\"")?;
        }
        if let Some(row) = self.row {
            write!(f, " row {}", row + 1)?;
        }
        Ok(())
    }
}

/// Any recoverable problem found while validating or converting a workbook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportIssue {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("{location}: {error}")]
    RowRange {
        location: CellLocation,
        error: RowRangeError,
    },
    #[error("{location}: {error}")]
    Reference {
        location: CellLocation,
        error: ReferenceResolutionError,
    },
    #[error("{location}: {error}")]
    Value {
        location: CellLocation,
        error: ValueError,
    },
    #[error("{location}: {error}")]
    DuplicateName {
        location: CellLocation,
        error: DuplicateNameError,
    },
}

impl ImportIssue {
    /// Returns the location of a conversion issue. Structural errors carry
    /// their context inline and return `None`.
    pub fn location(&self) -> Option<&CellLocation> {
        match self {
            Self::Structural(_) => None,
            Self::RowRange { location, .. }
            | Self::Reference { location, .. }
            | Self::Value { location, .. }
            | Self::DuplicateName { location, .. } => Some(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_displayed_one_based() {
        let error = StructuralError::IllegalBlank {
            sheet: "2024-03".to_string(),
            table: "Budgets.2024.03".to_string(),
            column: "Amount".to_string(),
            row: 0,
        };
        assert_eq!(
            error.to_string(),
            "Worksheet \"2024-03\" table \"Budgets.2024.03\" has an illegal blank cell in column \"Amount\" at row 1"
        );
    }

    #[test]
    fn issue_renders_location_and_cause() {
        let issue = ImportIssue::Reference {
            location: CellLocation::table("2024-03", "AccountMappings.2024.03")
                .at_column("Account Name")
                .at_row(2),
            error: ReferenceResolutionError {
                kind: EntityKind::Account,
                name: "Savings".to_string(),
            },
        };
        assert_eq!(
            issue.to_string(),
            "Worksheet \"2024-03\" table \"AccountMappings.2024.03\" column \"Account Name\" row 3: no Account named \"Savings\""
        );
        assert_eq!(issue.location().and_then(|l| l.row), Some(2));
    }
}
