//! Row spans of variable-cardinality children stored under their parent row.
use crate::{RowRangeError, workbook::Table};

/// Inclusive span of data rows, `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowRange {
    start: usize,
    end: usize,
}

impl RowRange {
    /// Returns `None` when `start > end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(row: usize) -> Self {
        Self { start: row, end: row }
    }

    pub fn start(self) -> usize {
        self.start
    }

    pub fn end(self) -> usize {
        self.end
    }

    pub fn len(self) -> usize {
        self.end - self.start + 1
    }

    fn overlaps(self, other: RowRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest range covering both. Ranges that do not overlap are only
    /// joined when `bridging` is set.
    pub fn union(self, other: RowRange, bridging: bool) -> Option<RowRange> {
        (bridging || self.overlaps(other)).then_some(Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        })
    }
}

/// Locates the child rows of the parent at `parent_row`.
///
/// When `discriminator` (a column only children fill in) is populated on the
/// parent row itself, the parent row is its only child. Otherwise the children
/// are the following rows, up to the next row where `parent_column` (a column
/// only parents fill in) is populated or the end of the table.
pub fn child_range(
    table: &Table,
    parent_row: usize,
    discriminator: &str,
    parent_column: &str,
) -> Result<RowRange, RowRangeError> {
    let discriminator = table
        .column_index(discriminator)
        .ok_or_else(|| RowRangeError::MissingColumn(discriminator.to_string()))?;
    let parent_column = table
        .column_index(parent_column)
        .ok_or_else(|| RowRangeError::MissingColumn(parent_column.to_string()))?;

    if parent_row >= table.row_count() {
        return Err(RowRangeError::EndOfTable { parent: parent_row });
    }
    if !table.cell(parent_row, discriminator).is_blank() {
        return Ok(RowRange::single(parent_row));
    }

    let first = parent_row + 1;
    if first >= table.row_count() {
        return Err(RowRangeError::EndOfTable { parent: parent_row });
    }
    if !table.cell(first, parent_column).is_blank() {
        return Err(RowRangeError::NoChildren { parent: parent_row });
    }

    let mut last = first;
    while last + 1 < table.row_count() && table.cell(last + 1, parent_column).is_blank() {
        last += 1;
    }
    Ok(RowRange { start: first, end: last })
}
