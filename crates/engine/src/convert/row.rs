use std::{ops::Range, str::FromStr};

use chrono::NaiveDate;
use records::{MoneyCents, RecordError, RecordId};

use crate::{
    CellLocation, ImportIssue, IdSequence, ValueError,
    range::RowRange,
    registry::NameRegistry,
    schema::{EntityKind, ValueType},
    workbook::{Cell, DateSystem, Table},
};

/// Typed access to the cells of one table row.
///
/// Every failed read is recorded and answered with a default value, so a
/// converter reads all its fields and the row reports every problem at once.
pub(crate) struct RowReader<'a> {
    table: &'a Table,
    row: usize,
    location: CellLocation,
    date_system: DateSystem,
    issues: Vec<ImportIssue>,
}

impl<'a> RowReader<'a> {
    pub(crate) fn new(table: &'a Table, row: usize, location: &CellLocation, date_system: DateSystem) -> Self {
        Self {
            table,
            row,
            location: location.clone().at_row(row),
            date_system,
            issues: Vec::new(),
        }
    }

    pub(crate) fn table(&self) -> &'a Table {
        self.table
    }

    pub(crate) fn row(&self) -> usize {
        self.row
    }

    /// Location of the table, without row or column.
    pub(crate) fn table_location(&self) -> CellLocation {
        CellLocation {
            row: None,
            column: None,
            ..self.location.clone()
        }
    }

    pub(crate) fn date_system(&self) -> DateSystem {
        self.date_system
    }

    fn at(&self, column: &str) -> CellLocation {
        self.location.clone().at_column(column)
    }

    fn fail(&mut self, column: &str, error: ValueError) {
        self.issues.push(ImportIssue::Value {
            location: self.at(column),
            error,
        });
    }

    /// Blank cells yield `None`. A missing column is recorded and also
    /// yields `None`.
    fn read<T>(&mut self, column: &str, parse: impl FnOnce(&Cell, DateSystem) -> Result<T, ValueError>) -> Option<T> {
        let table = self.table;
        let Some(cell) = table.value(self.row, column) else {
            self.fail(column, ValueError::Invalid(format!("column \"{column}\" not found")));
            return None;
        };
        if cell.is_blank() {
            return None;
        }
        match parse(cell, self.date_system) {
            Ok(value) => Some(value),
            Err(error) => {
                self.fail(column, error);
                None
            }
        }
    }

    fn required<T: Default>(
        &mut self,
        column: &str,
        parse: impl FnOnce(&Cell, DateSystem) -> Result<T, ValueError>,
    ) -> T {
        let blank = self.table.value(self.row, column).is_some_and(Cell::is_blank);
        match self.read(column, parse) {
            Some(value) => value,
            None => {
                if blank {
                    self.fail(column, ValueError::Blank);
                }
                T::default()
            }
        }
    }

    pub(crate) fn text(&mut self, column: &str) -> String {
        self.required(column, parse_text)
    }

    pub(crate) fn optional_text(&mut self, column: &str) -> Option<String> {
        self.read(column, parse_text)
    }

    pub(crate) fn decimal(&mut self, column: &str) -> MoneyCents {
        self.required(column, parse_decimal)
    }

    pub(crate) fn optional_decimal(&mut self, column: &str) -> Option<MoneyCents> {
        self.read(column, parse_decimal)
    }

    pub(crate) fn date(&mut self, column: &str) -> NaiveDate {
        self.required(column, parse_date)
    }

    pub(crate) fn optional_date(&mut self, column: &str) -> Option<NaiveDate> {
        self.read(column, parse_date)
    }

    pub(crate) fn boolean(&mut self, column: &str) -> bool {
        self.required(column, parse_boolean)
    }

    pub(crate) fn optional_boolean(&mut self, column: &str) -> Option<bool> {
        self.read(column, parse_boolean)
    }

    pub(crate) fn label<T>(&mut self, column: &str) -> T
    where
        T: FromStr<Err = RecordError> + Default,
    {
        self.required(column, parse_label)
    }

    pub(crate) fn optional_label<T>(&mut self, column: &str) -> Option<T>
    where
        T: FromStr<Err = RecordError>,
    {
        self.read(column, parse_label)
    }

    /// Id registered under the name written in `column`.
    pub(crate) fn reference(&mut self, column: &str, registry: &NameRegistry) -> RecordId {
        let name = self.text(column);
        self.resolve_name(column, &name, registry)
    }

    /// Id registered under `name`, already read from `column`.
    pub(crate) fn resolve_name(&mut self, column: &str, name: &str, registry: &NameRegistry) -> RecordId {
        if name.is_empty() {
            return RecordId::default();
        }
        self.resolve(column, name, registry).unwrap_or_default()
    }

    pub(crate) fn optional_reference(&mut self, column: &str, registry: &NameRegistry) -> Option<RecordId> {
        let name = self.optional_text(column)?;
        self.resolve(column, &name, registry)
    }

    fn resolve(&mut self, column: &str, name: &str, registry: &NameRegistry) -> Option<RecordId> {
        match registry.resolve(name) {
            Ok(id) => Some(id),
            Err(error) => {
                self.issues.push(ImportIssue::Reference {
                    location: self.at(column),
                    error,
                });
                None
            }
        }
    }

    /// Returns `record` when every read succeeded, the recorded issues
    /// otherwise.
    pub(crate) fn finish<T>(self, record: T) -> Result<T, Vec<ImportIssue>> {
        if self.issues.is_empty() {
            Ok(record)
        } else {
            Err(self.issues)
        }
    }
}

fn wrong_kind(expected: ValueType, cell: &Cell) -> ValueError {
    ValueError::WrongKind {
        expected,
        found: cell.kind(),
    }
}

fn parse_text(cell: &Cell, _: DateSystem) -> Result<String, ValueError> {
    match cell {
        Cell::Text(text) => Ok(text.trim().to_string()),
        other => Err(wrong_kind(ValueType::String, other)),
    }
}

fn parse_decimal(cell: &Cell, _: DateSystem) -> Result<MoneyCents, ValueError> {
    match cell {
        Cell::Number(value) => Ok(MoneyCents::from_major(*value)?),
        Cell::Text(text) => Ok(text.parse::<MoneyCents>()?),
        other => Err(wrong_kind(ValueType::Decimal, other)),
    }
}

fn parse_date(cell: &Cell, date_system: DateSystem) -> Result<NaiveDate, ValueError> {
    match cell {
        Cell::Number(serial) => date_system
            .from_serial(*serial)
            .ok_or_else(|| ValueError::Invalid(format!("{serial} is not a valid date serial"))),
        Cell::Text(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map_err(|_| ValueError::Invalid(format!("\"{}\" is not a date", text.trim()))),
        other => Err(wrong_kind(ValueType::DateTime, other)),
    }
}

fn parse_boolean(cell: &Cell, _: DateSystem) -> Result<bool, ValueError> {
    match cell {
        Cell::Boolean(value) => Ok(*value),
        Cell::Text(text) if text.trim().eq_ignore_ascii_case("true") => Ok(true),
        Cell::Text(text) if text.trim().eq_ignore_ascii_case("false") => Ok(false),
        other => Err(wrong_kind(ValueType::Boolean, other)),
    }
}

fn parse_label<T: FromStr<Err = RecordError>>(cell: &Cell, date_system: DateSystem) -> Result<T, ValueError> {
    Ok(parse_text(cell, date_system)?.parse::<T>()?)
}

/// Result of converting one logical record.
pub(crate) struct Converted<T> {
    pub(crate) record: T,
    /// Rows read to build the record, parent row included.
    pub(crate) consumed: RowRange,
    /// Problems in child rows that did not prevent the record itself.
    pub(crate) issues: Vec<ImportIssue>,
    /// Name other records use to reference this one.
    pub(crate) name: Option<String>,
    /// Wins the name over records of the same name that are not preferred.
    pub(crate) preferred: bool,
}

impl<T> Converted<T> {
    pub(crate) fn single(record: T, row: usize) -> Self {
        Self {
            record,
            consumed: RowRange::single(row),
            issues: Vec::new(),
            name: None,
            preferred: false,
        }
    }

    #[must_use]
    pub(crate) fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub(crate) fn preferred(mut self, preferred: bool) -> Self {
        self.preferred = preferred;
        self
    }
}

/// Conversion of the rows of one entity kind into its creation record.
pub(crate) trait RowConverter {
    type Record: Default + PartialEq;

    const KIND: EntityKind;

    /// Column every row of this kind fills in. Rows leaving it blank belong
    /// to another kind (or to nothing) and are skipped.
    const KEY_COLUMN: &'static str;

    /// Whether a name may only be used by one record. Records of kinds that
    /// share names are all kept and the name resolves to the first preferred
    /// one.
    const UNIQUE_NAMES: bool = true;

    /// Converts the row under `reader`. Ids are left at their default and
    /// assigned by [`RowConverter::assign_ids`] once the record is accepted.
    fn convert(&self, reader: RowReader<'_>) -> Result<Converted<Self::Record>, Vec<ImportIssue>>;

    /// Assigns the ids of the record and of its nested children, returning
    /// the record id.
    fn assign_ids(&self, record: &mut Self::Record, ids: &IdSequence) -> RecordId;
}

/// Converts the rows in `rows` of `table`.
///
/// Rows with a blank key column are skipped. A converted record consumes its
/// row range; records equal to the kind's empty default are dropped. Named
/// records are registered in `registry` once accepted, a repeated name is an
/// issue for kinds with [`RowConverter::UNIQUE_NAMES`].
pub(crate) fn convert_rows<C: RowConverter>(
    converter: &C,
    table: &Table,
    rows: Range<usize>,
    location: &CellLocation,
    date_system: DateSystem,
    ids: &IdSequence,
    mut registry: Option<&mut NameRegistry>,
) -> (Vec<C::Record>, Vec<ImportIssue>) {
    let mut records = Vec::new();
    let mut issues = Vec::new();
    let Some(key) = table.column_index(C::KEY_COLUMN) else {
        issues.push(ImportIssue::Value {
            location: location.clone().at_column(C::KEY_COLUMN),
            error: ValueError::Invalid(format!("column \"{}\" not found", C::KEY_COLUMN)),
        });
        return (records, issues);
    };

    let end = rows.end.min(table.row_count());
    let mut row = rows.start;
    while row < end {
        if table.cell(row, key).is_blank() {
            row += 1;
            continue;
        }

        let reader = RowReader::new(table, row, location, date_system);
        let converted = match converter.convert(reader) {
            Ok(converted) => converted,
            Err(row_issues) => {
                issues.extend(row_issues);
                row += 1;
                continue;
            }
        };
        issues.extend(converted.issues);
        row = converted.consumed.end().max(row) + 1;

        let mut record = converted.record;
        if record == C::Record::default() {
            tracing::debug!("{}: dropping empty {} row", location.clone().at_row(converted.consumed.start()), C::KIND);
            continue;
        }

        let id = converter.assign_ids(&mut record, ids);
        if let (Some(registry), Some(name)) = (registry.as_deref_mut(), converted.name.as_deref()) {
            if !C::UNIQUE_NAMES {
                registry.register_shared(name, id, converted.preferred);
            } else if let Err(error) = registry.register(name, id) {
                tracing::warn!("{}: {error}", location.clone().at_row(converted.consumed.start()));
                issues.push(ImportIssue::DuplicateName {
                    location: location
                        .clone()
                        .at_column(C::KEY_COLUMN)
                        .at_row(converted.consumed.start()),
                    error,
                });
                continue;
            }
        }
        records.push(record);
    }
    (records, issues)
}
