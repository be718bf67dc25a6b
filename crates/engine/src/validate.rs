//! Structural validation of a workbook against the schema registry.
//!
//! Nothing here stops at the first problem: every sheet, table, column and
//! cell is checked and all violations are returned together. Sheets, and the
//! tables of each sheet, are checked in parallel; results keep workbook
//! order.
use std::collections::HashSet;

use rayon::prelude::*;

use crate::{
    StructuralError,
    schema::{SchemaRegistry, TableSchema},
    sheet::{SETUP_SHEET_NAME, SheetClass, classify, expand},
    workbook::{CellKind, Workbook, Worksheet},
};

/// Checks `workbook` against `schema` and returns every violation found.
pub fn validate(workbook: &Workbook, schema: &SchemaRegistry, parallel: bool) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    let sheets = workbook.sheets();

    if sheets.len() < 2 {
        errors.push(StructuralError::TooFewSheets { found: sheets.len() });
    }

    let setup_sheets = sheets
        .iter()
        .filter(|sheet| classify(sheet.name()) == SheetClass::Setup)
        .count();
    if setup_sheets != 1 {
        errors.push(StructuralError::SetupSheetCount {
            expected: SETUP_SHEET_NAME,
            found: setup_sheets,
        });
        tracing::warn!("workbook has {setup_sheets} setup sheet(s), skipping sheet checks");
        return errors;
    }

    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for sheet in sheets {
        if !seen.insert(sheet.name()) {
            errors.push(StructuralError::DuplicateSheet {
                sheet: sheet.name().to_string(),
            });
            continue;
        }
        match classify(sheet.name()) {
            SheetClass::Invalid => errors.push(StructuralError::InvalidSheetName {
                sheet: sheet.name().to_string(),
            }),
            class => targets.push((sheet, class)),
        }
    }

    errors.extend(collect_each(&targets, parallel, |(sheet, class)| {
        validate_sheet(sheet, *class, schema, parallel)
    }));

    tracing::info!(
        "validated {} sheet(s), found {} structural error(s)",
        targets.len(),
        errors.len()
    );
    errors
}

fn validate_sheet(
    sheet: &Worksheet,
    class: SheetClass,
    schema: &SchemaRegistry,
    parallel: bool,
) -> Vec<StructuralError> {
    let Some(scope) = class.scope() else {
        return Vec::new();
    };
    let required: Vec<&TableSchema> = schema.tables_in_scope(scope).collect();
    tracing::debug!(
        "checking sheet \"{}\" against {} table(s)",
        sheet.name(),
        required.len()
    );

    let mut errors = collect_each(&required, parallel, |table| {
        validate_table(sheet, class, table)
    });

    let expected: HashSet<String> = required
        .iter()
        .map(|table| expand(&table.name_template, class))
        .collect();
    errors.extend(
        sheet
            .tables()
            .iter()
            .filter(|table| !expected.contains(table.name()))
            .map(|table| StructuralError::UnexpectedTable {
                sheet: sheet.name().to_string(),
                table: table.name().to_string(),
            }),
    );
    errors
}

fn validate_table(sheet: &Worksheet, class: SheetClass, schema: &TableSchema) -> Vec<StructuralError> {
    let name = expand(&schema.name_template, class);
    let Some(table) = sheet.table(&name) else {
        return vec![StructuralError::MissingTable {
            sheet: sheet.name().to_string(),
            table: name,
        }];
    };

    let mut errors = Vec::new();
    for column in schema.columns() {
        let Some(index) = table.column_index(&column.name) else {
            errors.push(StructuralError::MissingColumn {
                sheet: sheet.name().to_string(),
                table: name.clone(),
                column: column.name.clone(),
            });
            continue;
        };

        let expected = column.value_type.cell_kind();
        for row in 0..table.row_count() {
            match table.cell(row, index).kind() {
                CellKind::Blank if !column.blank_allowed => {
                    errors.push(StructuralError::IllegalBlank {
                        sheet: sheet.name().to_string(),
                        table: name.clone(),
                        column: column.name.clone(),
                        row,
                    });
                }
                CellKind::Blank => {}
                found if found != expected => {
                    errors.push(StructuralError::WrongCellKind {
                        sheet: sheet.name().to_string(),
                        table: name.clone(),
                        column: column.name.clone(),
                        row,
                        expected: column.value_type,
                        found,
                    });
                }
                _ => {}
            }
        }
    }
    errors
}

/// Runs `check` on every item, in parallel when asked, and concatenates the
/// results in item order.
fn collect_each<T, F>(items: &[T], parallel: bool, check: F) -> Vec<StructuralError>
where
    T: Sync,
    F: Fn(&T) -> Vec<StructuralError> + Sync + Send,
{
    let nested: Vec<Vec<StructuralError>> = if parallel {
        items.par_iter().map(&check).collect()
    } else {
        items.iter().map(&check).collect()
    };
    nested.into_iter().flatten().collect()
}
