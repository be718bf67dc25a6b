//! Conversion of a validated workbook into creation records.
//!
//! The Setup sheet is converted first and its name registries are then shared
//! read-only by every monthly sheet. Monthly sheets are independent of each
//! other and are converted in parallel; inside a sheet the tables follow their
//! reference dependencies: budgets, account mappings, transactions, incomes,
//! employer income rates and finally account balances.
use std::collections::HashSet;

use rayon::prelude::*;
use records::{
    account::AccountCreate,
    income::EmployerCreate,
    month::MonthCreate,
};
use serde::Serialize;

use crate::{
    CellLocation, IdSequence, ImportIssue, StructuralError,
    registry::NameRegistry,
    schema::{EntityKind, SchemaRegistry},
    sheet::{SETUP_SHEET_NAME, SheetClass, YearMonth, classify, expand},
    workbook::{DateSystem, Table, Workbook, Worksheet},
};

use self::{
    balance::AccountBalanceConverter,
    budget::{AccountMappingConverter, BudgetConverter},
    income::{EmployerIncomeRateConverter, IncomeConverter},
    row::{RowConverter, convert_rows},
    setup::{AccountConverter, EmployerConverter},
    transaction::{ApplicationConverter, TransactionConverter},
};

mod balance;
mod budget;
mod income;
mod row;
mod setup;
mod transaction;

/// Everything produced by one conversion run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub accounts: Vec<AccountCreate>,
    pub employers: Vec<EmployerCreate>,
    pub months: Vec<MonthCreate>,
    #[serde(skip)]
    pub issues: Vec<ImportIssue>,
}

impl Conversion {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// One sheet being converted.
struct SheetContext<'a> {
    sheet: &'a Worksheet,
    class: SheetClass,
    schema: &'a SchemaRegistry,
    date_system: DateSystem,
    ids: &'a IdSequence,
}

impl<'a> SheetContext<'a> {
    fn table(&self, kind: EntityKind) -> Result<&'a Table, ImportIssue> {
        let name = self
            .schema
            .table_for(kind, None)
            .map(|table| expand(&table.name_template, self.class))
            .unwrap_or_else(|| kind.to_string());
        self.sheet.table(&name).ok_or_else(|| {
            StructuralError::MissingTable {
                sheet: self.sheet.name().to_string(),
                table: name,
            }
            .into()
        })
    }

    /// Converts every row of the table hosting `C::KIND` in this sheet.
    fn convert_table<C: RowConverter>(
        &self,
        converter: &C,
        registry: Option<&mut NameRegistry>,
        issues: &mut Vec<ImportIssue>,
    ) -> Vec<C::Record> {
        let table = match self.table(C::KIND) {
            Ok(table) => table,
            Err(issue) => {
                issues.push(issue);
                return Vec::new();
            }
        };
        let location = CellLocation::table(self.sheet.name(), table.name());
        let (records, table_issues) = convert_rows(
            converter,
            table,
            0..table.row_count(),
            &location,
            self.date_system,
            self.ids,
            registry,
        );
        issues.extend(table_issues);
        records
    }
}

/// Registries of the Setup sheet, shared by every month.
struct SetupRegistries {
    accounts: NameRegistry,
    employers: NameRegistry,
}

/// Converts `workbook` into creation records, drawing ids from `ids`.
///
/// Problems are collected in [`Conversion::issues`]; a failing row never
/// stops its siblings.
pub fn convert(workbook: &Workbook, schema: &SchemaRegistry, ids: &IdSequence, parallel: bool) -> Conversion {
    let mut conversion = Conversion::default();
    let date_system = workbook.date_system();

    let Some(setup) = workbook
        .sheets()
        .iter()
        .find(|sheet| classify(sheet.name()) == SheetClass::Setup)
    else {
        conversion.issues.push(
            StructuralError::SetupSheetCount {
                expected: SETUP_SHEET_NAME,
                found: 0,
            }
            .into(),
        );
        return conversion;
    };

    let context = SheetContext {
        sheet: setup,
        class: SheetClass::Setup,
        schema,
        date_system,
        ids,
    };
    let mut registries = SetupRegistries {
        accounts: NameRegistry::new(EntityKind::Account),
        employers: NameRegistry::new(EntityKind::Employer),
    };
    conversion.accounts = context.convert_table(
        &AccountConverter,
        Some(&mut registries.accounts),
        &mut conversion.issues,
    );
    conversion.employers = context.convert_table(
        &EmployerConverter,
        Some(&mut registries.employers),
        &mut conversion.issues,
    );
    tracing::info!(
        "converted setup: {} account(s), {} employer(s)",
        conversion.accounts.len(),
        conversion.employers.len()
    );

    let mut seen = HashSet::new();
    let mut months = Vec::new();
    for sheet in workbook.sheets() {
        if let SheetClass::Monthly(year_month) = classify(sheet.name()) {
            if seen.insert(year_month) {
                months.push((sheet, year_month));
            } else {
                tracing::warn!("skipping duplicate sheet \"{}\"", sheet.name());
            }
        }
    }

    let month = |(sheet, year_month): &(&Worksheet, YearMonth)| {
        let context = SheetContext {
            sheet: *sheet,
            class: SheetClass::Monthly(*year_month),
            schema,
            date_system,
            ids,
        };
        convert_month(&context, *year_month, &registries)
    };
    let converted: Vec<(MonthCreate, Vec<ImportIssue>)> = if parallel {
        months.par_iter().map(month).collect()
    } else {
        months.iter().map(month).collect()
    };

    for (month, issues) in converted {
        conversion.months.push(month);
        conversion.issues.extend(issues);
    }
    conversion
}

fn convert_month(
    context: &SheetContext<'_>,
    year_month: YearMonth,
    setup: &SetupRegistries,
) -> (MonthCreate, Vec<ImportIssue>) {
    let mut issues = Vec::new();
    let mut month = MonthCreate {
        id: context.ids.next_id(),
        year: year_month.year(),
        month_number: year_month.month(),
        ..MonthCreate::default()
    };

    let mut budgets = NameRegistry::new(EntityKind::Budget);
    month.budgets = context.convert_table(&BudgetConverter, Some(&mut budgets), &mut issues);

    let mut account_mappings = NameRegistry::new(EntityKind::AccountMapping);
    month.account_mappings = context.convert_table(
        &AccountMappingConverter {
            accounts: &setup.accounts,
            budgets: &budgets,
        },
        Some(&mut account_mappings),
        &mut issues,
    );

    month.transactions = context.convert_table(
        &TransactionConverter {
            accounts: &setup.accounts,
            applications: ApplicationConverter {
                budgets: &budgets,
                account_mappings: &account_mappings,
            },
            ids: context.ids,
        },
        None,
        &mut issues,
    );

    month.incomes = context.convert_table(
        &IncomeConverter {
            employers: &setup.employers,
            accounts: &setup.accounts,
        },
        None,
        &mut issues,
    );

    month.employer_income_rates = context.convert_table(
        &EmployerIncomeRateConverter {
            employers: &setup.employers,
        },
        None,
        &mut issues,
    );

    month.account_balances = context.convert_table(
        &AccountBalanceConverter {
            accounts: &setup.accounts,
        },
        None,
        &mut issues,
    );

    tracing::info!(
        "converted {year_month}: {} budget(s), {} transaction(s), {} income(s), {} issue(s)",
        month.budgets.len(),
        month.transactions.len(),
        month.incomes.len(),
        issues.len()
    );
    (month, issues)
}
