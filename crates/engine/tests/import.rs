use chrono::NaiveDate;

use engine::{
    Cell, CellLocation, EntityKind, ImportError, ImportIssue, Importer, ReferenceResolutionError,
    StructuralError, Table, Workbook, Worksheet,
};
use records::{AccountType, BudgetType, MoneyCents, RecordId};

const TRANSACTION_COLUMNS: [&str; 9] = [
    "Date",
    "Location",
    "Type",
    "Amount",
    "Credit Card Account",
    "Payoff Date",
    "Description",
    "Budget",
    "Override Account Mapping",
];

const INCOME_COLUMNS: [&str; 12] = [
    "Employer",
    "Date",
    "Amount",
    "Description",
    "Account",
    "Salary Income",
    "Additional Taxable Income",
    "Retirement Contribution Amount",
    "Pension Contribution Amount",
    "Pre-Tax Deductions",
    "Tax Withholding Amount",
    "Post-Tax Deductions",
];

const RATE_COLUMNS: [&str; 8] = [
    "Employer",
    "Salary Income",
    "Additional Taxable Income",
    "Retirement Contribution Amount",
    "Pension Contribution Amount",
    "Pre-Tax Deductions",
    "Tax Withholding Amount",
    "Post-Tax Deductions",
];

fn date(year: i32, month: u32, day: u32) -> Cell {
    Cell::from(NaiveDate::from_ymd_opt(year, month, day).unwrap())
}

fn setup() -> Worksheet {
    Worksheet::new("Setup")
        .with_table(
            Table::new("Accounts", ["Name", "Type"])
                .with_row(["Checking", "Regular"])
                .with_row(["Visa", "Credit Card"]),
        )
        .with_table(Table::new("Employers", ["Name"]).with_row(["Acme"]))
}

fn march() -> Worksheet {
    Worksheet::new("2024-03")
        .with_table(
            Table::new(
                "Budgets.2024.03",
                ["Name", "Type", "Amount", "Rollover From Last Month", "Override Rollover Amount"],
            )
            .with_row([
                Cell::from("Groceries"),
                Cell::from("Weekly"),
                Cell::from(400.0),
                Cell::from(25.5),
                Cell::from(false),
            ]),
        )
        .with_table(
            Table::new(
                "AccountMappings.2024.03",
                ["Account Name", "Starting Balance", "Budget Name", "Budget Type", "Is Default"],
            )
            .with_row([
                Cell::from("Checking"),
                Cell::from(1500.0),
                Cell::from("Groceries"),
                Cell::from("Weekly"),
                Cell::from(true),
            ]),
        )
        .with_table(
            Table::new("Transactions.2024.03", TRANSACTION_COLUMNS)
                .with_row([
                    date(2024, 3, 2),
                    Cell::from("Market"),
                    Cell::from("Debit"),
                    Cell::from(42.5),
                    Cell::Blank,
                    Cell::Blank,
                    Cell::from("Weekly shop"),
                    Cell::from("Groceries"),
                    Cell::Blank,
                ])
                .with_row([
                    date(2024, 3, 9),
                    Cell::from("Mall"),
                    Cell::from("Debit"),
                    Cell::from(90.0),
                    Cell::from("Visa"),
                    date(2024, 4, 1),
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                ])
                .with_row([
                    Cell::Blank,
                    Cell::Blank,
                    Cell::from("Debit"),
                    Cell::from(60.0),
                    Cell::Blank,
                    Cell::Blank,
                    Cell::from("Food"),
                    Cell::from("Groceries"),
                    Cell::Blank,
                ])
                .with_row([
                    Cell::Blank,
                    Cell::Blank,
                    Cell::from("Debit"),
                    Cell::from(30.0),
                    Cell::Blank,
                    Cell::Blank,
                    Cell::from("Shoes"),
                    Cell::Blank,
                    Cell::Blank,
                ]),
        )
        .with_table(
            Table::new("Incomes.2024.03", INCOME_COLUMNS)
                .with_row([
                    Cell::from("Acme"),
                    date(2024, 3, 15),
                    Cell::from(2000.0),
                    Cell::from("Paycheck"),
                    Cell::Blank,
                    Cell::from(2800.0),
                    Cell::from(0.0),
                    Cell::from(150.0),
                    Cell::from(0.0),
                    Cell::from(100.0),
                    Cell::from(500.0),
                    Cell::from(50.0),
                ])
                .with_row([
                    Cell::from("Acme"),
                    date(2024, 3, 20),
                    Cell::from(75.0),
                    Cell::from("Refund"),
                    Cell::from("Checking"),
                    Cell::from(0.0),
                    Cell::from(0.0),
                    Cell::from(0.0),
                    Cell::from(0.0),
                    Cell::from(0.0),
                    Cell::from(0.0),
                    Cell::from(0.0),
                ]),
        )
        .with_table(Table::new("EmployerIncomeRates.2024.03", RATE_COLUMNS).with_row([
            Cell::from("Acme"),
            Cell::from(2800.0),
            Cell::from(0.0),
            Cell::from(0.0),
            Cell::from(0.0),
            Cell::from(0.0),
            Cell::from(0.0),
            Cell::from(0.0),
        ]))
        .with_table(
            Table::new("AccountBalances.2024.03", ["Account Name", "Date", "Amount"]).with_row([
                Cell::from("Checking"),
                date(2024, 3, 31),
                Cell::from(1367.5),
            ]),
        )
}

fn importer() -> Importer {
    Importer::builder().build().unwrap()
}

#[test]
fn imports_a_complete_workbook() {
    let workbook = Workbook::builder().sheet(setup()).sheet(march()).build();
    let conversion = importer().import(&workbook).unwrap();
    assert!(conversion.is_clean(), "{:?}", conversion.issues);

    assert_eq!(conversion.accounts.len(), 2);
    assert_eq!(conversion.accounts[1].kind, AccountType::CreditCard);
    let checking = conversion.accounts[0].id;
    let visa = conversion.accounts[1].id;
    let acme = conversion.employers[0].id;

    let month = &conversion.months[0];
    assert_eq!((month.year, month.month_number), (2024, 3));

    let groceries = &month.budgets[0];
    assert_eq!(groceries.kind, BudgetType::Weekly);
    assert_eq!(groceries.amount, MoneyCents::new(40_000));
    assert_eq!(groceries.rollover_amount, Some(MoneyCents::new(2_550)));
    assert_eq!(groceries.is_rollover_amount_overridden, Some(false));

    let mapping = &month.account_mappings[0];
    assert_eq!(mapping.account_id, checking);
    assert_eq!(mapping.budget_id, Some(groceries.id));
    assert!(mapping.is_default);

    assert_eq!(month.transactions.len(), 2);
    let shop = &month.transactions[0];
    assert_eq!(shop.applications.len(), 1);
    assert_eq!(shop.applications[0].budget_id, Some(groceries.id));

    let mall = &month.transactions[1];
    assert_eq!(mall.credit_card_account_id, Some(visa));
    assert_eq!(mall.paid_off_date, NaiveDate::from_ymd_opt(2024, 4, 1));
    assert_eq!(mall.applications.len(), 2);
    assert_eq!(mall.applications[1].budget_id, None);

    let paycheck = &month.incomes[0];
    assert_eq!(paycheck.employer_id, acme);
    let information = paycheck.income_information.as_ref().unwrap();
    assert_eq!(information.tax_withholding_amount, MoneyCents::new(50_000));
    let refund = &month.incomes[1];
    assert_eq!(refund.override_account_id, Some(checking));
    assert_eq!(refund.income_information, None);

    assert_eq!(month.employer_income_rates[0].employer_id, acme);
    assert_eq!(
        month.employer_income_rates[0].income_information.salary_income,
        MoneyCents::new(280_000)
    );
    assert_eq!(month.account_balances[0].amount, MoneyCents::new(136_750));
}

#[test]
fn every_id_is_distinct() {
    let workbook = Workbook::builder().sheet(setup()).sheet(march()).build();
    let conversion = importer().import(&workbook).unwrap();
    let month = &conversion.months[0];

    let mut ids: Vec<RecordId> = conversion
        .accounts
        .iter()
        .map(|account| account.id)
        .chain(conversion.employers.iter().map(|employer| employer.id))
        .chain([month.id])
        .chain(month.budgets.iter().map(|budget| budget.id))
        .chain(month.account_mappings.iter().map(|mapping| mapping.id))
        .chain(month.transactions.iter().flat_map(|transaction| {
            std::iter::once(transaction.id).chain(transaction.applications.iter().map(|a| a.id))
        }))
        .chain(month.incomes.iter().map(|income| income.id))
        .chain(month.account_balances.iter().map(|balance| balance.id))
        .collect();
    let count = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), count);
    assert!(ids.iter().all(|id| id.is_surrogate()));
}

#[test]
fn two_setup_sheets_stop_the_import() {
    let workbook = Workbook::builder().sheet(setup()).sheet(setup()).sheet(march()).build();
    let error = importer().import(&workbook).unwrap_err();
    assert_eq!(
        error,
        ImportError::Structural(vec![StructuralError::SetupSheetCount {
            expected: "Setup",
            found: 2,
        }])
    );
}

#[test]
fn missing_column_is_reported_once_per_sheet() {
    let april = Worksheet::new("2024-04")
        .with_table(Table::new("Budgets.2024.04", ["Name", "Type", "Amount"]))
        .with_table(Table::new(
            "AccountMappings.2024.04",
            ["Account Name", "Starting Balance", "Budget Name", "Budget Type", "Is Default"],
        ))
        .with_table(Table::new("Transactions.2024.04", TRANSACTION_COLUMNS))
        .with_table(Table::new("Incomes.2024.04", INCOME_COLUMNS))
        .with_table(Table::new("EmployerIncomeRates.2024.04", RATE_COLUMNS))
        .with_table(Table::new("AccountBalances.2024.04", ["Account Name", "Date", "Amount"]));
    let workbook = Workbook::builder().sheet(setup()).sheet(april).build();

    let errors = importer().validate(&workbook);
    assert_eq!(
        errors,
        vec![
            StructuralError::MissingColumn {
                sheet: "2024-04".to_string(),
                table: "Budgets.2024.04".to_string(),
                column: "Override Rollover Amount".to_string(),
            },
            StructuralError::MissingColumn {
                sheet: "2024-04".to_string(),
                table: "Budgets.2024.04".to_string(),
                column: "Rollover From Last Month".to_string(),
            },
        ]
    );
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let mut builder = Workbook::builder().sheet(setup()).sheet(march());
    for month in ["2024-01", "2024-02"] {
        builder = builder.sheet(Worksheet::new(month));
    }
    let workbook = builder.build();

    let parallel = Importer::builder().threads(2).build().unwrap();
    let sequential = Importer::builder().parallel(false).build().unwrap();
    assert_eq!(parallel.validate(&workbook), sequential.validate(&workbook));
    assert_eq!(parallel.validate(&workbook).len(), 12);
}

#[test]
fn unknown_reference_keeps_sibling_rows() {
    let sheet = Worksheet::new("2024-05").with_table(
        Table::new("AccountBalances.2024.05", ["Account Name", "Date", "Amount"])
            .with_row([Cell::from("Savings"), date(2024, 5, 31), Cell::from(10.0)])
            .with_row([Cell::from("Checking"), date(2024, 5, 31), Cell::from(20.0)]),
    );
    let workbook = Workbook::builder().sheet(setup()).sheet(sheet).build();
    let conversion = importer().convert(&workbook);

    let month = &conversion.months[0];
    assert_eq!(month.account_balances.len(), 1);
    assert_eq!(month.account_balances[0].account_id, conversion.accounts[0].id);
    assert!(conversion.issues.contains(&ImportIssue::Reference {
        location: CellLocation::table("2024-05", "AccountBalances.2024.05")
            .at_row(0)
            .at_column("Account Name"),
        error: ReferenceResolutionError {
            kind: EntityKind::Account,
            name: "Savings".to_string(),
        },
    }));
}

#[test]
fn record_tree_serializes_with_labels_and_cents() {
    let workbook = Workbook::builder().sheet(setup()).sheet(march()).build();
    let conversion = importer().import(&workbook).unwrap();
    let json = serde_json::to_value(&conversion).unwrap();

    assert_eq!(json["accounts"][1]["type"], "CreditCard");
    assert_eq!(json["months"][0]["month_number"], 3);
    assert_eq!(json["months"][0]["budgets"][0]["amount"], 40_000);
    assert_eq!(json["months"][0]["transactions"][0]["date"], "2024-03-02");
    assert!(json.get("issues").is_none());
}
