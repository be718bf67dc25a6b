use std::io::{Cursor, Write};

use chrono::NaiveDate;
use zip::{ZipWriter, write::SimpleFileOptions};

use engine::{Cell, CellKind, DateSystem, Importer, StructuralError, ValueType, Workbook};
use records::MoneyCents;

const MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Clone, Copy)]
enum Value {
    Text(&'static str),
    Number(f64),
    Flag(bool),
    /// Written verbatim as the value of an untyped cell.
    Raw(&'static str),
    Blank,
}

struct TableFixture {
    name: &'static str,
    columns: Vec<&'static str>,
    rows: Vec<Vec<Value>>,
}

fn table(name: &'static str, columns: &[&'static str], rows: Vec<Vec<Value>>) -> TableFixture {
    TableFixture {
        name,
        columns: columns.to_vec(),
        rows,
    }
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn cell_xml(reference: &str, value: Value, shared: &mut Vec<&'static str>) -> String {
    match value {
        Value::Text(text) if text.len() % 2 == 0 => {
            shared.push(text);
            format!(r#"<c r="{reference}" t="s"><v>{}</v></c>"#, shared.len() - 1)
        }
        Value::Text(text) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{text}</t></is></c>"#),
        Value::Number(number) => format!(r#"<c r="{reference}"><v>{number}</v></c>"#),
        Value::Flag(flag) => format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(flag)),
        Value::Raw(raw) => format!(r#"<c r="{reference}"><v>{raw}</v></c>"#),
        Value::Blank => String::new(),
    }
}

/// Builds an `.xlsx` package where every sheet stacks its tables vertically,
/// one blank row apart.
fn build_xlsx(sheets: &[(&str, Vec<TableFixture>)], date1904: bool) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut shared = Vec::new();
    let mut table_id = 0;

    let mut workbook_sheets = String::new();
    let mut workbook_rels = String::new();
    for (index, (name, tables)) in sheets.iter().enumerate() {
        let number = index + 1;
        workbook_sheets.push_str(&format!(r#"<sheet name="{name}" sheetId="{number}" r:id="rId{number}"/>"#));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{number}" Type="{OFFICE_RELATIONSHIPS}/worksheet" Target="worksheets/sheet{number}.xml"/>"#
        ));

        let mut rows = String::new();
        let mut parts = String::new();
        let mut sheet_rels = String::new();
        let mut top = 1;
        for (part, fixture) in tables.iter().enumerate() {
            table_id += 1;
            let mut header = format!(r#"<row r="{top}">"#);
            for (column, name) in fixture.columns.iter().enumerate() {
                let reference = format!("{}{top}", column_letter(column));
                header.push_str(&cell_xml(&reference, Value::Text(*name), &mut shared));
            }
            header.push_str("</row>");
            rows.push_str(&header);
            for (offset, values) in fixture.rows.iter().enumerate() {
                let row = top + 1 + offset;
                rows.push_str(&format!(r#"<row r="{row}">"#));
                for (column, value) in values.iter().enumerate() {
                    let reference = format!("{}{row}", column_letter(column));
                    rows.push_str(&cell_xml(&reference, *value, &mut shared));
                }
                rows.push_str("</row>");
            }
            let bottom = top + fixture.rows.len();
            let last = column_letter(fixture.columns.len() - 1);
            let columns: String = fixture
                .columns
                .iter()
                .enumerate()
                .map(|(id, name)| format!(r#"<tableColumn id="{}" name="{name}"/>"#, id + 1))
                .collect();

            zip.start_file(format!("xl/tables/table{table_id}.xml"), options).unwrap();
            write!(
                zip,
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><table xmlns="{MAIN}" id="{table_id}" name="Table{table_id}" displayName="{}" ref="A{top}:{last}{bottom}"><tableColumns count="{}">{columns}</tableColumns></table>"#,
                fixture.name,
                fixture.columns.len()
            )
            .unwrap();

            let rel = part + 1;
            parts.push_str(&format!(r#"<tablePart r:id="rId{rel}"/>"#));
            sheet_rels.push_str(&format!(
                r#"<Relationship Id="rId{rel}" Type="{OFFICE_RELATIONSHIPS}/table" Target="../tables/table{table_id}.xml"/>"#
            ));
            top = bottom + 2;
        }

        zip.start_file(format!("xl/worksheets/sheet{number}.xml"), options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN}" xmlns:r="{OFFICE_RELATIONSHIPS}"><sheetData>{rows}</sheetData><tableParts count="{}">{parts}</tableParts></worksheet>"#,
            tables.len()
        )
        .unwrap();

        zip.start_file(format!("xl/worksheets/_rels/sheet{number}.xml.rels"), options).unwrap();
        write!(zip, r#"<Relationships xmlns="{RELATIONSHIPS}">{sheet_rels}</Relationships>"#).unwrap();
    }

    zip.start_file("xl/workbook.xml", options).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN}" xmlns:r="{OFFICE_RELATIONSHIPS}"><workbookPr date1904="{}"/><sheets>{workbook_sheets}</sheets></workbook>"#,
        u8::from(date1904)
    )
    .unwrap();

    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    write!(zip, r#"<Relationships xmlns="{RELATIONSHIPS}">{workbook_rels}</Relationships>"#).unwrap();

    let items: String = shared
        .iter()
        .map(|text| format!("<si><t>{text}</t><rPh><t>ignored</t></rPh></si>"))
        .collect();
    zip.start_file("xl/sharedStrings.xml", options).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
        shared.len()
    )
    .unwrap();

    zip.finish().unwrap().into_inner()
}

fn setup_tables() -> Vec<TableFixture> {
    use Value::*;
    vec![
        table(
            "Accounts",
            &["Name", "Type"],
            vec![vec![Text("Checking"), Text("Regular")], vec![Text("Visa"), Text("Credit Card")]],
        ),
        table("Employers", &["Name"], vec![vec![Text("Acme")]]),
    ]
}

fn month_tables(token: &[&'static str; 6]) -> Vec<TableFixture> {
    use Value::*;
    vec![
        table(
            token[0],
            &["Name", "Type", "Amount", "Rollover From Last Month", "Override Rollover Amount"],
            vec![vec![Text("Groceries"), Text("Weekly"), Number(400.0), Blank, Flag(false)]],
        ),
        table(
            token[1],
            &["Account Name", "Starting Balance", "Budget Name", "Budget Type", "Is Default"],
            vec![vec![Text("Checking"), Number(1500.0), Blank, Blank, Flag(true)]],
        ),
        table(
            token[2],
            &[
                "Date",
                "Location",
                "Type",
                "Amount",
                "Credit Card Account",
                "Payoff Date",
                "Description",
                "Budget",
                "Override Account Mapping",
            ],
            vec![
                vec![
                    Number(45_356.0),
                    Text("Market"),
                    Text("Debit"),
                    Number(42.5),
                    Blank,
                    Blank,
                    Text("Weekly shop"),
                    Text("Groceries"),
                    Blank,
                ],
            ],
        ),
        table(
            token[3],
            &[
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
            ],
            Vec::new(),
        ),
        table(
            token[4],
            &[
                "Employer",
                "Salary Income",
                "Additional Taxable Income",
                "Retirement Contribution Amount",
                "Pension Contribution Amount",
                "Pre-Tax Deductions",
                "Tax Withholding Amount",
                "Post-Tax Deductions",
            ],
            Vec::new(),
        ),
        table(token[5], &["Account Name", "Date", "Amount"], Vec::new()),
    ]
}

const MARCH: [&str; 6] = [
    "Budgets.2024.03",
    "AccountMappings.2024.03",
    "Transactions.2024.03",
    "Incomes.2024.03",
    "EmployerIncomeRates.2024.03",
    "AccountBalances.2024.03",
];

#[test]
fn loads_sheets_tables_and_cells() {
    let bytes = build_xlsx(&[("Setup", setup_tables()), ("2024-03", month_tables(&MARCH))], false);
    let workbook = Workbook::from_xlsx(Cursor::new(bytes)).unwrap();

    assert_eq!(workbook.date_system(), DateSystem::V1900);
    let names: Vec<&str> = workbook.sheets().iter().map(|sheet| sheet.name()).collect();
    assert_eq!(names, ["Setup", "2024-03"]);

    let accounts = workbook.sheet("Setup").unwrap().table("Accounts").unwrap();
    assert_eq!(accounts.columns(), ["Name", "Type"]);
    assert_eq!(accounts.row_count(), 2);
    assert_eq!(accounts.value(1, "Type"), Some(&Cell::Text("Credit Card".to_string())));

    let budgets = workbook.sheet("2024-03").unwrap().table("Budgets.2024.03").unwrap();
    assert_eq!(budgets.value(0, "Amount"), Some(&Cell::Number(400.0)));
    assert_eq!(budgets.value(0, "Rollover From Last Month"), Some(&Cell::Blank));
    assert_eq!(budgets.value(0, "Override Rollover Amount"), Some(&Cell::Boolean(false)));

    let balances = workbook.sheet("2024-03").unwrap().table("AccountBalances.2024.03").unwrap();
    assert_eq!(balances.row_count(), 0);
}

#[test]
fn imports_a_packaged_workbook() {
    let bytes = build_xlsx(&[("Setup", setup_tables()), ("2024-03", month_tables(&MARCH))], false);
    let workbook = Workbook::from_xlsx(Cursor::new(bytes)).unwrap();
    let conversion = Importer::builder().build().unwrap().import(&workbook).unwrap();
    assert!(conversion.is_clean(), "{:?}", conversion.issues);

    let transaction = &conversion.months[0].transactions[0];
    assert_eq!(transaction.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    assert_eq!(transaction.amount, MoneyCents::new(4_250));
    assert_eq!(transaction.applications[0].description, "Weekly shop");
}

#[test]
fn honours_the_1904_date_system() {
    let bytes = build_xlsx(&[("Setup", setup_tables()), ("2024-03", month_tables(&MARCH))], true);
    let workbook = Workbook::from_xlsx(Cursor::new(bytes)).unwrap();
    assert_eq!(workbook.date_system(), DateSystem::V1904);

    let conversion = Importer::builder().build().unwrap().convert(&workbook);
    let transaction = &conversion.months[0].transactions[0];
    assert_eq!(transaction.date, NaiveDate::from_ymd_opt(2028, 3, 6).unwrap());
}

#[test]
fn rejects_a_package_without_workbook_part() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("docProps/app.xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"<Properties/>").unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    assert!(Workbook::from_xlsx(Cursor::new(bytes)).is_err());
}

#[test]
fn unreadable_values_become_error_cells() {
    use Value::*;
    let setup = vec![
        table(
            "Accounts",
            &["Name", "Type"],
            vec![
                vec![Text("Checking"), Text("Regular"), Raw("")],
                vec![Text("Visa"), Text("Credit Card"), Raw("n/a")],
            ],
        ),
        table("Employers", &["Name"], vec![vec![Raw("#ref")]]),
    ];
    let bytes = build_xlsx(&[("Setup", setup), ("2024-03", month_tables(&MARCH))], false);
    let workbook = Workbook::from_xlsx(Cursor::new(bytes)).unwrap();

    let accounts = workbook.sheet("Setup").unwrap().table("Accounts").unwrap();
    assert_eq!(accounts.columns(), ["Name", "Type"]);
    let employers = workbook.sheet("Setup").unwrap().table("Employers").unwrap();
    assert_eq!(employers.cell(0, 0).kind(), CellKind::Error);

    let errors = Importer::builder().build().unwrap().validate(&workbook);
    assert_eq!(
        errors,
        vec![StructuralError::WrongCellKind {
            sheet: "Setup".to_string(),
            table: "Employers".to_string(),
            column: "Name".to_string(),
            row: 0,
            expected: ValueType::String,
            found: CellKind::Error,
        }]
    );
}
