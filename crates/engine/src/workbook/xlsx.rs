//! `.xlsx` loader.
//!
//! Reads the sheet list and date system from `xl/workbook.xml`, the shared
//! string table, every worksheet's cells and the table parts attached to each
//! worksheet. Cells are materialised into the data rows of their tables; cells
//! outside any table are ignored. A value that cannot be read becomes an error
//! cell.
use std::{
    collections::HashMap,
    io::{BufRead, Read, Seek},
};

use chrono::NaiveDate;
use quick_xml::{events::Event, name::QName};
use zip::ZipArchive;

use super::{
    Cell, DateSystem, Table, Workbook, Worksheet,
    xml::{
        XmlReader, ZipHelper, attribute, folder_of, match_xml_events, push_reference,
        relationships_path, resolve_target,
    },
};
use crate::{ImportError, ResultImport};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

const RELATIONSHIP_WORKSHEET: &str = "/worksheet";
const RELATIONSHIP_TABLE: &str = "/table";

const TAG_SHEET: QName = QName(b"sheet");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_VALUE: QName = QName(b"v");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_TABLE_PART: QName = QName(b"tablePart");
const TAG_TABLE: QName = QName(b"table");
const TAG_TABLE_COLUMN: QName = QName(b"tableColumn");

type CellMap = HashMap<(usize, usize), Cell>;

pub(super) fn load<R: Read + Seek>(reader: R) -> ResultImport<Workbook> {
    let mut zip = ZipArchive::new(reader)?;
    let (entries, date_system) = load_workbook(&mut zip)?;
    let shared_strings = load_shared_strings(&mut zip)?;

    let mut sheets = Vec::with_capacity(entries.len());
    for (name, path) in entries {
        let cells = load_cells(&mut zip, &name, &path, &shared_strings, date_system)?;
        let mut sheet = Worksheet::new(&name);
        for table_path in load_table_parts(&mut zip, &path)? {
            sheet.tables.push(load_table(&mut zip, &table_path, &cells)?);
        }
        tracing::debug!("sheet \"{name}\": {} table(s)", sheet.tables.len());
        sheets.push(sheet);
    }

    Ok(Workbook {
        sheets,
        date_system,
    })
}

/// Relationship ids of `part` whose type ends with `kind`, mapped to the
/// package path of their target.
fn load_relationships<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    part: &str,
    kind: &str,
) -> ResultImport<HashMap<String, String>> {
    let mut relationships = HashMap::new();
    let Some(mut reader) = zip.xml_reader(&relationships_path(part))? else {
        return Ok(relationships);
    };
    let folder = folder_of(part);
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == b"Relationship" => {
            let id = attribute(&event, "Id")?;
            let target = attribute(&event, "Target")?;
            let matches = attribute(&event, "Type")?.is_some_and(|value| value.ends_with(kind));
            if let (true, Some(id), Some(target)) = (matches, id, target) {
                relationships.insert(id.into_owned(), resolve_target(folder, &target));
            }
        }
    });
    Ok(relationships)
}

/// Sheet names with their part paths, in workbook order, plus the date system.
fn load_workbook<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
) -> ResultImport<(Vec<(String, String)>, DateSystem)> {
    let relationships = load_relationships(zip, WORKBOOK_PART, RELATIONSHIP_WORKSHEET)?;
    let mut reader = zip
        .xml_reader(WORKBOOK_PART)?
        .ok_or_else(|| ImportError::Workbook(format!("{WORKBOOK_PART} not found")))?;

    let mut sheets = Vec::new();
    let mut date_system = DateSystem::V1900;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None;
            let mut id = None;
            for result in event.attributes() {
                let attribute = result?;
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?.into_owned()),
                    b"id" => id = Some(attribute.unescape_value()?.into_owned()),
                    _ => {}
                }
            }
            let (Some(name), Some(id)) = (name, id) else {
                return Err(ImportError::Workbook("sheet without name or id".to_string()));
            };
            let path = relationships.get(&id).ok_or_else(|| {
                ImportError::Workbook(format!("sheet \"{name}\" points to missing part {id}"))
            })?;
            sheets.push((name, path.clone()));
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            let is_1904 = attribute(&event, "date1904")?
                .is_some_and(|value| value == "1" || value == "true");
            if is_1904 {
                date_system = DateSystem::V1904;
            }
        }
    });
    Ok((sheets, date_system))
}

fn load_shared_strings<R: Read + Seek>(zip: &mut ZipArchive<R>) -> ResultImport<Vec<String>> {
    let mut strings = Vec::new();
    let Some(mut reader) = zip.xml_reader(SHARED_STRINGS_PART)? else {
        return Ok(strings);
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            strings.push(read_text(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(strings)
}

/// Text content up to `end`, skipping phonetic runs.
fn read_text<R: BufRead>(reader: &mut XmlReader<R>, end: QName, is_text_content: bool) -> ResultImport<String> {
    let mut is_phonetic = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic = false,
        Event::Start(event) if !is_phonetic && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => push_reference(&mut text, &event)?,
    });
    Ok(text)
}

fn load_cells<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    sheet: &str,
    part: &str,
    shared_strings: &[String],
    date_system: DateSystem,
) -> ResultImport<CellMap> {
    let mut reader = zip
        .xml_reader(part)?
        .ok_or_else(|| ImportError::Workbook(format!("{part} not found")))?;

    let mut cells = CellMap::new();
    let mut row = 0usize;
    let mut next_row = 0usize;
    let mut next_column = 0usize;
    let mut position = (0usize, 0usize);
    let mut kind = String::new();
    let mut value: Option<String> = None;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            row = attribute(&event, "r")?
                .and_then(|r| r.parse::<usize>().ok())
                .and_then(|r| r.checked_sub(1))
                .unwrap_or(next_row);
            next_row = row + 1;
            next_column = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            position = attribute(&event, "r")?
                .and_then(|reference| parse_reference(&reference))
                .unwrap_or((row, next_column));
            next_column = position.1 + 1;
            kind = attribute(&event, "t")?.map(|t| t.into_owned()).unwrap_or_default();
            value = None;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = Some(read_text(&mut reader, TAG_VALUE, true)?);
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = Some(read_text(&mut reader, TAG_INLINE_STRING, false)?);
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if let Some(raw) = value.take() {
                let cell = to_cell(&kind, raw, shared_strings, date_system).unwrap_or_else(|message| {
                    tracing::debug!("sheet \"{sheet}\" cell {}: {message}", to_reference(position.0, position.1));
                    Cell::Error(message)
                });
                cells.insert(position, cell);
            }
        }
    });
    Ok(cells)
}

fn to_cell(kind: &str, raw: String, shared_strings: &[String], date_system: DateSystem) -> Result<Cell, String> {
    match kind {
        "s" => {
            let index = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("\"{raw}\" is not a shared string index"))?;
            shared_strings
                .get(index)
                .map(|text| Cell::Text(text.clone()))
                .ok_or_else(|| format!("shared string {index} does not exist"))
        }
        "inlineStr" | "str" => Ok(Cell::Text(raw)),
        "b" => Ok(Cell::Boolean(matches!(raw.trim(), "1" | "true"))),
        "e" => Ok(Cell::Error(raw)),
        "d" => Ok(raw
            .get(..10)
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
            .map(|date| Cell::Number(date_system.to_serial(date)))
            .unwrap_or(Cell::Error(raw))),
        _ => raw
            .trim()
            .parse::<f64>()
            .map(Cell::Number)
            .map_err(|_| format!("\"{raw}\" is not a number")),
    }
}

/// Part paths of the tables attached to a worksheet.
fn load_table_parts<R: Read + Seek>(zip: &mut ZipArchive<R>, part: &str) -> ResultImport<Vec<String>> {
    let relationships = load_relationships(zip, part, RELATIONSHIP_TABLE)?;
    let Some(mut reader) = zip.xml_reader(part)? else {
        return Ok(Vec::new());
    };
    let mut tables = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_TABLE_PART => {
            for result in event.attributes() {
                let attribute = result?;
                if attribute.key.local_name().as_ref() == b"id" {
                    let id = attribute.unescape_value()?;
                    let path = relationships.get(id.as_ref()).ok_or_else(|| {
                        ImportError::Workbook(format!("{part} points to missing table part {id}"))
                    })?;
                    tables.push(path.clone());
                }
            }
        }
    });
    Ok(tables)
}

fn load_table<R: Read + Seek>(zip: &mut ZipArchive<R>, part: &str, cells: &CellMap) -> ResultImport<Table> {
    let mut reader = zip
        .xml_reader(part)?
        .ok_or_else(|| ImportError::Workbook(format!("{part} not found")))?;

    let mut name = None;
    let mut range = None;
    let mut header_rows = 1usize;
    let mut totals_rows = 0usize;
    let mut columns = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_TABLE => {
            name = match attribute(&event, "displayName")? {
                Some(display) => Some(display.into_owned()),
                None => attribute(&event, "name")?.map(|value| value.into_owned()),
            };
            range = attribute(&event, "ref")?.and_then(|value| parse_range(&value));
            header_rows = parse_count(attribute(&event, "headerRowCount")?.as_deref(), 1);
            totals_rows = parse_count(attribute(&event, "totalsRowCount")?.as_deref(), 0);
        }
        Event::Start(event) if event.name() == TAG_TABLE_COLUMN => {
            columns.push(attribute(&event, "name")?.map(|value| value.into_owned()).unwrap_or_default());
        }
    });

    let name = name.ok_or_else(|| ImportError::Workbook(format!("{part} has no table name")))?;
    let ((first_row, first_column), (last_row, _)) =
        range.ok_or_else(|| ImportError::Workbook(format!("table \"{name}\" has no valid range")))?;

    let mut table = Table::new(&name, columns);
    let data_start = first_row + header_rows;
    let data_end = (last_row + 1).saturating_sub(totals_rows);
    for row in data_start..data_end {
        let cells = (0..table.columns.len())
            .map(|offset| cells.get(&(row, first_column + offset)).cloned().unwrap_or_default())
            .collect();
        table.push_row(cells);
    }
    Ok(table)
}

fn parse_count(value: Option<&str>, default: usize) -> usize {
    value.and_then(|value| value.trim().parse().ok()).unwrap_or(default)
}

/// `A1:C10` into 0-based `((row, column), (row, column))`.
fn parse_range(value: &str) -> Option<((usize, usize), (usize, usize))> {
    let (start, end) = value.split_once(':').unwrap_or((value, value));
    Some((parse_reference(start)?, parse_reference(end)?))
}

/// `B12` into 0-based `(11, 1)`. Absolute markers (`$B$12`) are accepted.
fn parse_reference(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let column = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            acc.checked_mul(26)?
                .checked_add((c.to_ascii_uppercase() as u8 - b'A') as usize + 1)
        })?;
    let row = digits.parse::<usize>().ok()?;
    Some((row.checked_sub(1)?, column - 1))
}

fn to_reference(row: usize, column: usize) -> String {
    let mut letters = Vec::new();
    let mut index = column + 1;
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}
