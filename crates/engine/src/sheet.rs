//! Sheet classification and table name expansion.
use std::fmt;

use serde::Serialize;

use crate::schema::SheetScope;

/// Name of the single sheet holding accounts and employers.
pub const SETUP_SHEET_NAME: &str = "Setup";

/// Placeholder replaced by the sheet month in monthly table names.
pub const MONTH_PLACEHOLDER: &str = "{Month}";

/// A calendar month, as named by a monthly sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` when `month` is not in `1..=12` or `year` does not fit
    /// in four digits.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((0..=9999).contains(&year) && (1..=12).contains(&month)).then_some(Self { year, month })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// Parses the canonical `YYYY-MM` sheet token. Anything else, including
    /// `2024-3` or ` 2024-03`, is rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let bytes = token.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return None;
        }
        let digits = |range: std::ops::Range<usize>| {
            bytes[range.clone()]
                .iter()
                .all(u8::is_ascii_digit)
                .then(|| token[range].parse::<u32>().ok())
                .flatten()
        };
        let year = digits(0..4)?;
        let month = digits(5..7)?;
        Self::new(i32::try_from(year).ok()?, month)
    }

    /// Month formatted for table names, e.g. `2024.03`.
    pub fn table_token(self) -> String {
        format!("{:04}.{:02}", self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SheetClass {
    Setup,
    Monthly(YearMonth),
    Invalid,
}

impl SheetClass {
    /// Scope of the tables expected on a sheet of this class.
    pub fn scope(self) -> Option<SheetScope> {
        match self {
            Self::Setup => Some(SheetScope::Setup),
            Self::Monthly(_) => Some(SheetScope::Monthly),
            Self::Invalid => None,
        }
    }
}

/// Classifies a worksheet by its name.
pub fn classify(sheet_name: &str) -> SheetClass {
    if sheet_name == SETUP_SHEET_NAME {
        return SheetClass::Setup;
    }
    match YearMonth::parse(sheet_name) {
        Some(month) => SheetClass::Monthly(month),
        None => SheetClass::Invalid,
    }
}

/// Expands a table name template for a sheet.
///
/// Only monthly sheets substitute the placeholder; other classes return the
/// template unchanged.
pub fn expand(name_template: &str, class: SheetClass) -> String {
    match class {
        SheetClass::Monthly(month) => name_template.replace(MONTH_PLACEHOLDER, &month.table_token()),
        SheetClass::Setup | SheetClass::Invalid => name_template.to_string(),
    }
}
