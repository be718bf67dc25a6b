use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Physical kind of a cell, as stored in the workbook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CellKind {
    Blank,
    Text,
    Numeric,
    Boolean,
    Error,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Blank => "blank",
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Value of one cell. Dates are numeric serials, interpreted through the
/// workbook [`DateSystem`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Cell {
    #[default]
    Blank,
    Text(String),
    Number(f64),
    Boolean(bool),
    Error(String),
}

impl Cell {
    /// Numeric cell holding `date` in the 1900 date system.
    pub fn date(date: NaiveDate) -> Self {
        Self::Number(DateSystem::V1900.to_serial(date))
    }

    /// Text made only of whitespace counts as blank.
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Blank => CellKind::Blank,
            Self::Text(text) if text.trim().is_empty() => CellKind::Blank,
            Self::Text(_) => CellKind::Text,
            Self::Number(_) => CellKind::Numeric,
            Self::Boolean(_) => CellKind::Boolean,
            Self::Error(_) => CellKind::Error,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.kind() == CellKind::Blank
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Self::date(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Blank, Into::into)
    }
}

/// Epoch used to turn numeric serials into dates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum DateSystem {
    /// Serial 1 is 1900-01-01, with the phantom 1900-02-29 kept for Lotus
    /// compatibility.
    #[default]
    V1900,
    /// Serial 0 is 1904-01-01.
    V1904,
}

impl DateSystem {
    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
    }

    /// Date of a serial. The time fraction is dropped.
    pub fn from_serial(self, serial: f64) -> Option<NaiveDate> {
        if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
            return None;
        }
        let days = serial.trunc() as i64;
        let offset = match self {
            Self::V1904 => days + 1462,
            Self::V1900 if days < 60 => days + 1,
            Self::V1900 => days,
        };
        Self::epoch().checked_add_signed(Duration::days(offset))
    }

    pub fn to_serial(self, date: NaiveDate) -> f64 {
        let days = (date - Self::epoch()).num_days();
        let serial = match self {
            Self::V1904 => days - 1462,
            Self::V1900 if days <= 60 => days - 1,
            Self::V1900 => days,
        };
        serial as f64
    }
}
