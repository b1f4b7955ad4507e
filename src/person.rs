use chrono::{Datelike, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name used when a record has no name or an id has no record
pub const UNKNOWN_NAME: &str = "غير معروف";

lazy_static! {
    static ref YEAR_ONLY_REGEX: Regex = Regex::new(r"^(\d{4})$").unwrap();
    static ref INTEGRAL_FLOAT_REGEX: Regex = Regex::new(r"^([+-]?\d+)\.0+$").unwrap();
}

// Dates outside this window are treated as data-entry noise
pub fn earliest_sane_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn latest_sane_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MAX)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    /// Normalizes a raw cell into an id. Spreadsheet exports write whole
    /// numbers as `12.0`, which must match a father reference written as `12`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(caps) = INTEGRAL_FLOAT_REGEX.captures(trimmed) {
            return Some(PersonId(caps[1].trim_start_matches('+').to_string()));
        }
        Some(PersonId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for PersonId {
    fn from(value: i64) -> Self {
        PersonId(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
    /// Blank or unrecognised cell; drawn with the male colour
    Unknown,
}

impl Sex {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "m" | "male" | "man" | "ذكر" => Sex::Male,
            "f" | "female" | "woman" | "أنثى" | "انثى" => Sex::Female,
            _ => Sex::Unknown,
        }
    }

    /// `M`, `F`, or empty when unknown
    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Unknown => "",
        }
    }
}

/// Parses a raw date cell, returning `None` for anything unparseable or
/// outside the sanity window.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = if let Some(caps) = YEAR_ONLY_REGEX.captures(trimmed) {
        caps[1]
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
    } else {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                    .map(|dt| dt.date())
            })
    };

    parsed.filter(|date| is_sane_date(*date))
}

pub fn is_sane_date(date: NaiveDate) -> bool {
    date >= earliest_sane_date() && date <= latest_sane_date()
}

/// One row of the family spreadsheet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,
    pub name: Option<String>,
    pub sex: Sex,
    pub father_id: Option<PersonId>,
    pub birth: Option<NaiveDate>,
    pub death: Option<NaiveDate>,
    /// Non-canonical columns in sheet order, empty values included
    pub extras: Vec<(String, String)>,
}

impl PersonRecord {
    pub fn new(id: PersonId) -> Self {
        PersonRecord {
            id,
            name: None,
            sex: Sex::Male,
            father_id: None,
            birth: None,
            death: None,
            extras: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    pub fn birth_year(&self) -> Option<i32> {
        self.birth.map(|d| d.year())
    }

    pub fn death_year(&self) -> Option<i32> {
        self.death.map(|d| d.year())
    }

    pub fn is_deceased(&self) -> bool {
        self.death.is_some()
    }

    /// Age in whole 365-day years, at death for the deceased and at `today`
    /// for everyone else.
    pub fn age_on(&self, today: NaiveDate) -> Option<i64> {
        let birth = self.birth?;
        let end = self.death.unwrap_or(today);
        Some((end - birth).num_days().div_euclid(365))
    }

    pub fn extra(&self, column: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Extra values worth showing in a tooltip
    pub fn non_empty_extras(&self) -> impl Iterator<Item = (&str, &str)> {
        self.extras
            .iter()
            .map(|(name, value)| (name.as_str(), value.trim()))
            .filter(|(_, value)| !value.is_empty())
    }
}
