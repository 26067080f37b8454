//! Date and name rendering for resolved field values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// MM/DD/YYYY
    #[default]
    MdySlash,
    /// Month D, YYYY
    MonthDYyyy,
    /// YYYY-MM-DD
    Iso,
}

impl DateFormat {
    pub const ALL: [DateFormat; 3] = [DateFormat::MdySlash, DateFormat::MonthDYyyy, DateFormat::Iso];

    /// Parses a format key; unknown or empty keys fall back to `MM/DD/YYYY`.
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "month_d_yyyy" => DateFormat::MonthDYyyy,
            "iso" => DateFormat::Iso,
            _ => DateFormat::MdySlash,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            DateFormat::MdySlash => "mdy_slash",
            DateFormat::MonthDYyyy => "month_d_yyyy",
            DateFormat::Iso => "iso",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateFormat::MdySlash => "MM/DD/YYYY",
            DateFormat::MonthDYyyy => "Month D, YYYY",
            DateFormat::Iso => "YYYY-MM-DD",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameFormat {
    #[default]
    FirstLast,
    LastFirst,
    #[serde(rename = "mrms_last")]
    MrMsLast,
}

impl NameFormat {
    pub const ALL: [NameFormat; 3] = [NameFormat::FirstLast, NameFormat::LastFirst, NameFormat::MrMsLast];

    /// Parses a format key; unknown or empty keys fall back to `First Last`.
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "last_first" => NameFormat::LastFirst,
            "mrms_last" => NameFormat::MrMsLast,
            _ => NameFormat::FirstLast,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            NameFormat::FirstLast => "first_last",
            NameFormat::LastFirst => "last_first",
            NameFormat::MrMsLast => "mrms_last",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NameFormat::FirstLast => "First Last",
            NameFormat::LastFirst => "Last, First",
            NameFormat::MrMsLast => "Mr./Ms. Last",
        }
    }
}

/// A `(key, label)` pair offered to clients building the entry form.
#[derive(Debug, Clone, Serialize)]
pub struct FormatOption {
    pub key: &'static str,
    pub label: &'static str,
}

pub fn date_format_options() -> Vec<FormatOption> {
    DateFormat::ALL
        .iter()
        .map(|f| FormatOption {
            key: f.key(),
            label: f.label(),
        })
        .collect()
}

pub fn name_format_options() -> Vec<FormatOption> {
    NameFormat::ALL
        .iter()
        .map(|f| FormatOption {
            key: f.key(),
            label: f.label(),
        })
        .collect()
}

pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    match format {
        DateFormat::MdySlash => date.format("%m/%d/%Y").to_string(),
        DateFormat::MonthDYyyy => date.format("%B %-d, %Y").to_string(),
        DateFormat::Iso => date.format("%Y-%m-%d").to_string(),
    }
}

const HONORIFICS: &[&str] = &["mr", "ms", "mrs", "dr"];

/// Re-renders a person's name. Input is whitespace-separated tokens with the
/// surname last; a single-token name is returned unchanged by `LastFirst`.
pub fn format_name(raw: &str, format: NameFormat) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let parts: Vec<&str> = raw.split_whitespace().collect();
    let last = parts[parts.len() - 1];

    match format {
        NameFormat::FirstLast => raw.to_string(),
        NameFormat::LastFirst => {
            if parts.len() >= 2 {
                format!("{}, {}", last, parts[..parts.len() - 1].join(" "))
            } else {
                raw.to_string()
            }
        }
        NameFormat::MrMsLast => {
            let first = parts[0].to_lowercase();
            if HONORIFICS.contains(&first.trim_end_matches('.')) {
                format!("{} {}", parts[0], last)
            } else {
                format!("Mr./Ms. {last}")
            }
        }
    }
}
