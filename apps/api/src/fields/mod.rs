//! Field configuration: how each placeholder key is presented and formatted.

pub mod formatting;
pub mod resolver;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Date,
    Select,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Date => "date",
            FieldType::Select => "select",
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::Textarea),
            "date" => Ok(FieldType::Date),
            "select" => Ok(FieldType::Select),
            other => Err(format!("unknown field type '{other}'")),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-processing applied to a field's value. Stored as `""`, `"date"`, `"name"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatter {
    #[default]
    None,
    Date,
    Name,
}

impl Formatter {
    pub fn as_str(self) -> &'static str {
        match self {
            Formatter::None => "",
            Formatter::Date => "date",
            Formatter::Name => "name",
        }
    }
}

impl FromStr for Formatter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(Formatter::None),
            "date" => Ok(Formatter::Date),
            "name" => Ok(Formatter::Name),
            other => Err(format!("unknown formatter '{other}'")),
        }
    }
}

/// Field type guessed from the key name at upload time.
pub fn guess_field_type(key: &str) -> FieldType {
    let k = key.to_lowercase();
    if k.contains("bulleted") || k.contains("notes") || k.contains("address") {
        FieldType::Textarea
    } else if k.contains("date") {
        FieldType::Date
    } else {
        FieldType::Text
    }
}

/// Formatter guessed from the key name at upload time.
pub fn guess_formatter(key: &str) -> Formatter {
    let k = key.to_lowercase();
    if k.contains("date") {
        Formatter::Date
    } else if k.contains("name") {
        Formatter::Name
    } else {
        Formatter::None
    }
}

pub fn default_label(key: &str) -> String {
    key.replace('_', " ")
}

/// One option per non-blank line.
pub fn parse_dropdown_options(options_text: &str) -> Vec<String> {
    options_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_field_type() {
        assert_eq!(guess_field_type("Sent_Date"), FieldType::Date);
        assert_eq!(guess_field_type("BulletedInfo1"), FieldType::Textarea);
        assert_eq!(guess_field_type("Site_Address"), FieldType::Textarea);
        assert_eq!(guess_field_type("General_Notes"), FieldType::Textarea);
        assert_eq!(guess_field_type("Sub_No"), FieldType::Text);
    }

    #[test]
    fn test_textarea_keywords_win_over_date() {
        assert_eq!(guess_field_type("Notes_Date"), FieldType::Textarea);
        assert_eq!(guess_formatter("Notes_Date"), Formatter::Date);
    }

    #[test]
    fn test_guess_formatter() {
        assert_eq!(guess_formatter("DATE_SENT"), Formatter::Date);
        assert_eq!(guess_formatter("Contact_Name"), Formatter::Name);
        assert_eq!(guess_formatter("Spec_Section"), Formatter::None);
    }

    #[test]
    fn test_default_label_replaces_underscores() {
        assert_eq!(default_label("Project_Name"), "Project Name");
    }

    #[test]
    fn test_parse_dropdown_options_skips_blank_lines() {
        assert_eq!(
            parse_dropdown_options("  Approved \n\n Rejected\r\n  "),
            vec!["Approved", "Rejected"]
        );
        assert!(parse_dropdown_options("").is_empty());
    }

    #[test]
    fn test_field_type_and_formatter_parse_from_storage_strings() {
        assert_eq!("select".parse::<FieldType>().unwrap(), FieldType::Select);
        assert!("checkbox".parse::<FieldType>().is_err());
        assert_eq!("".parse::<Formatter>().unwrap(), Formatter::None);
        assert_eq!("name".parse::<Formatter>().unwrap(), Formatter::Name);
        assert_eq!(Formatter::None.as_str(), "");
    }
}
