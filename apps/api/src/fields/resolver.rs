//! Value resolution: turns raw form or CSV input into the key → string map
//! consumed by the document filler.
//!
//! Steps, per field:
//! 1. trimmed user input
//! 2. well-known keys still empty are filled from the project / submittal
//! 3. date fields still empty are stamped with today's date; name fields
//!    are re-rendered in the selected name style

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::fields::formatting::{format_date, format_name, DateFormat, NameFormat};
use crate::fields::Formatter;
use crate::models::project::ProjectRow;
use crate::models::template::TemplateFieldRow;

/// Values the system knows without asking the user.
#[derive(Debug, Clone, Default)]
pub struct AutoFields {
    pub project_name: String,
    pub contract_no: String,
    pub project_number: String,
    pub sub_no: String,
    pub sub_title: String,
    pub spec_section: String,
    pub authorization: String,
}

/// Identifying submittal attributes used for auto-fill.
#[derive(Debug, Clone, Default)]
pub struct SubmittalIdentity<'a> {
    pub sub_no: &'a str,
    pub title: &'a str,
    pub spec_section: &'a str,
    pub disposition: &'a str,
}

impl AutoFields {
    pub fn new(project: &ProjectRow, submittal: &SubmittalIdentity<'_>) -> Self {
        AutoFields {
            project_name: project.name.clone(),
            contract_no: project.contract_no.clone().unwrap_or_default(),
            project_number: project.project_number.clone().unwrap_or_default(),
            sub_no: submittal.sub_no.to_string(),
            sub_title: submittal.title.to_string(),
            spec_section: submittal.spec_section.to_string(),
            authorization: submittal.disposition.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "Project_Name" => &self.project_name,
            "Contract_No" => &self.contract_no,
            "Project_Number" => &self.project_number,
            "Sub_No" => &self.sub_no,
            "Sub_Title" => &self.sub_title,
            "Spec_Section" => &self.spec_section,
            "Authorization" => &self.authorization,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Prefill map shown to the user before they enter values.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        [
            "Project_Name",
            "Contract_No",
            "Project_Number",
            "Sub_No",
            "Sub_Title",
            "Spec_Section",
            "Authorization",
        ]
        .into_iter()
        .filter_map(|k| self.get(k).map(|v| (k.to_string(), v.to_string())))
        .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub date_format: DateFormat,
    pub name_format: NameFormat,
    /// Date stamped into empty date fields.
    pub today: NaiveDate,
}

fn is_date_field(field: &TemplateFieldRow) -> bool {
    field.formatter() == Formatter::Date || field.key.to_lowercase().contains("date")
}

fn is_name_field(field: &TemplateFieldRow) -> bool {
    field.formatter() == Formatter::Name || field.key.to_lowercase().contains("name")
}

/// Builds the value map for `fields`. Every field key appears in the result.
pub fn resolve_values(
    fields: &[TemplateFieldRow],
    input: &HashMap<String, String>,
    auto: &AutoFields,
    options: &ResolveOptions,
) -> BTreeMap<String, String> {
    let mut values: BTreeMap<String, String> = fields
        .iter()
        .map(|f| {
            let raw = input.get(&f.key).map(|v| v.trim()).unwrap_or("");
            (f.key.clone(), raw.to_string())
        })
        .collect();

    for (key, value) in values.iter_mut() {
        if value.is_empty() {
            if let Some(auto_value) = auto.get(key) {
                *value = auto_value.to_string();
            }
        }
    }

    for field in fields {
        let Some(value) = values.get_mut(&field.key) else {
            continue;
        };
        if is_date_field(field) && value.is_empty() {
            *value = format_date(options.today, options.date_format);
        }
        if is_name_field(field) {
            *value = format_name(value, options.name_format);
        }
    }

    values
}

/// Keys of required fields whose resolved value is blank.
pub fn missing_required(
    fields: &[TemplateFieldRow],
    values: &BTreeMap<String, String>,
) -> Vec<String> {
    fields
        .iter()
        .filter(|f| f.required)
        .filter(|f| values.get(&f.key).map_or(true, |v| v.trim().is_empty()))
        .map(|f| f.key.clone())
        .collect()
}
