//! CSV registers kept in each project's `Logs/` folder.

use std::path::{Path, PathBuf};

use crate::models::submittal::SubmittalRow;

pub const SUBMITTAL_LOG: &str = "submittal_log.csv";
pub const TRANSMITTAL_LOG: &str = "transmittal_log.csv";

const SUBMITTAL_HEADER: [&str; 10] = [
    "Submittal No",
    "Title",
    "Spec Section",
    "Rev",
    "Status",
    "Sent Date",
    "Returned Date",
    "Disposition",
    "Responsible Person",
    "Notes",
];

const TRANSMITTAL_HEADER: [&str; 6] = [
    "Transmittal No",
    "Date Sent",
    "Sent To",
    "Delivery Method",
    "Related Submittals",
    "Notes",
];

#[derive(Debug, Clone)]
pub struct LogPaths {
    pub submittal: PathBuf,
    pub transmittal: PathBuf,
}

/// Rewrites the submittal log from `submittals` (expected oldest first) and
/// creates an empty transmittal log if none exists yet.
pub fn export_logs_csv(logs_dir: &Path, submittals: &[SubmittalRow]) -> Result<LogPaths, csv::Error> {
    std::fs::create_dir_all(logs_dir)?;

    let submittal = logs_dir.join(SUBMITTAL_LOG);
    let mut writer = csv::Writer::from_path(&submittal)?;
    writer.write_record(SUBMITTAL_HEADER)?;
    for s in submittals {
        let notes = s.notes.replace('\n', " ");
        writer.write_record([
            s.sub_no.as_str(),
            s.title.as_str(),
            s.spec_section.as_str(),
            s.rev.as_str(),
            s.status.as_str(),
            "",
            "",
            s.disposition.as_str(),
            s.responsible_person.as_str(),
            notes.trim(),
        ])?;
    }
    writer.flush()?;

    let transmittal = logs_dir.join(TRANSMITTAL_LOG);
    if !transmittal.exists() {
        let mut writer = csv::Writer::from_path(&transmittal)?;
        writer.write_record(TRANSMITTAL_HEADER)?;
        writer.flush()?;
    }

    tracing::debug!(
        "Wrote {} submittal log row(s) to {}",
        submittals.len(),
        submittal.display()
    );
    Ok(LogPaths {
        submittal,
        transmittal,
    })
}
