use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{ActivityEntry, Case, CaseDocument, CaseNote, UserProfile};

const HEAVY_RULE: &str =
    "================================================================================";
const LIGHT_RULE: &str =
    "--------------------------------------------------------------------------------";

/// A full case export: the case plus every related record, resolved to
/// display names, rendered as one plain-text document via `Display`.
///
/// Rendering is byte-deterministic for identical input data. Nothing in the
/// output depends on the wall clock, map iteration order, or allocation
/// order, so exporting the same case twice yields identical bytes.
#[derive(Debug)]
pub struct Dossier {
    case: Case,
    activity: Vec<ActivityEntry>,
    notes: Vec<CaseNote>,
    documents: Vec<CaseDocument>,
    profiles: BTreeMap<String, UserProfile>,
}

impl Dossier {
    /// Gathers the case and all of its activity, notes, and documents in the
    /// canonical descending order. Exports are a full-dossier action, private
    /// notes included, so they are restricted to roles with export rights.
    pub fn assemble(store: &dyn Store, case_id: &str, actor: &UserProfile) -> Result<Dossier> {
        if !actor.role.can_export_cases() {
            return Err(Error::permission("this role cannot export cases"));
        }

        let case = store.get_case(case_id)?.ok_or(Error::NotFound("case"))?;
        let activity = store.list_case_activity(&case.id)?;
        let notes = store.list_case_notes(&case.id)?;
        let documents = store.list_case_documents(&case.id)?;

        let mut ids: Vec<&str> = vec![case.created_by.as_str()];
        ids.extend(case.assigned_to.as_deref());
        ids.extend(activity.iter().filter_map(|a| a.user_id.as_deref()));
        ids.extend(notes.iter().map(|n| n.user_id.as_str()));

        let mut profiles = BTreeMap::new();
        for id in ids {
            if profiles.contains_key(id) {
                continue;
            }
            if let Some(profile) = store.get_profile(id)? {
                profiles.insert(id.to_string(), profile);
            }
        }

        Ok(Dossier {
            case,
            activity,
            notes,
            documents,
            profiles,
        })
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    pub fn file_name(&self) -> String {
        export_file_name(&self.case.case_number)
    }

    /// "Full Name (email)" for the personnel section.
    fn person(&self, user_id: &str) -> String {
        match self.profiles.get(user_id) {
            Some(p) => format!("{} ({})", p.full_name.as_deref().unwrap_or("Unknown"), p.email),
            None => "Unknown (N/A)".to_string(),
        }
    }

    fn actor_name(&self, user_id: Option<&str>) -> &str {
        match user_id {
            Some(id) => self
                .profiles
                .get(id)
                .map(|p| p.display_name())
                .unwrap_or("Unknown User"),
            None => "System",
        }
    }
}

impl fmt::Display for Dossier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let case = &self.case;

        writeln!(f, "{HEAVY_RULE}")?;
        writeln!(f, "{}", centered("CASE EXPORT REPORT"))?;
        writeln!(f, "{HEAVY_RULE}")?;
        writeln!(f)?;

        writeln!(f, "CASE INFORMATION:")?;
        writeln!(f, "{LIGHT_RULE}")?;
        field(f, "Case Number:", &case.case_number)?;
        field(f, "Title:", &case.title)?;
        field(f, "Case Type:", &case.case_type)?;
        field(f, "Status:", case.status.as_str())?;
        field(f, "Priority:", case.priority.as_str())?;
        field(f, "Created:", &timestamp(&case.created_at))?;
        field(f, "Last Updated:", &timestamp(&case.updated_at))?;
        if let Some(closed_at) = &case.closed_at {
            field(f, "Closed:", &timestamp(closed_at))?;
        }
        if let Some(archived_at) = &case.archived_at {
            field(f, "Archived:", &timestamp(archived_at))?;
        }
        writeln!(f)?;

        writeln!(f, "PERSONNEL:")?;
        writeln!(f, "{LIGHT_RULE}")?;
        field(f, "Created By:", &self.person(&case.created_by))?;
        match &case.assigned_to {
            Some(id) => field(f, "Assigned To:", &self.person(id))?,
            None => writeln!(f, "Not Assigned")?,
        }
        writeln!(f)?;

        writeln!(f, "SUBJECT INFORMATION:")?;
        writeln!(f, "{LIGHT_RULE}")?;
        match &case.subject_name {
            Some(v) => field(f, "Subject Name:", v)?,
            None => writeln!(f, "No subject name provided")?,
        }
        match &case.date_of_birth {
            Some(v) => field(f, "Date of Birth:", v)?,
            None => writeln!(f, "No date of birth provided")?,
        }
        match &case.contact_info {
            Some(v) => field(f, "Contact Info:", v)?,
            None => writeln!(f, "No contact information provided")?,
        }
        match &case.last_known_location {
            Some(v) => field(f, "Last Known Location:", v)?,
            None => writeln!(f, "No location information provided")?,
        }
        writeln!(f)?;

        writeln!(f, "CASE DESCRIPTION:")?;
        writeln!(f, "{LIGHT_RULE}")?;
        writeln!(
            f,
            "{}",
            case.description.as_deref().unwrap_or("No description provided")
        )?;
        writeln!(f)?;

        writeln!(f, "CASE DOCUMENTS ({}):", self.documents.len())?;
        writeln!(f, "{LIGHT_RULE}")?;
        if self.documents.is_empty() {
            writeln!(f, "No documents attached")?;
        } else {
            for doc in &self.documents {
                writeln!(
                    f,
                    "- {} ({} MB) - Uploaded: {}",
                    doc.file_name,
                    megabytes(doc.file_size),
                    timestamp(&doc.created_at)
                )?;
            }
        }
        writeln!(f)?;

        writeln!(f, "ACTIVITY LOG ({} entries):", self.activity.len())?;
        writeln!(f, "{LIGHT_RULE}")?;
        if self.activity.is_empty() {
            writeln!(f, "No activity recorded")?;
        } else {
            for (i, entry) in self.activity.iter().enumerate() {
                if i > 0 {
                    writeln!(f, "{LIGHT_RULE}")?;
                }
                writeln!(
                    f,
                    "{} - {}",
                    timestamp(&entry.created_at),
                    self.actor_name(entry.user_id.as_deref())
                )?;
                writeln!(f, "Type: {}", entry.kind.as_str().to_uppercase())?;
                writeln!(f, "{}", entry.description)?;
                if let Some(old) = &entry.old_values {
                    writeln!(f, "Previous: {}", values_block(old)?)?;
                }
                if let Some(new) = &entry.new_values {
                    writeln!(f, "New: {}", values_block(new)?)?;
                }
            }
        }
        writeln!(f)?;

        writeln!(f, "CASE NOTES ({} entries):", self.notes.len())?;
        writeln!(f, "{LIGHT_RULE}")?;
        if self.notes.is_empty() {
            writeln!(f, "No notes recorded")?;
        } else {
            for (i, note) in self.notes.iter().enumerate() {
                if i > 0 {
                    writeln!(f, "{LIGHT_RULE}")?;
                }
                writeln!(
                    f,
                    "{} - {} {}",
                    timestamp(&note.created_at),
                    self.actor_name(Some(&note.user_id)),
                    if note.is_private { "(PRIVATE)" } else { "(PUBLIC)" }
                )?;
                writeln!(f, "{}", note.note)?;
            }
        }
        writeln!(f)?;

        writeln!(f, "{HEAVY_RULE}")?;
        writeln!(f, "{}", centered("END OF CASE EXPORT REPORT"))?;
        writeln!(f, "{}", centered(&format!("Password: {}", case.case_number)))?;
        writeln!(f, "{HEAVY_RULE}")?;
        writeln!(f)?;
        writeln!(f, "IMPORTANT SECURITY NOTICE:")?;
        writeln!(
            f,
            "This file contains sensitive case information. The export password is the case"
        )?;
        writeln!(f, "number: {}", case.case_number)?;
        writeln!(f)?;
        writeln!(f, "Export Type: Complete Case Data Export")?;
        writeln!(f, "Confidentiality: RESTRICTED")
    }
}

/// CSV rendering of a case list, one row per case in the order given. The
/// title cell is always double-quoted with embedded quotes doubled, so
/// titles containing commas stay in one cell.
pub fn cases_csv(cases: &[Case]) -> String {
    let mut out = String::from("Case Number,Title,Type,Status,Priority,Created Date\n");
    for case in cases {
        out.push_str(&format!(
            "{},\"{}\",{},{},{},{}\n",
            case.case_number,
            case.title.replace('"', "\"\""),
            case.case_type,
            case.status.as_str(),
            case.priority.as_str(),
            case.created_at.format("%Y-%m-%d"),
        ));
    }
    out
}

pub fn export_file_name(case_number: &str) -> String {
    format!("Case_{case_number}_Export.txt")
}

pub fn csv_file_name(now: &DateTime<Utc>) -> String {
    format!("cases_{}.csv", now.format("%Y%m%d"))
}

fn field(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    writeln!(f, "{label:<19} {value}")
}

fn centered(text: &str) -> String {
    format!("{text:^80}").trim_end().to_string()
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn megabytes(bytes: i64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0 / 1024.0)
}

/// Indented key-value rendering of a change snapshot. serde_json maps keep
/// sorted key order, so the output is stable for equal input.
fn values_block(value: &serde_json::Value) -> std::result::Result<String, fmt::Error> {
    serde_json::to_string_pretty(value).map_err(|_| fmt::Error)
}
