use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::types::Case;

/// A single field's before/after pair, serialized as JSON values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Structured diff of a case mutation, covering only the user-mutable
/// fields. Computed once per update and consumed by both the activity
/// recorder and the report exporter. Keys are sorted, so snapshots and
/// anything rendered from them are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDiff {
    changes: BTreeMap<&'static str, FieldChange>,
}

impl FieldDiff {
    pub fn between(old: &Case, new: &Case) -> FieldDiff {
        let mut diff = FieldDiff::default();
        diff.compare("title", &old.title, &new.title);
        diff.compare("description", &old.description, &new.description);
        diff.compare("case_type", &old.case_type, &new.case_type);
        diff.compare("status", &old.status, &new.status);
        diff.compare("priority", &old.priority, &new.priority);
        diff.compare("assigned_to", &old.assigned_to, &new.assigned_to);
        diff.compare("subject_name", &old.subject_name, &new.subject_name);
        diff.compare("date_of_birth", &old.date_of_birth, &new.date_of_birth);
        diff.compare("contact_info", &old.contact_info, &new.contact_info);
        diff.compare(
            "last_known_location",
            &old.last_known_location,
            &new.last_known_location,
        );
        diff
    }

    fn compare<T: Serialize + PartialEq>(&mut self, field: &'static str, old: &T, new: &T) {
        if old != new {
            self.changes.insert(
                field,
                FieldChange {
                    old: serde_json::to_value(old).unwrap_or(Value::Null),
                    new: serde_json::to_value(new).unwrap_or(Value::Null),
                },
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldChange)> + '_ {
        self.changes.iter().map(|(k, v)| (*k, v))
    }

    /// JSON object of the old side of every change.
    pub fn old_values(&self) -> Value {
        Value::Object(
            self.changes
                .iter()
                .map(|(k, v)| (k.to_string(), v.old.clone()))
                .collect(),
        )
    }

    /// JSON object of the new side of every change.
    pub fn new_values(&self) -> Value {
        Value::Object(
            self.changes
                .iter()
                .map(|(k, v)| (k.to_string(), v.new.clone()))
                .collect(),
        )
    }
}
