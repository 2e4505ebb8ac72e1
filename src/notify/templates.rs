//! Plain-text notification content. One rendering per event; every
//! recipient of an event receives the same message. Bodies carry case
//! snapshot fields only, never note text.

use chrono::{DateTime, Utc};

use crate::types::{Case, UserProfile};

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn case_created(case: &Case, actor: &UserProfile) -> Notification {
    let mut body = String::new();
    body.push_str("New Case Created\n\n");
    body.push_str(&format!("Case Number: {}\n", case.case_number));
    body.push_str(&format!("Title: {}\n", case.title));
    body.push_str(&format!("Type: {}\n", case.case_type));
    body.push_str(&format!("Priority: {}\n", case.priority));
    body.push_str(&format!("Status: {}\n", case.status));
    if let Some(subject) = &case.subject_name {
        body.push_str(&format!("Subject: {subject}\n"));
    }
    if let Some(description) = &case.description {
        body.push_str(&format!("Description: {description}\n"));
    }
    body.push_str(&format!("Created by: {}\n", actor.display_name()));
    body.push_str(&format!(
        "Created at: {}\n",
        format_timestamp(&case.created_at)
    ));
    body.push_str("\nPlease log in to Casefile to review and manage this case.\n");

    Notification {
        subject: format!("New Case Created: {}", case.case_number),
        body,
    }
}

pub fn case_assigned(case: &Case, assignee: &UserProfile) -> Notification {
    let mut body = String::new();
    body.push_str(&format!("Hello {},\n\n", assignee.display_name()));
    body.push_str("A case has been assigned to you:\n\n");
    body.push_str(&format!("Case Number: {}\n", case.case_number));
    body.push_str(&format!("Title: {}\n", case.title));
    body.push_str(&format!("Type: {}\n", case.case_type));
    body.push_str(&format!("Priority: {}\n", case.priority));
    if let Some(subject) = &case.subject_name {
        body.push_str(&format!("Subject: {subject}\n"));
    }
    if let Some(description) = &case.description {
        body.push_str(&format!("Description: {description}\n"));
    }
    body.push_str("\nPlease log in to Casefile to begin working on this case.\n");

    Notification {
        subject: format!("Case Assigned to You: {}", case.case_number),
        body,
    }
}

pub fn case_status_changed(case: &Case) -> Notification {
    let mut body = String::new();
    body.push_str("Case Status Updated\n\n");
    body.push_str(&format!("Case Number: {}\n", case.case_number));
    body.push_str(&format!("Title: {}\n", case.title));
    body.push_str(&format!("New Status: {}\n", case.status));
    body.push_str(&format!(
        "Last Updated: {}\n",
        format_timestamp(&case.updated_at)
    ));
    body.push_str("\nLog in to Casefile for more details.\n");

    Notification {
        subject: format!("Case Status Updated: {}", case.case_number),
        body,
    }
}
