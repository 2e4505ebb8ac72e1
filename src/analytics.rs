use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Case, CasePriority, CaseStatus};

/// Headline counters for the dashboard, computed over the case set already
/// filtered to what the viewer may see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_cases: usize,
    pub open_cases: usize,
    pub in_progress_cases: usize,
    pub closed_cases: usize,
    pub high_priority_cases: usize,
    pub assigned_cases: usize,
    pub recent_activity: usize,
    pub monthly_new_cases: usize,
}

impl DashboardStats {
    /// `now` is passed in rather than read from the clock so the seven-day
    /// activity window and the current-month counter are testable.
    pub fn compute(cases: &[Case], viewer_id: &str, now: DateTime<Utc>) -> DashboardStats {
        let week_ago = now - Duration::days(7);
        let current_month = now.format("%Y-%m").to_string();

        let mut stats = DashboardStats {
            total_cases: cases.len(),
            ..DashboardStats::default()
        };
        for case in cases {
            match case.status {
                CaseStatus::Open => stats.open_cases += 1,
                CaseStatus::InProgress => stats.in_progress_cases += 1,
                CaseStatus::Closed => stats.closed_cases += 1,
                CaseStatus::Archived => {}
            }
            // high only; urgent shows up in the priority breakdown
            if case.priority == CasePriority::High {
                stats.high_priority_cases += 1;
            }
            if case.assigned_to.as_deref() == Some(viewer_id) {
                stats.assigned_cases += 1;
            }
            if case.updated_at > week_ago {
                stats.recent_activity += 1;
            }
            if case.created_at.format("%Y-%m").to_string() == current_month {
                stats.monthly_new_cases += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: String,
    pub cases: usize,
}

/// Distribution and trend numbers behind the analytics page.
#[derive(Debug, Clone, Serialize)]
pub struct CaseAnalytics {
    pub total_cases: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    /// closed / total, in [0, 1]. Zero when there are no cases.
    pub resolution_rate: f64,
    pub high_priority_rate: f64,
    /// Creation counts bucketed by calendar month ("YYYY-MM"), ascending,
    /// most recent six buckets that contain at least one case.
    pub monthly_created: Vec<MonthBucket>,
}

impl CaseAnalytics {
    pub fn compute(cases: &[Case]) -> CaseAnalytics {
        let total = cases.len();

        let mut by_status = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        let mut by_type = BTreeMap::new();
        let mut by_month: BTreeMap<String, usize> = BTreeMap::new();
        for case in cases {
            *by_status.entry(case.status.as_str().to_string()).or_insert(0) += 1;
            *by_priority.entry(case.priority.as_str().to_string()).or_insert(0) += 1;
            *by_type.entry(case.case_type.clone()).or_insert(0) += 1;
            *by_month
                .entry(case.created_at.format("%Y-%m").to_string())
                .or_insert(0) += 1;
        }

        let closed = by_status.get(CaseStatus::Closed.as_str()).copied().unwrap_or(0);
        let high = by_priority.get(CasePriority::High.as_str()).copied().unwrap_or(0);
        let rate = |n: usize| {
            if total == 0 { 0.0 } else { n as f64 / total as f64 }
        };

        // "YYYY-MM" sorts lexicographically in date order
        let monthly_created = by_month
            .into_iter()
            .map(|(month, cases)| MonthBucket { month, cases })
            .collect::<Vec<_>>();
        let skip = monthly_created.len().saturating_sub(6);

        CaseAnalytics {
            total_cases: total,
            by_status,
            by_priority,
            by_type,
            resolution_rate: rate(closed),
            high_priority_rate: rate(high),
            monthly_created: monthly_created.into_iter().skip(skip).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    Assigned,
    Unassigned,
    Mine,
}

/// Compound case-list filter. Every set criterion must hold for a case to
/// pass; unset criteria match everything. Application is a pure in-memory
/// transform that keeps the input order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaseFilter {
    pub search: Option<String>,
    pub status: Option<CaseStatus>,
    pub case_type: Option<String>,
    pub priority: Option<CasePriority>,
    pub assignment: Option<Assignment>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl CaseFilter {
    pub fn apply(&self, mut cases: Vec<Case>, viewer_id: &str) -> Vec<Case> {
        cases.retain(|case| self.matches(case, viewer_id));
        cases
    }

    pub fn matches(&self, case: &Case, viewer_id: &str) -> bool {
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !search_matches(case, &needle) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if case.status != status {
                return false;
            }
        }
        if let Some(case_type) = &self.case_type {
            if &case.case_type != case_type {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if case.priority != priority {
                return false;
            }
        }
        match self.assignment {
            Some(Assignment::Assigned) if case.assigned_to.is_none() => return false,
            Some(Assignment::Unassigned) if case.assigned_to.is_some() => return false,
            Some(Assignment::Mine) if case.assigned_to.as_deref() != Some(viewer_id) => {
                return false;
            }
            _ => {}
        }
        // bounds are inclusive on both ends
        if let Some(from) = self.created_from {
            if case.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if case.created_at > to {
                return false;
            }
        }
        true
    }
}

fn search_matches(case: &Case, needle: &str) -> bool {
    case.title.to_lowercase().contains(needle)
        || case.case_number.to_lowercase().contains(needle)
        || case
            .subject_name
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(needle))
        || case
            .description
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(needle))
}
