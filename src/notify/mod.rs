mod mailer;
pub mod templates;

pub use mailer::{LogMailer, MailError, Mailer};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::error::Result;
use crate::store::Store;
use crate::types::{CaseEvent, Role, UserProfile};

use templates::Notification;

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one recipient's delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Aggregated result of one event dispatch, keyed by recipient email and
/// sorted by it. Failures live here and in the logs; they are never
/// escalated to the mutation that raised the event.
#[derive(Debug)]
pub struct DispatchReport {
    pub event: &'static str,
    pub outcomes: Vec<(String, DeliveryOutcome)>,
}

impl DispatchReport {
    fn new(event: &'static str) -> Self {
        Self {
            event,
            outcomes: Vec::new(),
        }
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == DeliveryOutcome::Delivered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

/// Fans lifecycle events out to interested parties through the mail
/// collaborator. Delivery is per-recipient independent, concurrent, and
/// settle-all: a slow or failing recipient never blocks or fails the
/// others.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    send_timeout: Duration,
    public_base_url: Option<String>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            public_base_url: None,
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// When set, notification bodies end with a link to the case.
    pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url;
        self
    }

    /// Processes events on a detached task. Callers never wait on delivery;
    /// outcomes surface only in the logs.
    pub fn spawn(self: &Arc<Self>, events: Vec<CaseEvent>) {
        if events.is_empty() {
            return;
        }
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            for event in events {
                dispatcher.dispatch(&event).await;
            }
        });
    }

    /// Delivers one event to every resolved recipient and waits for all
    /// attempts to settle. Zero recipients is a silent no-op.
    pub async fn dispatch(&self, event: &CaseEvent) -> DispatchReport {
        let mut report = DispatchReport::new(event.kind());

        let prepared = match self.prepare(event) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(
                    event = event.kind(),
                    case = %event.case().case_number,
                    "failed to resolve notification recipients: {}",
                    e
                );
                return report;
            }
        };
        let Some((recipients, notification)) = prepared else {
            return report;
        };
        if recipients.is_empty() {
            return report;
        }

        let mut sends = JoinSet::new();
        for recipient in recipients {
            let mailer = Arc::clone(&self.mailer);
            let subject = notification.subject.clone();
            let body = notification.body.clone();
            let timeout = self.send_timeout;
            sends.spawn(async move {
                let outcome =
                    match tokio::time::timeout(timeout, mailer.send(&recipient.email, &subject, &body))
                        .await
                    {
                        Ok(Ok(())) => DeliveryOutcome::Delivered,
                        Ok(Err(e)) => DeliveryOutcome::Failed(e.to_string()),
                        Err(_) => {
                            DeliveryOutcome::Failed(format!("timed out after {:?}", timeout))
                        }
                    };
                (recipient.email, outcome)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((email, outcome)) => report.outcomes.push((email, outcome)),
                Err(e) => tracing::warn!("notification send task panicked: {}", e),
            }
        }
        report.outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        for (email, outcome) in &report.outcomes {
            if let DeliveryOutcome::Failed(reason) = outcome {
                tracing::warn!(
                    event = event.kind(),
                    recipient = %email,
                    "notification delivery failed: {}",
                    reason
                );
            }
        }
        tracing::info!(
            event = event.kind(),
            case = %event.case().case_number,
            delivered = report.delivered(),
            failed = report.failed(),
            "notification dispatch settled"
        );

        report
    }

    /// Resolves recipients and renders content for an event. Profiles are
    /// re-read from the store at dispatch time. `None` means the event
    /// notifies nobody.
    fn prepare(&self, event: &CaseEvent) -> Result<Option<(Vec<UserProfile>, Notification)>> {
        let prepared = match event {
            CaseEvent::Created { case, actor } => {
                let recipients = self
                    .store
                    .list_active_profiles_by_roles(&[Role::Admin, Role::Investigator])?;
                Some((recipients, templates::case_created(case, actor)))
            }
            CaseEvent::Assigned { case, .. } => {
                let Some(assignee_id) = case.assigned_to.as_deref() else {
                    return Ok(None);
                };
                match self.store.get_profile(assignee_id)? {
                    Some(assignee) => {
                        let notification = templates::case_assigned(case, &assignee);
                        Some((vec![assignee], notification))
                    }
                    None => None,
                }
            }
            CaseEvent::StatusChanged { case, .. } => {
                let mut recipients = Vec::new();
                if let Some(creator) = self.store.get_profile(&case.created_by)? {
                    recipients.push(creator);
                }
                if let Some(assignee_id) = case.assigned_to.as_deref() {
                    if let Some(assignee) = self.store.get_profile(assignee_id)? {
                        if recipients.iter().all(|r| r.email != assignee.email) {
                            recipients.push(assignee);
                        }
                    }
                }
                Some((recipients, templates::case_status_changed(case)))
            }
            // Plain field edits notify nobody.
            CaseEvent::Updated { .. } => None,
        };

        let Some((recipients, mut notification)) = prepared else {
            return Ok(None);
        };
        if let Some(base) = &self.public_base_url {
            notification.body.push_str(&format!(
                "\nView the case: {}/cases/{}\n",
                base.trim_end_matches('/'),
                event.case().id
            ));
        }
        Ok(Some((recipients, notification)))
    }
}
