mod event;
mod models;
mod role;
mod status;

pub use event::CaseEvent;
pub use models::{ActivityEntry, Case, CaseDocument, CaseNote, UserProfile};
pub use role::Role;
pub use status::{ActivityKind, CasePriority, CaseStatus};
