mod admin;
mod cases;
mod documents;
pub mod dto;
mod notes;
pub mod response;
mod router;
mod stats;

pub use router::{AppState, create_router};
