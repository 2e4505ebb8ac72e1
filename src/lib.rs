//! # Casefile
//!
//! A case management server for investigation teams, usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! casefile = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use casefile::cases::CaseService;
//! use casefile::documents::{DocumentIndex, FsBlobStore};
//! use casefile::notify::{Dispatcher, LogMailer};
//! use casefile::server::{AppState, create_router};
//! use casefile::store::{SqliteStore, Store};
//!
//! let store: Arc<dyn Store> =
//!     Arc::new(SqliteStore::new(Path::new("./data/casefile.db")).unwrap());
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: store.clone(),
//!     cases: CaseService::new(store.clone()),
//!     documents: DocumentIndex::new(store.clone(), Arc::new(FsBlobStore::new(Path::new("./data")))),
//!     dispatcher: Arc::new(Dispatcher::new(store, Arc::new(LogMailer))),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the `casefile` binary's CLI dependencies.
//!   Disable with `default-features = false` for library use.

pub mod analytics;
pub mod auth;
pub mod cases;
pub mod config;
pub mod documents;
pub mod error;
pub mod notify;
pub mod report;
pub mod server;
pub mod store;
pub mod types;
