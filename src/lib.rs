#![warn(clippy::pedantic)]
// Doc/signature lints
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// format!("{}", x) is used throughout
#![allow(clippy::uninlined_format_args)]
// Endpoint groups are named leads::LeadsApi and so on
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod session;
pub mod storage;
pub(crate) mod utils;

pub use auth::AuthManager;
pub use client::ApiClient;
pub use errors::{ApiError, CrmError, CrmResult};
pub use events::{AuthEvent, AuthEvents};
pub use session::{Session, SessionState, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
