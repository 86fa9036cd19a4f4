pub mod api;
pub mod client;
pub mod config;
pub mod models;
pub mod service;

pub use api::{router, AppState};
pub use config::AppConfig;
pub use models::{Item, ItemId, ItemStatus};
pub use service::{DocumentExporter, Workflow, WorkflowError};
