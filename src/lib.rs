// Modules
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod guard;
pub mod server;

pub use analysis::camelot::CamelotTable;
pub use analysis::result::AnalysisResult;
pub use analysis::Analyzer;
pub use config::{ConfigError, Settings};
pub use error::ServiceError;
pub use guard::{ApprovedPath, PathGuard};
pub use server::{router, AppState};
