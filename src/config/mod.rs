pub mod loader;
pub mod schema;

pub use loader::{discover, load_from_path, load_from_str, search_paths, ConfigError};
pub use schema::{
    CheckerConfig, FixerConfig, FormatterConfig, HeaderConfig, RulesConfig, ValidationError,
    ValidationIssue,
};
