pub mod encryption;
pub mod errors;
pub mod format;
pub mod table;

pub use encryption::{open_token, seal_token};
pub use errors::{AppError, ConfigError};
pub use format::{format_local, format_usd};
pub use table::Table;
