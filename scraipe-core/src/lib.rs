pub mod config;
pub mod error;
pub mod error_utils;
pub mod session;
pub mod table;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use session::*;
pub use table::*;
pub use types::*;
