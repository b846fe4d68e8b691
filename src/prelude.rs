//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::client::{CciError, CubridClient};
pub use crate::config::UrlParts;
pub use crate::connection::CubridConnection;
pub use crate::driver::{ConnectionOps, CubridDriver, Driver, ResultSetOps, StatementOps};
pub use crate::error::CubridAdapterError;
pub use crate::prepared::CubridPreparedStatement;
pub use crate::result_set::CubridResultSet;
