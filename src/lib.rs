//! Synchronous adapter over the CUBRID CCI call-level interface.
//!
//! One uniform Connection / PreparedStatement / ResultSet contract, backed by
//! a vendor-specific native client. The native surface is expressed as the
//! [`client::CubridClient`] trait so the adapters never touch raw handle
//! integers; a generic SQL layer talks to the adapters through the capability
//! traits in [`driver`].
//!
//! Every call blocks the calling thread until the backend answers. There is
//! no internal concurrency; a connection and the statements and result sets
//! created from it must be serialized externally and the connection must
//! outlive them.
//!
//! ```rust
//! use std::sync::Arc;
//! use cubrid_adapter::prelude::*;
//! use cubrid_adapter::test_utils::FakeClient;
//!
//! # fn main() -> Result<(), CubridAdapterError> {
//! let client = Arc::new(FakeClient::new());
//! let url = UrlParts::new()
//!     .user("dba")
//!     .password("secret")
//!     .host("db.example.com")
//!     .port(33000)
//!     .path("/demodb");
//! let mut conn = CubridConnection::connect(client, &url)?;
//! conn.execute("CREATE TABLE t (a INT, b STRING)");
//! let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?, ?)")?;
//! stmt.set_int(1, 7)?;
//! stmt.set_string(2, Some("seven"))?;
//! stmt.execute()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
mod params;
pub mod prelude;
pub mod prepared;
pub mod result_set;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::UrlParts;
pub use connection::CubridConnection;
pub use driver::{ConnectionOps, CubridDriver, Driver, ResultSetOps, StatementOps};
pub use error::CubridAdapterError;
pub use prepared::CubridPreparedStatement;
pub use result_set::CubridResultSet;
