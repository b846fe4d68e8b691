//! Capability traits for driver-agnostic callers.
//!
//! A generic SQL layer holds connections, statements and result sets as
//! trait objects and never sees the CUBRID types. [`CubridDriver`] is the
//! registration entry: it loads the native runtime once before the first
//! connection and tears it down at shutdown.

use std::sync::{Arc, Once};

use crate::client::CubridClient;
use crate::config::UrlParts;
use crate::connection::CubridConnection;
use crate::error::CubridAdapterError;
use crate::prepared::CubridPreparedStatement;
use crate::result_set::CubridResultSet;

/// One registered database driver.
pub trait Driver {
    /// Scheme name the driver answers to.
    fn name(&self) -> &'static str;

    /// Open a connection from decomposed URL material.
    fn connect(&self, url: &UrlParts) -> Result<Box<dyn ConnectionOps>, CubridAdapterError>;

    /// Process-shutdown hook.
    fn on_stop(&self) {}
}

/// Connection capabilities.
pub trait ConnectionOps: std::fmt::Debug {
    fn set_query_timeout(&mut self, ms: i32);
    fn set_max_rows(&mut self, max_rows: i32);
    fn ping(&mut self) -> bool;
    fn begin_transaction(&mut self) -> bool;
    fn commit(&mut self) -> bool;
    fn rollback(&mut self) -> bool;
    fn last_insert_row_id(&mut self) -> i64;
    fn rows_changed(&mut self) -> Result<i64, CubridAdapterError>;
    fn execute(&mut self, sql: &str) -> bool;
    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn ResultSetOps>, CubridAdapterError>;
    fn prepare_statement(&mut self, sql: &str)
    -> Result<Box<dyn StatementOps>, CubridAdapterError>;
    fn last_error(&self) -> String;
    fn close(&mut self);
}

/// Prepared statement capabilities.
pub trait StatementOps {
    fn set_string(&mut self, index: usize, value: Option<&str>) -> Result<(), CubridAdapterError>;
    fn set_int(&mut self, index: usize, value: i32) -> Result<(), CubridAdapterError>;
    fn set_long(&mut self, index: usize, value: i64) -> Result<(), CubridAdapterError>;
    fn set_double(&mut self, index: usize, value: f64) -> Result<(), CubridAdapterError>;
    fn set_blob(&mut self, index: usize, value: Option<&[u8]>) -> Result<(), CubridAdapterError>;
    fn execute(&mut self) -> Result<(), CubridAdapterError>;
    fn execute_query(&mut self) -> Result<Box<dyn ResultSetOps>, CubridAdapterError>;
    fn param_count(&self) -> usize;
    fn close(&mut self);
}

/// Result set capabilities.
pub trait ResultSetOps {
    fn column_count(&self) -> usize;
    fn column_name(&self, index: usize) -> Option<String>;
    fn column_size(&self, index: usize) -> Result<i64, CubridAdapterError>;
    fn next(&mut self) -> Result<bool, CubridAdapterError>;
    fn get_string(&mut self, index: usize) -> Result<Option<String>, CubridAdapterError>;
    fn get_blob(&mut self, index: usize) -> Result<Option<Vec<u8>>, CubridAdapterError>;
    fn last_error(&self) -> String;
    fn close(&mut self);
}

/// CUBRID driver registration.
pub struct CubridDriver {
    client: Arc<dyn CubridClient>,
    runtime_loaded: Once,
}

impl CubridDriver {
    #[must_use]
    pub fn new(client: Arc<dyn CubridClient>) -> Self {
        Self {
            client,
            runtime_loaded: Once::new(),
        }
    }
}

impl Driver for CubridDriver {
    fn name(&self) -> &'static str {
        "cubrid"
    }

    fn connect(&self, url: &UrlParts) -> Result<Box<dyn ConnectionOps>, CubridAdapterError> {
        self.runtime_loaded.call_once(|| self.client.runtime_load());
        let conn = CubridConnection::connect(Arc::clone(&self.client), url)?;
        Ok(Box::new(conn))
    }

    fn on_stop(&self) {
        self.client.runtime_unload();
    }
}

impl ConnectionOps for CubridConnection {
    fn set_query_timeout(&mut self, ms: i32) {
        CubridConnection::set_query_timeout(self, ms);
    }

    fn set_max_rows(&mut self, max_rows: i32) {
        CubridConnection::set_max_rows(self, max_rows);
    }

    fn ping(&mut self) -> bool {
        CubridConnection::ping(self)
    }

    fn begin_transaction(&mut self) -> bool {
        CubridConnection::begin_transaction(self)
    }

    fn commit(&mut self) -> bool {
        CubridConnection::commit(self)
    }

    fn rollback(&mut self) -> bool {
        CubridConnection::rollback(self)
    }

    fn last_insert_row_id(&mut self) -> i64 {
        CubridConnection::last_insert_row_id(self)
    }

    fn rows_changed(&mut self) -> Result<i64, CubridAdapterError> {
        CubridConnection::rows_changed(self)
    }

    fn execute(&mut self, sql: &str) -> bool {
        CubridConnection::execute(self, sql)
    }

    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn ResultSetOps>, CubridAdapterError> {
        let rs = CubridConnection::execute_query(self, sql)?;
        Ok(Box::new(rs))
    }

    fn prepare_statement(
        &mut self,
        sql: &str,
    ) -> Result<Box<dyn StatementOps>, CubridAdapterError> {
        let stmt = CubridConnection::prepare_statement(self, sql)?;
        Ok(Box::new(stmt))
    }

    fn last_error(&self) -> String {
        CubridConnection::last_error(self).to_owned()
    }

    fn close(&mut self) {
        CubridConnection::close(self);
    }
}

impl StatementOps for CubridPreparedStatement {
    fn set_string(&mut self, index: usize, value: Option<&str>) -> Result<(), CubridAdapterError> {
        CubridPreparedStatement::set_string(self, index, value)
    }

    fn set_int(&mut self, index: usize, value: i32) -> Result<(), CubridAdapterError> {
        CubridPreparedStatement::set_int(self, index, value)
    }

    fn set_long(&mut self, index: usize, value: i64) -> Result<(), CubridAdapterError> {
        CubridPreparedStatement::set_long(self, index, value)
    }

    fn set_double(&mut self, index: usize, value: f64) -> Result<(), CubridAdapterError> {
        CubridPreparedStatement::set_double(self, index, value)
    }

    fn set_blob(&mut self, index: usize, value: Option<&[u8]>) -> Result<(), CubridAdapterError> {
        CubridPreparedStatement::set_blob(self, index, value)
    }

    fn execute(&mut self) -> Result<(), CubridAdapterError> {
        CubridPreparedStatement::execute(self)
    }

    fn execute_query(&mut self) -> Result<Box<dyn ResultSetOps>, CubridAdapterError> {
        let rs = CubridPreparedStatement::execute_query(self)?;
        Ok(Box::new(rs))
    }

    fn param_count(&self) -> usize {
        CubridPreparedStatement::param_count(self)
    }

    fn close(&mut self) {
        CubridPreparedStatement::close(self);
    }
}

impl ResultSetOps for CubridResultSet {
    fn column_count(&self) -> usize {
        CubridResultSet::column_count(self)
    }

    fn column_name(&self, index: usize) -> Option<String> {
        CubridResultSet::column_name(self, index).map(str::to_owned)
    }

    fn column_size(&self, index: usize) -> Result<i64, CubridAdapterError> {
        CubridResultSet::column_size(self, index)
    }

    fn next(&mut self) -> Result<bool, CubridAdapterError> {
        CubridResultSet::next(self)
    }

    fn get_string(&mut self, index: usize) -> Result<Option<String>, CubridAdapterError> {
        CubridResultSet::get_string(self, index)
    }

    fn get_blob(&mut self, index: usize) -> Result<Option<Vec<u8>>, CubridAdapterError> {
        CubridResultSet::get_blob(self, index)
    }

    fn last_error(&self) -> String {
        CubridResultSet::last_error(self).to_owned()
    }

    fn close(&mut self) {
        CubridResultSet::close(self);
    }
}
