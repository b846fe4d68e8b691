//! Connection adapter: one native session plus its error/cap state.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::client::{
    CCI_ER_NO_ERROR, CciError, ConnHandle, CubridClient, IsolationLevel, TranDisposition,
};
use crate::config::{
    ConnectOptions, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_QUERY_TIMEOUT_MS, UrlParts,
};
use crate::error::CubridAdapterError;
use crate::prepared::CubridPreparedStatement;
use crate::result_set::CubridResultSet;

const PING_SQL: &str = "SELECT 1+1 FROM db_root";

/// One established session.
///
/// Holds the native handle, the session-wide row cap and query timeout, and
/// the last native error. Boolean-returning operations (ping, execute,
/// begin/commit/rollback) record failures here instead of raising; callers
/// inspect [`last_error`](Self::last_error) for the message.
pub struct CubridConnection {
    client: Arc<dyn CubridClient>,
    conn: ConnHandle,
    max_rows: i32,
    timeout_ms: i32,
    last_error_code: i32,
    last_error_message: String,
    closed: bool,
}

impl CubridConnection {
    /// Validate the URL parts, establish the session and apply the session
    /// defaults: autocommit on, 100 ms lock timeout, repeatable-read class /
    /// read-committed instance isolation, 3 s query timeout.
    ///
    /// Setup-call failures after a successful connect are logged and
    /// tolerated; only validation and the connect itself can fail.
    pub fn connect(
        client: Arc<dyn CubridClient>,
        url: &UrlParts,
    ) -> Result<Self, CubridAdapterError> {
        let opts = ConnectOptions::from_url(url)?;
        let conn = client
            .connect(
                &opts.host,
                opts.port,
                &opts.database,
                &opts.user,
                &opts.password,
                opts.connect_timeout_ms,
            )
            .map_err(|e| CubridAdapterError::ConnectError(e.to_string()))?;

        let mut me = Self {
            client,
            conn,
            max_rows: 0,
            timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            last_error_code: CCI_ER_NO_ERROR,
            last_error_message: String::new(),
            closed: false,
        };
        if let Err(e) = me.client.set_autocommit(conn, true) {
            debug!(error = %e, "set autocommit failed");
        }
        if let Err(e) = me.client.set_lock_timeout(conn, DEFAULT_LOCK_TIMEOUT_MS) {
            debug!(error = %e, "set lock timeout failed");
        }
        if let Err(e) = me
            .client
            .set_isolation_level(conn, IsolationLevel::RepClassCommitInstance)
        {
            debug!(error = %e, "set isolation level failed");
        }
        me.set_query_timeout(DEFAULT_QUERY_TIMEOUT_MS);
        Ok(me)
    }

    /// Set the per-statement query timeout for this session. Stored even
    /// when the native call fails, so later statements inherit the intent.
    pub fn set_query_timeout(&mut self, ms: i32) {
        self.timeout_ms = ms;
        if let Err(e) = self.client.set_query_timeout(self.conn, ms) {
            debug!(error = %e, "set query timeout failed");
        }
    }

    /// Cap the number of rows result sets created from this connection will
    /// yield. 0 disables the cap.
    pub fn set_max_rows(&mut self, max_rows: i32) {
        self.max_rows = max_rows;
    }

    #[must_use]
    pub fn max_rows(&self) -> i32 {
        self.max_rows
    }

    #[must_use]
    pub fn query_timeout(&self) -> i32 {
        self.timeout_ms
    }

    /// Probe liveness with a trivial query against `db_root`.
    ///
    /// Returns true only when the whole prepare/execute round trip succeeds
    /// and no error is recorded on the connection. The temporary statement
    /// handle is released on every path.
    pub fn ping(&mut self) -> bool {
        match self.client.prepare(self.conn, PING_SQL) {
            Ok(req) => {
                if let Err(e) = self.client.execute(req) {
                    self.set_last_error(&e);
                }
                if let Err(e) = self.client.close_request(req) {
                    debug!(error = %e, "close of ping statement failed");
                }
            }
            Err(e) => self.set_last_error(&e),
        }
        self.last_error_code == CCI_ER_NO_ERROR
    }

    /// Start a transaction. Always succeeds: sessions run in transaction
    /// scope already, so this only reports that the session is usable.
    pub fn begin_transaction(&self) -> bool {
        self.last_error_code == CCI_ER_NO_ERROR
    }

    /// Commit the open transaction; false records the native error.
    pub fn commit(&mut self) -> bool {
        self.end_tran(TranDisposition::Commit)
    }

    /// Roll back the open transaction; false records the native error.
    pub fn rollback(&mut self) -> bool {
        self.end_tran(TranDisposition::Rollback)
    }

    // Error state is only written on failure; a prior error stays sticky
    // until the next statement attempt overwrites it.
    fn end_tran(&mut self, disposition: TranDisposition) -> bool {
        if let Err(e) = self.client.end_tran(self.conn, disposition) {
            self.set_last_error(&e);
        }
        self.last_error_code == CCI_ER_NO_ERROR
    }

    /// Identifier generated by the most recent insert, or 0.
    ///
    /// Degrades soft: an absent native entry point, a native failure, or an
    /// unparsable value all yield 0 rather than an error.
    pub fn last_insert_row_id(&mut self) -> i64 {
        match self.client.last_insert_id(self.conn) {
            Ok(Some(value)) => value.trim().parse().unwrap_or(0),
            Ok(None) => {
                debug!("last insert id not available in this client library");
                0
            }
            Err(e) => {
                self.set_last_error(&e);
                0
            }
        }
    }

    /// Rows affected by the most recent statement.
    pub fn rows_changed(&mut self) -> Result<i64, CubridAdapterError> {
        self.client.row_count(self.conn).map_err(|e| {
            self.set_last_error(&e);
            CubridAdapterError::StatementError(e.message)
        })
    }

    /// Run one statement without a result set.
    ///
    /// On execute failure the transaction is rolled back before reporting.
    /// The temporary statement handle is released on every path.
    pub fn execute(&mut self, sql: &str) -> bool {
        self.clear_last_error();
        let req = match self.client.prepare(self.conn, sql) {
            Ok(req) => req,
            Err(e) => {
                self.set_last_error(&e);
                return false;
            }
        };
        if let Err(e) = self.client.execute(req) {
            if let Err(e) = self.client.end_tran(self.conn, TranDisposition::Rollback) {
                debug!(error = %e, "rollback after failed execute failed");
            }
            if let Err(e) = self.client.close_request(req) {
                debug!(error = %e, "close of statement failed");
            }
            self.set_last_error(&e);
            return false;
        }
        if let Err(e) = self.client.close_request(req) {
            debug!(error = %e, "close of statement failed");
        }
        true
    }

    /// Run one query and hand the rows back as a result set that owns the
    /// statement handle.
    pub fn execute_query(&mut self, sql: &str) -> Result<CubridResultSet, CubridAdapterError> {
        self.clear_last_error();
        let req = match self.client.prepare(self.conn, sql) {
            Ok(req) => req,
            Err(e) => {
                self.set_last_error(&e);
                return Err(CubridAdapterError::StatementError(e.message));
            }
        };
        if let Err(e) = self.client.execute(req) {
            self.set_last_error(&e);
            if let Err(e) = self.client.close_request(req) {
                debug!(error = %e, "close of statement failed");
            }
            return Err(CubridAdapterError::StatementError(e.message));
        }
        match CubridResultSet::new(
            Arc::clone(&self.client),
            self.conn,
            req,
            self.max_rows,
            true,
        ) {
            Ok(rs) => Ok(rs),
            Err(e) => {
                if let Err(e) = self.client.close_request(req) {
                    debug!(error = %e, "close of statement failed");
                }
                Err(e)
            }
        }
    }

    /// Prepare a statement for later parameterized execution.
    pub fn prepare_statement(
        &mut self,
        sql: &str,
    ) -> Result<CubridPreparedStatement, CubridAdapterError> {
        self.clear_last_error();
        let req = match self.client.prepare(self.conn, sql) {
            Ok(req) => req,
            Err(e) => {
                self.set_last_error(&e);
                return Err(CubridAdapterError::StatementError(e.message));
            }
        };
        Ok(CubridPreparedStatement::new(
            Arc::clone(&self.client),
            self.conn,
            req,
            self.max_rows,
        ))
    }

    /// Message of the most recent native failure, empty when the last
    /// operation succeeded.
    #[must_use]
    pub fn last_error(&self) -> &str {
        if self.last_error_code == CCI_ER_NO_ERROR {
            ""
        } else {
            &self.last_error_message
        }
    }

    fn set_last_error(&mut self, e: &CciError) {
        self.last_error_code = e.code;
        self.last_error_message.clear();
        self.last_error_message.push_str(&e.message);
    }

    fn clear_last_error(&mut self) {
        self.last_error_code = CCI_ER_NO_ERROR;
    }

    /// Disconnect. Idempotent; a failing native disconnect is logged, never
    /// surfaced.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.client.disconnect(self.conn) {
            debug!(error = %e, "disconnect failed");
        }
    }
}

impl Drop for CubridConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CubridConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CubridConnection")
            .field("conn", &self.conn)
            .field("max_rows", &self.max_rows)
            .field("timeout_ms", &self.timeout_ms)
            .field("last_error_code", &self.last_error_code)
            .field("closed", &self.closed)
            .finish()
    }
}
