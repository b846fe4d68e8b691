//! Prepared statement adapter: typed setters, blob staging, execution.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::client::{BlobHandle, ConnHandle, CubridClient, ReqHandle, TranDisposition};
use crate::error::CubridAdapterError;
use crate::params::{ParamSet, SlotValue};
use crate::result_set::CubridResultSet;

/// One prepared statement and its parameter slots.
///
/// Slot indexes are 1-based. Binding stores values locally; the native binds
/// happen at execution, in index order over the populated slots, so setter
/// call order never matters and rebinding a slot simply replaces its value.
pub struct CubridPreparedStatement {
    client: Arc<dyn CubridClient>,
    conn: ConnHandle,
    req: ReqHandle,
    max_rows: i32,
    params: ParamSet,
    freed: bool,
}

impl CubridPreparedStatement {
    pub(crate) fn new(
        client: Arc<dyn CubridClient>,
        conn: ConnHandle,
        req: ReqHandle,
        max_rows: i32,
    ) -> Self {
        let params = ParamSet::new(client.bind_count(req));
        Self {
            client,
            conn,
            req,
            max_rows,
            params,
            freed: false,
        }
    }

    /// Declared placeholder count of the statement.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.param_count()
    }

    /// Bind a text value; `None` binds SQL NULL.
    pub fn set_string(
        &mut self,
        index: usize,
        value: Option<&str>,
    ) -> Result<(), CubridAdapterError> {
        self.store(index, SlotValue::Text(value.map(str::to_owned)))
    }

    pub fn set_int(&mut self, index: usize, value: i32) -> Result<(), CubridAdapterError> {
        self.store(index, SlotValue::Int(value))
    }

    pub fn set_long(&mut self, index: usize, value: i64) -> Result<(), CubridAdapterError> {
        self.store(index, SlotValue::Long(value))
    }

    pub fn set_double(&mut self, index: usize, value: f64) -> Result<(), CubridAdapterError> {
        self.store(index, SlotValue::Double(value))
    }

    /// Bind blob bytes; `None` binds SQL NULL without allocating a blob.
    ///
    /// Bytes are staged into a freshly allocated native blob. The write is
    /// verified against the input length; a short write releases the blob
    /// and fails. A blob displaced from the slot by rebinding is released.
    pub fn set_blob(
        &mut self,
        index: usize,
        value: Option<&[u8]>,
    ) -> Result<(), CubridAdapterError> {
        self.params.check_index(index)?;
        let slot = match value {
            None => SlotValue::Blob(None),
            Some(bytes) => {
                let blob = self.client.blob_new(self.conn).map_err(|e| {
                    CubridAdapterError::StatementError(format!("blob allocate failed: {e}"))
                })?;
                let written = match self.client.blob_write(self.conn, blob, 0, bytes) {
                    Ok(n) => n,
                    Err(e) => {
                        self.release_blob(blob);
                        return Err(CubridAdapterError::StatementError(format!(
                            "blob write failed: {e}"
                        )));
                    }
                };
                if written != bytes.len() {
                    self.release_blob(blob);
                    return Err(CubridAdapterError::StatementError(format!(
                        "blob write size mismatch ({written}) <> ({len})",
                        len = bytes.len()
                    )));
                }
                SlotValue::Blob(Some(blob))
            }
        };
        self.store(index, slot)
    }

    fn store(&mut self, index: usize, value: SlotValue) -> Result<(), CubridAdapterError> {
        if let Some(displaced) = self.params.bind(index, value)? {
            self.release_blob(displaced);
        }
        Ok(())
    }

    fn bind_all(&self) -> Result<(), CubridAdapterError> {
        for (index, value) in self.params.bind_values() {
            self.client
                .bind_param(self.req, index, &value)
                .map_err(|e| CubridAdapterError::StatementError(e.message))?;
        }
        Ok(())
    }

    /// Bind the populated slots, execute, and commit.
    pub fn execute(&mut self) -> Result<(), CubridAdapterError> {
        self.bind_all()?;
        self.client
            .execute(self.req)
            .map_err(|e| CubridAdapterError::StatementError(e.message))?;
        self.client
            .end_tran(self.conn, TranDisposition::Commit)
            .map_err(|e| CubridAdapterError::StatementError(e.message))?;
        Ok(())
    }

    /// Bind the populated slots, execute, and hand the rows back. The
    /// returned result set shares this statement's handle; freeing the
    /// statement closes it.
    pub fn execute_query(&mut self) -> Result<CubridResultSet, CubridAdapterError> {
        self.bind_all()?;
        self.client
            .execute(self.req)
            .map_err(|e| CubridAdapterError::StatementError(e.message))?;
        CubridResultSet::new(
            Arc::clone(&self.client),
            self.conn,
            self.req,
            self.max_rows,
            false,
        )
    }

    fn release_blob(&self, blob: BlobHandle) {
        if let Err(e) = self.client.blob_free(blob) {
            debug!(error = %e, "blob release failed");
        }
    }

    /// Close the statement handle and release every slot's staged blob.
    /// Idempotent; release failures are logged, never surfaced.
    pub fn close(&mut self) {
        if self.freed {
            return;
        }
        self.freed = true;
        if let Err(e) = self.client.close_request(self.req) {
            debug!(error = %e, "close of prepared statement failed");
        }
        for blob in self.params.take_blob_handles() {
            self.release_blob(blob);
        }
    }
}

impl Drop for CubridPreparedStatement {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CubridPreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CubridPreparedStatement")
            .field("conn", &self.conn)
            .field("req", &self.req)
            .field("param_count", &self.params.param_count())
            .field("freed", &self.freed)
            .finish()
    }
}
