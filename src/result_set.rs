//! Result set adapter: cursor state machine, metadata, column reads.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{
    BlobHandle, CCI_ER_NO_ERROR, CciError, ColumnInfo, ConnHandle, CubridClient, CursorStatus,
    ReqHandle, UType,
};
use crate::error::CubridAdapterError;

/// Display length reported for collection, LOB and object columns, whose
/// real size is unknowable from metadata.
pub const MAX_CUBRID_CHAR_LEN: i64 = 1_073_741_823;

const MAX_LEN_INTEGER: i64 = 11;
const MAX_LEN_SMALLINT: i64 = 6;
const MAX_LEN_BIGINT: i64 = 20;
const MAX_LEN_FLOAT: i64 = 15;
const MAX_LEN_DOUBLE: i64 = 29;
const MAX_LEN_MONETARY: i64 = 30;
const MAX_LEN_DATE: i64 = 10;
const MAX_LEN_TIME: i64 = 8;
const MAX_LEN_TIMESTAMP: i64 = 23;
const MAX_LEN_DATETIME: i64 = 23;

/// Maximum display width of a column type; -1 means "use the declared
/// precision".
fn utype_display_len(utype: UType) -> i64 {
    match utype {
        UType::Char
        | UType::String
        | UType::NChar
        | UType::VarNChar
        | UType::Bit
        | UType::VarBit
        | UType::Numeric
        | UType::ResultSet => -1,
        UType::Int => MAX_LEN_INTEGER,
        UType::Short => MAX_LEN_SMALLINT,
        UType::Bigint => MAX_LEN_BIGINT,
        UType::Float => MAX_LEN_FLOAT,
        UType::Double => MAX_LEN_DOUBLE,
        UType::Monetary => MAX_LEN_MONETARY,
        UType::Date => MAX_LEN_DATE,
        UType::Time => MAX_LEN_TIME,
        UType::Timestamp => MAX_LEN_TIMESTAMP,
        UType::Datetime => MAX_LEN_DATETIME,
        UType::Null => 0,
        UType::Unknown
        | UType::Set
        | UType::Multiset
        | UType::Sequence
        | UType::Object
        | UType::Blob
        | UType::Clob => MAX_CUBRID_CHAR_LEN,
    }
}

/// Cursor over an executed statement's rows.
///
/// Advancement is strictly forward. Three things stop the cursor for good:
/// natural exhaustion, reaching the connection's row cap, and a native
/// cursor/fetch failure. Once stopped, [`next`](Self::next) reports false
/// and never resumes.
pub struct CubridResultSet {
    client: Arc<dyn CubridClient>,
    conn: ConnHandle,
    req: ReqHandle,
    owns_handle: bool,
    max_rows: i32,
    current_row: i32,
    stopped: bool,
    last_error_code: i32,
    last_error_message: String,
    columns: Vec<ColumnInfo>,
    freed: bool,
}

impl CubridResultSet {
    /// Resolve column metadata and wrap the executed request.
    ///
    /// `owns_handle` says whether closing this result set closes the native
    /// statement handle; a result set produced by a prepared statement
    /// leaves the handle to the statement.
    pub(crate) fn new(
        client: Arc<dyn CubridClient>,
        conn: ConnHandle,
        req: ReqHandle,
        max_rows: i32,
        owns_handle: bool,
    ) -> Result<Self, CubridAdapterError> {
        let columns = client.result_info(req).map_err(|e| {
            CubridAdapterError::CursorError(format!("result description failed: {e}"))
        })?;
        let mut stopped = false;
        if columns.is_empty() {
            warn!("statement produced no result columns");
            stopped = true;
        }
        Ok(Self {
            client,
            conn,
            req,
            owns_handle,
            max_rows,
            current_row: 0,
            stopped,
            last_error_code: CCI_ER_NO_ERROR,
            last_error_message: String::new(),
            columns,
            freed: false,
        })
    }

    /// Advance to the next row. `Ok(false)` means exhausted or capped; an
    /// `Err` means a native cursor failure and leaves the cursor stopped.
    pub fn next(&mut self) -> Result<bool, CubridAdapterError> {
        if self.stopped {
            return Ok(false);
        }
        if self.max_rows != 0 {
            if self.current_row >= self.max_rows {
                self.stopped = true;
                return Ok(false);
            }
            self.current_row += 1;
        }
        match self.client.cursor_next(self.req) {
            Ok(CursorStatus::NoMoreData) => {
                self.stopped = true;
                Ok(false)
            }
            Ok(CursorStatus::Row) => match self.client.fetch(self.req) {
                Ok(()) => Ok(true),
                Err(e) => Err(self.fail_cursor(&e)),
            },
            Err(e) => Err(self.fail_cursor(&e)),
        }
    }

    fn fail_cursor(&mut self, e: &CciError) -> CubridAdapterError {
        self.stopped = true;
        self.set_last_error(e);
        CubridAdapterError::CursorError(format!("cursor advance failed: {msg}", msg = e.message))
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Name of column `index` (1-based); `None` when out of range.
    #[must_use]
    pub fn column_name(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return None;
        }
        self.columns.get(index - 1).map(|c| c.name.as_str())
    }

    /// Maximum display width of column `index` (1-based).
    ///
    /// 0 for nullable columns; the declared precision for variable-width
    /// types (numeric gains two for sign and separator); a fixed width per
    /// type otherwise, with an unbounded sentinel for collections and LOBs.
    pub fn column_size(&self, index: usize) -> Result<i64, CubridAdapterError> {
        let info = self.column_info(index)?;
        if !info.non_null {
            return Ok(0);
        }
        if info.utype.is_collection() {
            return Ok(MAX_CUBRID_CHAR_LEN);
        }
        let len = utype_display_len(info.utype);
        if len >= 0 {
            return Ok(len);
        }
        let mut size = i64::from(info.precision);
        if info.utype == UType::Numeric {
            size += 2;
        }
        Ok(size)
    }

    /// Read column `index` (1-based) of the current row as text.
    ///
    /// `Ok(None)` is SQL NULL. Exactly the indicated number of bytes is
    /// taken from the native buffer; invalid UTF-8 is recovered lossily.
    pub fn get_string(&mut self, index: usize) -> Result<Option<String>, CubridAdapterError> {
        self.column_info(index)?;
        let data = match self.client.get_data_text(self.req, index) {
            Ok(data) => data,
            Err(e) => {
                self.set_last_error(&e);
                return Err(CubridAdapterError::DataAccessError(format!(
                    "get data failed: {msg}",
                    msg = e.message
                )));
            }
        };
        if data.indicator < 0 {
            return Ok(None);
        }
        let take = (data.indicator as usize).min(data.buffer.len());
        Ok(Some(
            String::from_utf8_lossy(&data.buffer[..take]).into_owned(),
        ))
    }

    /// Read column `index` (1-based) of the current row as blob bytes.
    ///
    /// `Ok(None)` is SQL NULL or an empty blob. The native blob handle the
    /// read produces is released exactly once on every path.
    pub fn get_blob(&mut self, index: usize) -> Result<Option<Vec<u8>>, CubridAdapterError> {
        self.column_info(index)?;
        let lob = match self.client.get_data_lob(self.req, index) {
            Ok(lob) => lob,
            Err(e) => {
                self.set_last_error(&e);
                return Err(CubridAdapterError::DataAccessError(format!(
                    "get data failed: {msg}",
                    msg = e.message
                )));
            }
        };
        if lob.indicator < 0 {
            return Ok(None);
        }
        let Some(blob) = lob.handle else {
            return Ok(None);
        };
        let size = match self.client.blob_size(blob) {
            Ok(size) => size,
            Err(e) => {
                self.release_blob(blob);
                self.set_last_error(&e);
                return Err(CubridAdapterError::DataAccessError(format!(
                    "blob size failed: {msg}",
                    msg = e.message
                )));
            }
        };
        if size == 0 {
            self.release_blob(blob);
            return Ok(None);
        }
        let read = self.client.blob_read(self.conn, blob, 0, size);
        self.release_blob(blob);
        match read {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                self.set_last_error(&e);
                Err(CubridAdapterError::DataAccessError(format!(
                    "blob read failed: {msg}",
                    msg = e.message
                )))
            }
        }
    }

    /// Message of the most recent native failure on this result set.
    #[must_use]
    pub fn last_error(&self) -> &str {
        if self.last_error_code == CCI_ER_NO_ERROR {
            ""
        } else {
            &self.last_error_message
        }
    }

    fn column_info(&self, index: usize) -> Result<&ColumnInfo, CubridAdapterError> {
        if index == 0 || index > self.columns.len() {
            return Err(CubridAdapterError::DataAccessError(
                "Column index is out of range".to_owned(),
            ));
        }
        Ok(&self.columns[index - 1])
    }

    fn set_last_error(&mut self, e: &CciError) {
        self.last_error_code = e.code;
        self.last_error_message.clear();
        self.last_error_message.push_str(&e.message);
    }

    fn release_blob(&self, blob: BlobHandle) {
        if let Err(e) = self.client.blob_free(blob) {
            debug!(error = %e, "blob release failed");
        }
    }

    /// Close the result set; releases the statement handle only when this
    /// result set owns it. Idempotent.
    pub fn close(&mut self) {
        if self.freed {
            return;
        }
        self.freed = true;
        if self.owns_handle {
            if let Err(e) = self.client.close_request(self.req) {
                debug!(error = %e, "close of result set statement failed");
            }
        }
    }
}

impl Drop for CubridResultSet {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CubridResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CubridResultSet")
            .field("req", &self.req)
            .field("owns_handle", &self.owns_handle)
            .field("max_rows", &self.max_rows)
            .field("current_row", &self.current_row)
            .field("stopped", &self.stopped)
            .field("columns", &self.columns.len())
            .finish()
    }
}
