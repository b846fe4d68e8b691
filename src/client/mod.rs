//! The native client boundary.
//!
//! Everything the adapters need from the CUBRID CCI client library is
//! expressed as the [`CubridClient`] trait. Native session, statement and
//! blob handles are opaque newtypes so they can never be confused with each
//! other or with plain integers; only a client implementation converts them
//! to and from raw ids.

use thiserror::Error;

/// Native "no error" status code.
pub const CCI_ER_NO_ERROR: i32 = 0;

/// One established database session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnHandle(i32);

impl ConnHandle {
    /// Wrap a raw native connection id. Intended for [`CubridClient`]
    /// implementations only.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// One prepared request (statement/cursor) on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReqHandle(i32);

impl ReqHandle {
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// One native large-object resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle(i32);

impl BlobHandle {
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// A native failure: status code plus the client's message buffer.
#[derive(Debug, Clone, Error)]
#[error("cci error {code}: {message}")]
pub struct CciError {
    pub code: i32,
    pub message: String,
}

impl CciError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Native column/bind type codes (the CCI `T_CCI_U_TYPE` set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UType {
    Null,
    Unknown,
    Char,
    String,
    NChar,
    VarNChar,
    Bit,
    VarBit,
    Numeric,
    Int,
    Short,
    Bigint,
    Monetary,
    Float,
    Double,
    Date,
    Time,
    Datetime,
    Timestamp,
    Set,
    Multiset,
    Sequence,
    ResultSet,
    Object,
    Blob,
    Clob,
}

impl UType {
    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(self, UType::Set | UType::Multiset | UType::Sequence)
    }
}

/// Transaction end disposition (`cci_end_tran`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranDisposition {
    Commit,
    Rollback,
}

/// CUBRID transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    CommitClassUncommitInstance,
    CommitClassCommitInstance,
    RepClassUncommitInstance,
    RepClassCommitInstance,
    RepClassRepInstance,
    Serializable,
}

/// Typed value handed to [`CubridClient::bind_param`].
///
/// A SQL NULL carries the slot's declared native type so the client can bind
/// it with the proper type/null-flag pair.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null(UType),
    Int(i32),
    Bigint(i64),
    Double(f64),
    Text(String),
    Blob(BlobHandle),
}

/// Outcome of advancing the cursor by one row.
///
/// Exhaustion is an ordinary outcome, not an error; only genuine native
/// failures surface as [`CciError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
    Row,
    NoMoreData,
}

/// Per-column metadata from statement description.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub utype: UType,
    /// Declared precision; meaningful for variable-length types.
    pub precision: i32,
    /// Whether the column carries a NOT NULL constraint.
    pub non_null: bool,
}

/// Raw text column read.
///
/// `indicator < 0` means SQL NULL; otherwise it is the value's byte length.
/// The buffer may be longer than the indicator (client-internal terminator
/// or padding) — callers must take exactly `indicator` bytes.
#[derive(Debug, Clone)]
pub struct TextData {
    pub indicator: i32,
    pub buffer: Vec<u8>,
}

/// Raw blob column read: the handle is present only for non-NULL values.
#[derive(Debug, Clone)]
pub struct LobData {
    pub indicator: i32,
    pub handle: Option<BlobHandle>,
}

/// The CCI call surface the adapters depend on.
///
/// Implementations own the mapping from opaque handles to whatever the
/// native runtime uses, and must report failures as [`CciError`] with the
/// native code and message buffer. All calls block until the backend
/// responds; none are reentrant per handle.
pub trait CubridClient {
    /// Establish a session. The connect timeout is advisory; clients without
    /// a per-connect timeout knob may ignore it.
    fn connect(
        &self,
        host: &str,
        port: u16,
        database: &str,
        user: &str,
        password: &str,
        connect_timeout_ms: i32,
    ) -> Result<ConnHandle, CciError>;

    fn disconnect(&self, conn: ConnHandle) -> Result<(), CciError>;

    fn set_autocommit(&self, conn: ConnHandle, on: bool) -> Result<(), CciError>;

    fn set_lock_timeout(&self, conn: ConnHandle, ms: i32) -> Result<(), CciError>;

    fn set_isolation_level(&self, conn: ConnHandle, level: IsolationLevel)
    -> Result<(), CciError>;

    fn set_query_timeout(&self, conn: ConnHandle, ms: i32) -> Result<(), CciError>;

    fn prepare(&self, conn: ConnHandle, sql: &str) -> Result<ReqHandle, CciError>;

    /// Declared bind-parameter count of a prepared request; 0 when the
    /// handle is unknown.
    fn bind_count(&self, req: ReqHandle) -> usize;

    /// Bind one parameter. `index` is 1-based.
    fn bind_param(&self, req: ReqHandle, index: usize, value: &BindValue) -> Result<(), CciError>;

    /// Execute a prepared request; returns the affected/row count.
    fn execute(&self, req: ReqHandle) -> Result<i64, CciError>;

    fn end_tran(&self, conn: ConnHandle, disposition: TranDisposition) -> Result<(), CciError>;

    /// Describe the result columns of an executed request. Empty for
    /// statements that produce no result rows.
    fn result_info(&self, req: ReqHandle) -> Result<Vec<ColumnInfo>, CciError>;

    fn cursor_next(&self, req: ReqHandle) -> Result<CursorStatus, CciError>;

    /// Transfer the current row into the client's fetch buffer.
    fn fetch(&self, req: ReqHandle) -> Result<(), CciError>;

    /// Read column `column` (1-based) of the fetched row as text.
    fn get_data_text(&self, req: ReqHandle, column: usize) -> Result<TextData, CciError>;

    /// Read column `column` (1-based) of the fetched row as a blob handle.
    /// A returned handle is owned by the caller and must be released with
    /// [`blob_free`](Self::blob_free) exactly once.
    fn get_data_lob(&self, req: ReqHandle, column: usize) -> Result<LobData, CciError>;

    fn blob_new(&self, conn: ConnHandle) -> Result<BlobHandle, CciError>;

    /// Write `bytes` at `offset`; returns the number of bytes written.
    fn blob_write(
        &self,
        conn: ConnHandle,
        blob: BlobHandle,
        offset: u64,
        bytes: &[u8],
    ) -> Result<usize, CciError>;

    fn blob_size(&self, blob: BlobHandle) -> Result<u64, CciError>;

    fn blob_read(
        &self,
        conn: ConnHandle,
        blob: BlobHandle,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>, CciError>;

    fn blob_free(&self, blob: BlobHandle) -> Result<(), CciError>;

    fn close_request(&self, req: ReqHandle) -> Result<(), CciError>;

    /// Affected-row count of the session's most recent statement.
    fn row_count(&self, conn: ConnHandle) -> Result<i64, CciError>;

    /// Most recent auto-generated identifier, via an optionally-absent
    /// extension entry point. `Ok(None)` means the entry point is
    /// unavailable on this installation; callers degrade to 0.
    fn last_insert_id(&self, conn: ConnHandle) -> Result<Option<String>, CciError>;

    /// Process-wide runtime initialization hook; runs once before the first
    /// connection. Default no-op for clients with nothing to load.
    fn runtime_load(&self) {}

    /// Process-wide runtime teardown hook; runs once at shutdown.
    fn runtime_unload(&self) {}
}
