//! In-memory stand-in for the native CCI client.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::client::{
    BindValue, BlobHandle, CciError, ColumnInfo, ConnHandle, CubridClient, CursorStatus,
    IsolationLevel, LobData, ReqHandle, TextData, TranDisposition, UType,
};

use super::sql::{Cell, Command, Database, Term};

/// Native calls that can be armed to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Connect,
    Prepare,
    BindParam,
    Execute,
    EndTran,
    Cursor,
    Fetch,
    GetData,
    BlobNew,
    BlobWrite,
    BlobSize,
    BlobRead,
    RowCount,
    LastInsertId,
    Disconnect,
    CloseRequest,
}

/// Session knobs as the adapter applied them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub autocommit: Option<bool>,
    pub lock_timeout_ms: Option<i32>,
    pub isolation: Option<IsolationLevel>,
    pub query_timeout_ms: Option<i32>,
}

#[derive(Debug)]
struct ConnState {
    open: bool,
    settings: SessionSettings,
}

#[derive(Debug)]
struct ReqState {
    command: Command,
    binds: HashMap<usize, BindValue>,
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Cell>>,
    /// 1-based position of the current row; 0 before the first advance.
    cursor: usize,
    fetched: bool,
    open: bool,
}

#[derive(Debug)]
struct BlobState {
    bytes: Vec<u8>,
    freed: bool,
}

#[derive(Default)]
struct FakeState {
    db: Database,
    /// Pre-transaction copy, taken at the first mutation; dropped on commit,
    /// restored on rollback.
    snapshot: Option<Database>,
    conns: HashMap<i32, ConnState>,
    reqs: HashMap<i32, ReqState>,
    blobs: HashMap<i32, BlobState>,
    next_handle: i32,
    failures: HashSet<FailPoint>,
    last_insert_id_unavailable: bool,
    short_blob_write: Option<usize>,
    last_affected: i64,
    insert_counter: i64,
    bind_calls: usize,
    cursor_calls: usize,
    commits: usize,
    rollbacks: usize,
    blob_frees: usize,
    disconnects: usize,
    runtime_loads: usize,
    runtime_unloads: usize,
}

impl FakeState {
    fn check(&self, point: FailPoint, code: i32, msg: &str) -> Result<(), CciError> {
        if self.failures.contains(&point) {
            Err(CciError::new(code, msg))
        } else {
            Ok(())
        }
    }

    fn fresh_handle(&mut self) -> i32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn req(&mut self, req: ReqHandle) -> Result<&mut ReqState, CciError> {
        self.reqs
            .get_mut(&req.raw())
            .filter(|r| r.open)
            .ok_or_else(|| CciError::new(-10, "request handle not open"))
    }

    fn blob(&mut self, blob: BlobHandle) -> Result<&mut BlobState, CciError> {
        let state = self
            .blobs
            .get_mut(&blob.raw())
            .ok_or_else(|| CciError::new(-11, "unknown blob handle"))?;
        if state.freed {
            return Err(CciError::new(-11, "blob handle already released"));
        }
        Ok(state)
    }

    fn take_snapshot(&mut self) {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.db.clone());
        }
    }

    /// Turn a bound value into a storable cell, resolving blob handles into
    /// their staged bytes.
    fn resolve_bind(&mut self, value: &BindValue) -> Result<Cell, CciError> {
        Ok(match value {
            BindValue::Null(_) => Cell::Null,
            BindValue::Int(v) => Cell::Int(i64::from(*v)),
            BindValue::Bigint(v) => Cell::Int(*v),
            BindValue::Double(v) => Cell::Double(*v),
            BindValue::Text(s) => Cell::Text(s.clone()),
            BindValue::Blob(h) => Cell::Bytes(self.blob(*h)?.bytes.clone()),
        })
    }

    fn resolve_terms(&mut self, terms: &[Term], binds: &HashMap<usize, BindValue>) -> Result<Vec<Cell>, CciError> {
        let mut hole = 0usize;
        let mut cells = Vec::with_capacity(terms.len());
        for term in terms {
            cells.push(match term {
                Term::Literal(cell) => cell.clone(),
                Term::Placeholder => {
                    hole += 1;
                    match binds.get(&hole) {
                        Some(v) => self.resolve_bind(&v.clone())?,
                        None => Cell::Null,
                    }
                }
            });
        }
        Ok(cells)
    }
}

/// In-memory [`CubridClient`] double.
///
/// Thread-safe via one internal lock; every call takes it for its full
/// duration, matching the serialized-use contract of the real client.
pub struct FakeClient {
    state: Mutex<FakeState>,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Arm `point` to fail until [`clear_failures`](Self::clear_failures).
    pub fn fail(&self, point: FailPoint) {
        self.lock().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Simulate an installation whose client library lacks the
    /// last-insert-id entry point.
    pub fn set_last_insert_id_unavailable(&self) {
        self.lock().last_insert_id_unavailable = true;
    }

    /// Make blob writes stop short after `n` bytes.
    pub fn set_short_blob_write(&self, n: usize) {
        self.lock().short_blob_write = Some(n);
    }

    pub fn open_request_count(&self) -> usize {
        self.lock().reqs.values().filter(|r| r.open).count()
    }

    pub fn live_blob_count(&self) -> usize {
        self.lock().blobs.values().filter(|b| !b.freed).count()
    }

    pub fn blob_free_count(&self) -> usize {
        self.lock().blob_frees
    }

    pub fn bind_call_count(&self) -> usize {
        self.lock().bind_calls
    }

    pub fn cursor_call_count(&self) -> usize {
        self.lock().cursor_calls
    }

    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    pub fn rollback_count(&self) -> usize {
        self.lock().rollbacks
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    pub fn runtime_load_count(&self) -> usize {
        self.lock().runtime_loads
    }

    pub fn runtime_unload_count(&self) -> usize {
        self.lock().runtime_unloads
    }

    pub fn table_row_count(&self, table: &str) -> Option<usize> {
        self.lock().db.row_count(table)
    }

    /// Settings of the most recently opened session.
    pub fn last_session_settings(&self) -> Option<SessionSettings> {
        let s = self.lock();
        s.conns
            .keys()
            .max()
            .and_then(|id| s.conns.get(id))
            .map(|c| c.settings.clone())
    }
}

impl CubridClient for FakeClient {
    fn connect(
        &self,
        host: &str,
        _port: u16,
        database: &str,
        _user: &str,
        _password: &str,
        _connect_timeout_ms: i32,
    ) -> Result<ConnHandle, CciError> {
        let mut s = self.lock();
        s.check(
            FailPoint::Connect,
            -1,
            &format!("cannot connect to {database}@{host}"),
        )?;
        let id = s.fresh_handle();
        s.conns.insert(
            id,
            ConnState {
                open: true,
                settings: SessionSettings {
                    autocommit: None,
                    lock_timeout_ms: None,
                    isolation: None,
                    query_timeout_ms: None,
                },
            },
        );
        Ok(ConnHandle::from_raw(id))
    }

    fn disconnect(&self, conn: ConnHandle) -> Result<(), CciError> {
        let mut s = self.lock();
        s.check(FailPoint::Disconnect, -2, "disconnect failed")?;
        let c = s
            .conns
            .get_mut(&conn.raw())
            .filter(|c| c.open)
            .ok_or_else(|| CciError::new(-2, "connection handle not open"))?;
        c.open = false;
        s.disconnects += 1;
        Ok(())
    }

    fn set_autocommit(&self, conn: ConnHandle, on: bool) -> Result<(), CciError> {
        let mut s = self.lock();
        s.conns
            .get_mut(&conn.raw())
            .ok_or_else(|| CciError::new(-2, "connection handle not open"))?
            .settings
            .autocommit = Some(on);
        Ok(())
    }

    fn set_lock_timeout(&self, conn: ConnHandle, ms: i32) -> Result<(), CciError> {
        let mut s = self.lock();
        s.conns
            .get_mut(&conn.raw())
            .ok_or_else(|| CciError::new(-2, "connection handle not open"))?
            .settings
            .lock_timeout_ms = Some(ms);
        Ok(())
    }

    fn set_isolation_level(
        &self,
        conn: ConnHandle,
        level: IsolationLevel,
    ) -> Result<(), CciError> {
        let mut s = self.lock();
        s.conns
            .get_mut(&conn.raw())
            .ok_or_else(|| CciError::new(-2, "connection handle not open"))?
            .settings
            .isolation = Some(level);
        Ok(())
    }

    fn set_query_timeout(&self, conn: ConnHandle, ms: i32) -> Result<(), CciError> {
        let mut s = self.lock();
        s.conns
            .get_mut(&conn.raw())
            .ok_or_else(|| CciError::new(-2, "connection handle not open"))?
            .settings
            .query_timeout_ms = Some(ms);
        Ok(())
    }

    fn prepare(&self, conn: ConnHandle, sql: &str) -> Result<ReqHandle, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::Prepare, -3, "prepare failed")?;
        if !s.conns.get(&conn.raw()).is_some_and(|c| c.open) {
            return Err(CciError::new(-2, "connection handle not open"));
        }
        let command = Command::parse(sql).map_err(|msg| CciError::new(-3, msg))?;
        let id = s.fresh_handle();
        s.reqs.insert(
            id,
            ReqState {
                command,
                binds: HashMap::new(),
                columns: Vec::new(),
                rows: Vec::new(),
                cursor: 0,
                fetched: false,
                open: true,
            },
        );
        Ok(ReqHandle::from_raw(id))
    }

    fn bind_count(&self, req: ReqHandle) -> usize {
        self.lock()
            .reqs
            .get(&req.raw())
            .map_or(0, |r| r.command.placeholder_count())
    }

    fn bind_param(&self, req: ReqHandle, index: usize, value: &BindValue) -> Result<(), CciError> {
        let mut s = self.lock();
        s.bind_calls += 1;
        s.check(FailPoint::BindParam, -4, "bind failed")?;
        let count = s.req(req)?.command.placeholder_count();
        if index == 0 || index > count {
            return Err(CciError::new(-4, "bind index out of range"));
        }
        s.req(req)?.binds.insert(index, value.clone());
        Ok(())
    }

    fn execute(&self, req: ReqHandle) -> Result<i64, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::Execute, -5, "execute failed")?;
        let state = s.req(req)?;
        let command = state.command.clone();
        let binds = state.binds.clone();
        let map = |msg: String| CciError::new(-5, msg);
        let (columns, rows, affected) = match command {
            Command::Ping => {
                let info = ColumnInfo {
                    name: "1+1".to_owned(),
                    utype: UType::Int,
                    precision: 0,
                    non_null: true,
                };
                (vec![info], vec![vec![Cell::Int(2)]], 1)
            }
            Command::CreateTable { table, columns } => {
                s.take_snapshot();
                s.db.create_table(&table, columns).map_err(map)?;
                (Vec::new(), Vec::new(), 0)
            }
            Command::Insert {
                table,
                columns,
                values,
            } => {
                let cells = s.resolve_terms(&values, &binds)?;
                s.take_snapshot();
                let affected = s.db.insert(&table, columns.as_deref(), cells).map_err(map)?;
                s.insert_counter += 1;
                (Vec::new(), Vec::new(), affected)
            }
            Command::Select {
                table,
                columns,
                filter,
            } => {
                let filter_cell = match &filter {
                    Some(f) => Some(match &f.value {
                        Term::Literal(cell) => cell.clone(),
                        Term::Placeholder => match binds.get(&1) {
                            Some(v) => s.resolve_bind(&v.clone())?,
                            None => Cell::Null,
                        },
                    }),
                    None => None,
                };
                let filter_ref = filter
                    .as_ref()
                    .zip(filter_cell.as_ref())
                    .map(|(f, cell)| (f.column.as_str(), cell));
                let (infos, rows) =
                    s.db.select(&table, columns.as_deref(), filter_ref)
                        .map_err(map)?;
                let affected = rows.len() as i64;
                (infos, rows, affected)
            }
            Command::Delete { table, filter } => {
                let filter_cell = match &filter {
                    Some(f) => Some(match &f.value {
                        Term::Literal(cell) => cell.clone(),
                        Term::Placeholder => match binds.get(&1) {
                            Some(v) => s.resolve_bind(&v.clone())?,
                            None => Cell::Null,
                        },
                    }),
                    None => None,
                };
                let filter_ref = filter
                    .as_ref()
                    .zip(filter_cell.as_ref())
                    .map(|(f, cell)| (f.column.as_str(), cell));
                s.take_snapshot();
                let affected = s.db.delete(&table, filter_ref).map_err(map)?;
                (Vec::new(), Vec::new(), affected)
            }
        };
        s.last_affected = affected;
        let state = s.req(req)?;
        state.columns = columns;
        state.rows = rows;
        state.cursor = 0;
        state.fetched = false;
        Ok(affected)
    }

    fn end_tran(&self, _conn: ConnHandle, disposition: TranDisposition) -> Result<(), CciError> {
        let mut s = self.lock();
        s.check(FailPoint::EndTran, -6, "end transaction failed")?;
        match disposition {
            TranDisposition::Commit => {
                s.commits += 1;
                s.snapshot = None;
            }
            TranDisposition::Rollback => {
                s.rollbacks += 1;
                if let Some(db) = s.snapshot.take() {
                    s.db = db;
                }
            }
        }
        Ok(())
    }

    fn result_info(&self, req: ReqHandle) -> Result<Vec<ColumnInfo>, CciError> {
        let mut s = self.lock();
        Ok(s.req(req)?.columns.clone())
    }

    fn cursor_next(&self, req: ReqHandle) -> Result<CursorStatus, CciError> {
        let mut s = self.lock();
        s.cursor_calls += 1;
        s.check(FailPoint::Cursor, -7, "cursor failed")?;
        let state = s.req(req)?;
        if state.cursor < state.rows.len() {
            state.cursor += 1;
            state.fetched = false;
            Ok(CursorStatus::Row)
        } else {
            Ok(CursorStatus::NoMoreData)
        }
    }

    fn fetch(&self, req: ReqHandle) -> Result<(), CciError> {
        let mut s = self.lock();
        s.check(FailPoint::Fetch, -8, "fetch failed")?;
        let state = s.req(req)?;
        if state.cursor == 0 || state.cursor > state.rows.len() {
            return Err(CciError::new(-8, "no current row"));
        }
        state.fetched = true;
        Ok(())
    }

    fn get_data_text(&self, req: ReqHandle, column: usize) -> Result<TextData, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::GetData, -9, "get data failed")?;
        let state = s.req(req)?;
        if !state.fetched {
            return Err(CciError::new(-9, "row not fetched"));
        }
        let row = &state.rows[state.cursor - 1];
        let cell = row
            .get(column.wrapping_sub(1))
            .ok_or_else(|| CciError::new(-9, "column index out of range"))?;
        let text = match cell {
            Cell::Null => {
                return Ok(TextData {
                    indicator: -1,
                    buffer: Vec::new(),
                });
            }
            Cell::Int(v) => v.to_string(),
            Cell::Double(v) => v.to_string(),
            Cell::Text(t) => t.clone(),
            Cell::Bytes(_) => return Err(CciError::new(-9, "lob column read as text")),
        };
        // Real client buffers carry a terminator past the indicated length.
        let mut buffer = text.into_bytes();
        let indicator = buffer.len() as i32;
        buffer.push(0);
        Ok(TextData { indicator, buffer })
    }

    fn get_data_lob(&self, req: ReqHandle, column: usize) -> Result<LobData, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::GetData, -9, "get data failed")?;
        let state = s.req(req)?;
        if !state.fetched {
            return Err(CciError::new(-9, "row not fetched"));
        }
        let row = &state.rows[state.cursor - 1];
        let cell = row
            .get(column.wrapping_sub(1))
            .ok_or_else(|| CciError::new(-9, "column index out of range"))?
            .clone();
        let bytes = match cell {
            Cell::Null => {
                return Ok(LobData {
                    indicator: -1,
                    handle: None,
                });
            }
            Cell::Bytes(b) => b,
            Cell::Text(t) => t.into_bytes(),
            other => return Err(CciError::new(-9, format!("not a lob column: {other:?}"))),
        };
        // Every read hands out a fresh handle the caller must release.
        let id = s.fresh_handle();
        let indicator = bytes.len() as i32;
        s.blobs.insert(id, BlobState { bytes, freed: false });
        Ok(LobData {
            indicator,
            handle: Some(BlobHandle::from_raw(id)),
        })
    }

    fn blob_new(&self, _conn: ConnHandle) -> Result<BlobHandle, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::BlobNew, -12, "blob allocation failed")?;
        let id = s.fresh_handle();
        s.blobs.insert(
            id,
            BlobState {
                bytes: Vec::new(),
                freed: false,
            },
        );
        Ok(BlobHandle::from_raw(id))
    }

    fn blob_write(
        &self,
        _conn: ConnHandle,
        blob: BlobHandle,
        offset: u64,
        bytes: &[u8],
    ) -> Result<usize, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::BlobWrite, -13, "blob write failed")?;
        let take = s.short_blob_write.map_or(bytes.len(), |n| n.min(bytes.len()));
        let state = s.blob(blob)?;
        let offset = offset as usize;
        if state.bytes.len() < offset + take {
            state.bytes.resize(offset + take, 0);
        }
        state.bytes[offset..offset + take].copy_from_slice(&bytes[..take]);
        Ok(take)
    }

    fn blob_size(&self, blob: BlobHandle) -> Result<u64, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::BlobSize, -14, "blob size failed")?;
        Ok(s.blob(blob)?.bytes.len() as u64)
    }

    fn blob_read(
        &self,
        _conn: ConnHandle,
        blob: BlobHandle,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>, CciError> {
        let mut s = self.lock();
        s.check(FailPoint::BlobRead, -15, "blob read failed")?;
        let state = s.blob(blob)?;
        let offset = offset as usize;
        let end = (offset + len as usize).min(state.bytes.len());
        if offset > state.bytes.len() {
            return Err(CciError::new(-15, "blob read past end"));
        }
        Ok(state.bytes[offset..end].to_vec())
    }

    fn blob_free(&self, blob: BlobHandle) -> Result<(), CciError> {
        let mut s = self.lock();
        s.blob(blob)?.freed = true;
        s.blob_frees += 1;
        Ok(())
    }

    fn close_request(&self, req: ReqHandle) -> Result<(), CciError> {
        let mut s = self.lock();
        s.check(FailPoint::CloseRequest, -10, "close request failed")?;
        s.req(req)?.open = false;
        Ok(())
    }

    fn row_count(&self, _conn: ConnHandle) -> Result<i64, CciError> {
        let s = self.lock();
        s.check(FailPoint::RowCount, -16, "row count failed")?;
        Ok(s.last_affected)
    }

    fn last_insert_id(&self, _conn: ConnHandle) -> Result<Option<String>, CciError> {
        let s = self.lock();
        if s.last_insert_id_unavailable {
            return Ok(None);
        }
        s.check(FailPoint::LastInsertId, -17, "last insert id failed")?;
        Ok(Some(s.insert_counter.to_string()))
    }

    fn runtime_load(&self) {
        self.lock().runtime_loads += 1;
    }

    fn runtime_unload(&self) {
        self.lock().runtime_unloads += 1;
    }
}
