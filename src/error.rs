use thiserror::Error;

/// Errors raised by the adapter.
///
/// The taxonomy follows where a failure is detected: connection
/// establishment, statement prepare/bind/execute, cursor advancement, or
/// column data access. Boolean-returning connection operations (ping,
/// execute, commit, rollback) never raise these; they record the native
/// message, retrievable via `last_error`, and report success in their return
/// value. That dual contract is deliberate and should not be unified.
#[derive(Debug, Error)]
pub enum CubridAdapterError {
    #[error("Connect error: {0}")]
    ConnectError(String),

    #[error("Statement error: {0}")]
    StatementError(String),

    #[error("Cursor error: {0}")]
    CursorError(String),

    #[error("Data access error: {0}")]
    DataAccessError(String),
}
