//! Test doubles for the native client boundary.
//!
//! [`FakeClient`] is an in-memory stand-in for the CUBRID CCI library:
//! handles, blobs and a tiny SQL engine, plus failure injection and call
//! counters so tests can observe resource discipline (handle releases, blob
//! frees, bind calls) that the public API deliberately hides.

mod fake;
mod sql;

pub use fake::{FailPoint, FakeClient, SessionSettings};
