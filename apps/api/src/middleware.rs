//! # ミドルウェア
//!
//! 車両 API 用のミドルウェアを提供する。

mod connection_scope;

pub use connection_scope::{ConnectionScopeState, RequestConnection, scope_connection};
