//! # インフラ層エラー定義
//!
//! データベースとの通信で発生するエラーを表現する。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別（Database, Migration 等）
//!
//! `Display` は種別のメッセージのみを出力する。API 層はこの文字列を
//! エラーレスポンスの `details` にそのまま載せる。

use std::fmt;

use carlot_domain::DomainError;
use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// `From<sqlx::Error>` 等の変換や convenience constructor でエラーを生成すると、
/// その時点のスパン情報が自動的にキャプチャされる。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// データベースエラー
    ///
    /// 接続取得の失敗、SQL 実行の失敗、制約違反など。
    #[error("{0}")]
    Database(#[source] sqlx::Error),

    /// マイグレーションエラー
    #[error("{0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// 保存済みデータがドメインの表現に変換できない
    #[error("{0}")]
    Domain(#[source] DomainError),

    /// 予期しないエラー
    #[error("{0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 予期しないエラーを生成する
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Unexpected(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Database(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for InfraError {
    fn from(source: sqlx::migrate::MigrateError) -> Self {
        Self {
            kind:       InfraErrorKind::Migration(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<DomainError> for InfraError {
    fn from(source: DomainError) -> Self {
        Self {
            kind:       InfraErrorKind::Domain(source),
            span_trace: SpanTrace::capture(),
        }
    }
}
