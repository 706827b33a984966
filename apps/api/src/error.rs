//! # API エラーハンドリング
//!
//! ハンドラ・ミドルウェアのエラー定義と、HTTP レスポンスへの変換を行う。
//!
//! ## レスポンス形式
//!
//! すべてのエラーは [`ErrorResponse`] 形式の JSON で返す:
//!
//! ```json
//! {
//!   "error": "Failed to fetch cars",
//!   "details": "pool timed out while waiting for an open connection"
//! }
//! ```
//!
//! `error` は失敗した処理を表す固定文言、`details` は下位エラーのメッセージ。
//!
//! ## エラーの階層
//!
//! ```text
//! InfraError / JsonRejection / PathRejection / panic
//!        ↓ 変換
//! API エラー (ApiError)
//!        ↓ IntoResponse
//! HTTP レスポンス (StatusCode + ErrorResponse)
//! ```

use std::any::Any;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use carlot_domain::car::CarId;
use carlot_infra::InfraError;
use carlot_shared::ErrorResponse;
use derive_more::Display;
use thiserror::Error;

/// 失敗したクエリの種類
///
/// 表示文字列がそのまま `error` フィールドになる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum QueryAction {
    #[display("Failed to fetch cars")]
    FetchCars,
    #[display("Failed to create car")]
    CreateCar,
    #[display("Failed to update car")]
    UpdateCar,
    #[display("Failed to delete car")]
    DeleteCar,
}

/// API 層で発生するエラー
///
/// `Display` の文字列がレスポンスの `error` フィールドになる。
#[derive(Debug, Error)]
pub enum ApiError {
    /// プールから接続を取得できなかった（500）
    #[error("Database connection error")]
    ConnectionAcquire(#[source] InfraError),

    /// セッション変数の設定に失敗した（500）
    #[error("Database session error")]
    SessionSetup(#[source] InfraError),

    /// ハンドラの SQL が失敗した（500）
    #[error("{action}")]
    Query {
        action: QueryAction,
        #[source]
        source: InfraError,
    },

    /// リクエストボディ・パスが不正（400）
    #[error("Invalid request")]
    BadRequest(String),

    /// 対象の車両が存在しない（404）
    ///
    /// 一致行数の厳格チェックが有効な場合のみ使われる。
    #[error("Car not found")]
    NotFound(CarId),

    /// 予期しないエラー（500）
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn query(action: QueryAction, source: InfraError) -> Self {
        Self::Query { action, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ConnectionAcquire(_)
            | ApiError::SessionSetup(_)
            | ApiError::Query { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `details` フィールドに載せるメッセージ
    pub fn details(&self) -> String {
        match self {
            ApiError::ConnectionAcquire(e)
            | ApiError::SessionSetup(e)
            | ApiError::Query { source: e, .. } => e.to_string(),
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg.clone(),
            ApiError::NotFound(id) => format!("No car with id {id}"),
        }
    }

    fn infra_source(&self) -> Option<&InfraError> {
        match self {
            ApiError::ConnectionAcquire(e)
            | ApiError::SessionSetup(e)
            | ApiError::Query { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = self.details();

        if status.is_server_error() {
            match self.infra_source() {
                Some(source) => tracing::error!(
                    error = %self,
                    details = %details,
                    span_trace = %source.span_trace(),
                    "リクエストの処理に失敗しました"
                ),
                None => tracing::error!(
                    error = %self,
                    details = %details,
                    "リクエストの処理に失敗しました"
                ),
            }
        } else {
            tracing::warn!(error = %self, details = %details, "リクエストを拒否しました");
        }

        (status, Json(ErrorResponse::new(self.to_string(), details))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// パニックを 500 レスポンスに変換する
///
/// `CatchPanicLayer::custom` に渡す。
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };

    ApiError::Internal(details).into_response()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    async fn into_body(response: Response) -> ErrorResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[case(QueryAction::FetchCars, "Failed to fetch cars")]
    #[case(QueryAction::CreateCar, "Failed to create car")]
    #[case(QueryAction::UpdateCar, "Failed to update car")]
    #[case(QueryAction::DeleteCar, "Failed to delete car")]
    fn test_クエリ失敗のerror文言(#[case] action: QueryAction, #[case] expected: &str) {
        let sut = ApiError::query(action, InfraError::unexpected("boom"));

        assert_eq!(sut.to_string(), expected);
        assert_eq!(sut.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_接続取得エラーは500でdetailsに下位メッセージを含む() {
        let sut = ApiError::ConnectionAcquire(InfraError::unexpected("pool timed out"));

        let response = sut.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            into_body(response).await,
            ErrorResponse::new("Database connection error", "pool timed out")
        );
    }

    #[tokio::test]
    async fn test_セッション設定エラーは500() {
        let sut = ApiError::SessionSetup(InfraError::unexpected("unknown time zone"));

        let response = sut.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            into_body(response).await,
            ErrorResponse::new("Database session error", "unknown time zone")
        );
    }

    #[tokio::test]
    async fn test_不正リクエストは400() {
        let sut = ApiError::BadRequest("missing field `year`".to_string());

        let response = sut.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            into_body(response).await,
            ErrorResponse::new("Invalid request", "missing field `year`")
        );
    }

    #[tokio::test]
    async fn test_not_foundは404でidを含む() {
        let sut = ApiError::NotFound(CarId::new(42));

        let response = sut.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = into_body(response).await;
        assert_eq!(body.error, "Car not found");
        assert!(body.details.contains("42"));
    }

    #[tokio::test]
    async fn test_文字列パニックはdetailsにメッセージが入る() {
        let response = panic_response(Box::new("handler exploded"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            into_body(response).await,
            ErrorResponse::new("Internal server error", "handler exploded")
        );
    }

    #[tokio::test]
    async fn test_文字列以外のパニックは固定文言になる() {
        let response = panic_response(Box::new(42_u8));

        assert_eq!(
            into_body(response).await,
            ErrorResponse::new("Internal server error", "handler panicked")
        );
    }
}
