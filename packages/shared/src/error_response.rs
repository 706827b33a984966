//! # エラーレスポンス
//!
//! 全エンドポイントで共通のエラーレスポンス構造体を提供する。
//!
//! ## 形式
//!
//! ```json
//! { "error": "Failed to fetch cars", "details": "pool timed out while waiting for an open connection" }
//! ```
//!
//! `error` は操作ごとの固定メッセージ、`details` は原因となったエラーの
//! メッセージをそのまま保持する。クライアントは原因の種類（入力不正・DB 停止・
//! 制約違反）を `error` の文言とステータスコードでしか区別できない。

use serde::{Deserialize, Serialize};

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error:   String,
    pub details: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error:   error.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_new_で全フィールドが設定される() {
        let error = ErrorResponse::new("Failed to create car", "Column 'make' cannot be null");

        assert_eq!(error.error, "Failed to create car");
        assert_eq!(error.details, "Column 'make' cannot be null");
    }

    #[test]
    fn test_jsonシリアライズでerrorとdetailsの2フィールドのみになる() {
        let error = ErrorResponse::new("Failed to fetch cars", "connection reset");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "error": "Failed to fetch cars",
                "details": "connection reset"
            })
        );
    }

    #[test]
    fn test_jsonデシリアライズが正しく動作する() {
        let json = r#"{"error": "Failed to delete car", "details": "lock wait timeout"}"#;
        let error: ErrorResponse = serde_json::from_str(json).unwrap();

        assert_eq!(error, ErrorResponse::new("Failed to delete car", "lock wait timeout"));
    }
}
