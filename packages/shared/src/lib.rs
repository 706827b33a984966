//! # Carlot 共有ユーティリティ
//!
//! API サーバーとインフラ層の双方から使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - 他のすべてのクレート（domain, infra, api）から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum への依存は持たない（`IntoResponse` 変換は API 層の責務）

pub mod error_response;
pub mod health;
pub mod observability;

pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
