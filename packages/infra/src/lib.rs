//! # Carlot インフラ層
//!
//! MySQL との接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: MySQL への接続プール管理、リクエスト単位の接続貸し出し
//! - **セッション設定**: 貸し出した接続への sql_mode / time_zone の適用
//! - **リポジトリ実装**: `car` テーブルへの SQL 操作
//!
//! ## 依存関係
//!
//! ```text
//! api → infra → domain
//!   ↘            ↑
//!     shared     │
//!   └────────────┘
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プール、`ConnectionProvider` / `ScopedConnection`
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;

pub use db::{ConnectionProvider, MySqlConnectionProvider, ScopedConnection, SessionSettings};
pub use error::InfraError;
pub use repository::{CarRepository, MySqlCarRepository};
