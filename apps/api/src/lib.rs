//! # Carlot 車両 API
//!
//! 車両レコードの一覧・登録・更新・論理削除を提供する HTTP API。
//!
//! ## リクエストの流れ
//!
//! ```text
//! CORS → Request ID → Trace → CatchPanic
//!   └─ /car 配下: 接続スコープ（取得 → セッション設定 → ハンドラ → 返却）
//!        └─ ハンドラ: SQL を 1 文実行して JSON に変換
//! ```
//!
//! ## モジュール構成
//!
//! - [`app_builder`] - ルーター構築
//! - [`config`] - アプリケーション設定（環境変数からの読み込み）
//! - [`error`] - API エラー定義と HTTP レスポンスへの変換
//! - [`handler`] - HTTP リクエストハンドラ
//! - [`middleware`] - リクエスト単位の接続スコープ
//!
//! ## 依存関係
//!
//! - `carlot_domain`: 車両エンティティ
//! - `carlot_infra`: MySQL 接続・リポジトリ
//! - `carlot_shared`: エラーレスポンス、ヘルスチェック、トレーシング

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;

pub use app_builder::{AppSettings, build_app};
