//! # リポジトリ実装
//!
//! 車両テーブルへの SQL 操作を提供する。
//!
//! ## 設計方針
//!
//! - **接続単位のリポジトリ**: リポジトリはプールではなく、リクエストに
//!   貸し出された 1 本の接続を所有する
//! - **1 操作 1 文**: 各メソッドは SQL を 1 文だけ発行する（トランザクションなし）
//! - **テスタビリティ**: トレイト経由でインメモリ実装に差し替え可能

pub mod car_repository;

pub use car_repository::{CarRepository, MySqlCarRepository};
