//! # Carlot ドメイン層
//!
//! 車両レコードのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - インフラ層・API 層に依存しない（依存性逆転の原則）
//! - 永続化の詳細（カラム型、SQL）は持たず、値の意味だけを表現する
//!
//! ## モジュール構成
//!
//! - [`car`] - 車両エンティティと入力型
//! - [`error`] - ドメイン層エラー定義

pub mod car;
pub mod error;

pub use error::DomainError;
