//! # ドメイン層エラー定義
//!
//! ドメイン固有の不正状態を表現するエラー型。
//!
//! 車両の入力値（make / model / year）には業務上の制約がないため、
//! 入力バリデーションのバリアントは持たない。リクエストの形式チェックは
//! API 層のスキーマ（serde）が担う。

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// 不正な状態
    ///
    /// 保存済みの値がドメインの表現に変換できない場合（例: `deleted_flag = 2`）。
    /// API 層では 500 として扱う。
    #[error("不正な状態: {0}")]
    InvalidState(String),
}
