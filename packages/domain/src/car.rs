//! # 車両（Car）
//!
//! システム唯一のエンティティ。
//!
//! ## ライフサイクル
//!
//! ```text
//! POST で作成 (deleted_flag = 0)
//!   ├── PUT で make / model / year を上書き（何度でも）
//!   └── DELETE で deleted_flag = 1 に変更（論理削除）
//! ```
//!
//! 物理削除は存在しない。`deleted_flag = 1` が唯一の削除状態であり、
//! 一覧には `deleted_flag = 0` の車両のみが現れる。
//!
//! ## 設計判断
//!
//! - `CarId` はストレージ（AUTO_INCREMENT）が採番するため、生成メソッドを持たない
//! - `year` の範囲や `make` / `model` の空文字は検証しない（既存の挙動を維持）

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// 車両 ID
///
/// INSERT 時にストレージが採番する整数の主キー。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct CarId(i64);

impl CarId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// 論理削除フラグ
///
/// ストレージ上は 0 / 1 の整数で表現する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletedFlag {
    #[default]
    Active,
    Deleted,
}

impl DeletedFlag {
    /// カラム値（0 / 1）に変換する
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Active => 0,
            Self::Deleted => 1,
        }
    }

    /// カラム値から復元する
    ///
    /// 0 / 1 以外は [`DomainError::InvalidState`] になる。
    pub fn from_i8(value: i8) -> Result<Self, DomainError> {
        match value {
            0 => Ok(Self::Active),
            1 => Ok(Self::Deleted),
            other => Err(DomainError::InvalidState(format!(
                "deleted_flag は 0 または 1 である必要があります: {other}"
            ))),
        }
    }

    pub fn is_deleted(self) -> bool {
        self == Self::Deleted
    }
}

/// 車両エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Car {
    id:           CarId,
    make:         String,
    model:        String,
    year:         i32,
    deleted_flag: DeletedFlag,
    date_created: DateTime<Utc>,
}

/// DB から取得した値で [`Car`] を復元するためのパラメータ
#[derive(Debug, Clone)]
pub struct CarRecord {
    pub id:           CarId,
    pub make:         String,
    pub model:        String,
    pub year:         i32,
    pub deleted_flag: DeletedFlag,
    pub date_created: DateTime<Utc>,
}

impl Car {
    /// 既存のデータから復元する
    pub fn from_db(record: CarRecord) -> Self {
        Self {
            id:           record.id,
            make:         record.make,
            model:        record.model,
            year:         record.year,
            deleted_flag: record.deleted_flag,
            date_created: record.date_created,
        }
    }

    pub fn id(&self) -> CarId {
        self.id
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn deleted_flag(&self) -> DeletedFlag {
        self.deleted_flag
    }

    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    pub fn is_active(&self) -> bool {
        !self.deleted_flag.is_deleted()
    }

    /// make / model / year を上書きした新しいインスタンスを返す
    ///
    /// `deleted_flag` と `date_created` は変更しない。論理削除済みの車両にも
    /// 適用できる（UPDATE は `deleted_flag` を条件に含まない）。
    pub fn with_changes(self, changes: &CarChanges) -> Self {
        Self {
            make: changes.make.clone(),
            model: changes.model.clone(),
            year: changes.year,
            ..self
        }
    }

    /// 論理削除した新しいインスタンスを返す
    ///
    /// 既に削除済みでも同じ結果になる（冪等）。
    pub fn soft_deleted(self) -> Self {
        Self {
            deleted_flag: DeletedFlag::Deleted,
            ..self
        }
    }
}

/// 車両作成の入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCar {
    pub make:  String,
    pub model: String,
    pub year:  i32,
}

impl NewCar {
    /// 採番済みの ID と作成日時から [`Car`] を組み立てる
    ///
    /// 作成直後は常に `DeletedFlag::Active`。
    pub fn into_car(self, id: CarId, now: DateTime<Utc>) -> Car {
        Car {
            id,
            make: self.make,
            model: self.model,
            year: self.year,
            deleted_flag: DeletedFlag::Active,
            date_created: now,
        }
    }
}

/// 車両更新の入力
///
/// 3 フィールドすべてを無条件に上書きする（部分更新はない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarChanges {
    pub make:  String,
    pub model: String,
    pub year:  i32,
}
