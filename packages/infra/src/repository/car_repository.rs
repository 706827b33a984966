//! # CarRepository
//!
//! `car` テーブルへの読み書きを担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **論理削除**: DELETE 文は発行しない。削除は `deleted_flag = 1` への UPDATE
//! - **存在確認なし**: UPDATE / 論理削除は一致行数を返すだけで、0 行でもエラーにしない。
//!   0 行を失敗とみなすかは呼び出し側（API 層）が決める
//! - **一覧の順序**: `ORDER BY id` で採番順に固定する
//!
//! ## 一致行数について
//!
//! sqlx の MySQL 接続は `CLIENT_FOUND_ROWS` を有効にして接続するため、
//! `rows_affected()` は「値が変化した行数」ではなく「WHERE に一致した行数」になる。
//! 同じ値での UPDATE や削除済み行への再削除も 1 として数えられる。
//!
//! ## date_created とセッションの time_zone
//!
//! `TIMESTAMP` 列はセッションの `time_zone` の壁時計で返される。
//! 一覧取得では `CONVERT_TZ` で UTC の壁時計に戻してから読むため、
//! `time_zone` の設定に関わらず `date_created` は同じ時点を指す。

use async_trait::async_trait;
use carlot_domain::car::{Car, CarChanges, CarId, CarRecord, DeletedFlag, NewCar};
use chrono::NaiveDateTime;
use sqlx::{Connection, MySql, pool::PoolConnection};

use crate::{
    db::{ScopedConnection, SessionSettings},
    error::InfraError,
};

/// 車両リポジトリトレイト
///
/// 実装は 1 本の接続を所有し、1 リクエストの間だけ使われる。
#[async_trait]
pub trait CarRepository: ScopedConnection {
    /// 論理削除されていない車両を ID 順に取得する
    async fn find_all_active(&mut self) -> Result<Vec<Car>, InfraError>;

    /// 車両を挿入し、採番された ID を返す
    ///
    /// `deleted_flag = 0`、`date_created` は挿入時刻。
    async fn insert(&mut self, car: &NewCar) -> Result<CarId, InfraError>;

    /// make / model / year を上書きし、一致した行数を返す
    async fn update(&mut self, id: CarId, changes: &CarChanges) -> Result<u64, InfraError>;

    /// `deleted_flag = 1` に更新し、一致した行数を返す
    async fn soft_delete(&mut self, id: CarId) -> Result<u64, InfraError>;
}

/// `car` テーブルの行
///
/// `date_created` は UTC の壁時計に変換済みの値。
#[derive(Debug, sqlx::FromRow)]
struct CarRow {
    id:           i64,
    make:         String,
    model:        String,
    year:         i32,
    deleted_flag: i8,
    date_created: NaiveDateTime,
}

impl TryFrom<CarRow> for Car {
    type Error = InfraError;

    fn try_from(row: CarRow) -> Result<Self, Self::Error> {
        Ok(Car::from_db(CarRecord {
            id:           CarId::new(row.id),
            make:         row.make,
            model:        row.model,
            year:         row.year,
            deleted_flag: DeletedFlag::from_i8(row.deleted_flag)?,
            date_created: row.date_created.and_utc(),
        }))
    }
}

/// MySQL 実装の CarRepository
///
/// プールから借りた接続を所有する。ドロップ時に接続はプールへ返却される。
#[derive(Debug)]
pub struct MySqlCarRepository {
    conn: PoolConnection<MySql>,
}

impl MySqlCarRepository {
    pub fn new(conn: PoolConnection<MySql>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ScopedConnection for MySqlCarRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(sql_mode = %settings.sql_mode, time_zone = %settings.time_zone))]
    async fn configure_session(&mut self, settings: &SessionSettings) -> Result<(), InfraError> {
        sqlx::query("SET SESSION sql_mode = ?")
            .bind(&settings.sql_mode)
            .execute(&mut *self.conn)
            .await?;
        sqlx::query("SET SESSION time_zone = ?")
            .bind(&settings.time_zone)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), InfraError> {
        self.conn.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl CarRepository for MySqlCarRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all_active(&mut self) -> Result<Vec<Car>, InfraError> {
        let rows: Vec<CarRow> = sqlx::query_as(
            r#"
            SELECT id, make, model, year, deleted_flag,
                   CONVERT_TZ(date_created, @@session.time_zone, '+00:00') AS date_created
            FROM car
            WHERE deleted_flag = 0
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(Car::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(make = %car.make, model = %car.model, year = car.year))]
    async fn insert(&mut self, car: &NewCar) -> Result<CarId, InfraError> {
        let result = sqlx::query(
            r#"
            INSERT INTO car (make, model, year, deleted_flag, date_created)
            VALUES (?, ?, ?, 0, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .execute(&mut *self.conn)
        .await?;

        let id = i64::try_from(result.last_insert_id())
            .map_err(|e| InfraError::unexpected(format!("採番された ID が範囲外です: {e}")))?;
        Ok(CarId::new(id))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn update(&mut self, id: CarId, changes: &CarChanges) -> Result<u64, InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE car
            SET make = ?, model = ?, year = ?
            WHERE id = ?
            "#,
        )
        .bind(&changes.make)
        .bind(&changes.model)
        .bind(changes.year)
        .bind(id.as_i64())
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn soft_delete(&mut self, id: CarId) -> Result<u64, InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE car
            SET deleted_flag = 1
            WHERE id = ?
            "#,
        )
        .bind(id.as_i64())
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }
}
