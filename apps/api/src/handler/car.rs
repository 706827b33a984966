//! # 車両ハンドラ
//!
//! 車両の一覧・登録・更新・論理削除を提供する。
//!
//! ## エンドポイント
//!
//! - `GET /car` - 論理削除されていない車両の一覧
//! - `POST /car` - 車両登録
//! - `PUT /car` - 車両更新（make / model / year を上書き）
//! - `DELETE /car/{id}` - 車両の論理削除
//!
//! 各ハンドラは接続スコープミドルウェアが貸し出した接続で SQL を 1 文だけ実行する。

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{
        Path,
        State,
        rejection::{JsonRejection, PathRejection},
    },
};
use carlot_domain::car::{Car, CarChanges, CarId, NewCar};
use carlot_infra::CarRepository;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, QueryAction},
    middleware::RequestConnection,
};

/// 車両 API の共有状態
#[derive(Debug, Clone, Default)]
pub struct CarState {
    /// 0 行一致の更新・論理削除を 404 にするか
    pub strict_row_match: bool,
}

// --- リクエスト/レスポンス型 ---

/// 車両 DTO
#[derive(Debug, Serialize)]
pub struct CarDto {
    pub id:           CarId,
    pub make:         String,
    pub model:        String,
    pub year:         i32,
    /// `0`: 有効, `1`: 論理削除済み
    pub deleted_flag: i8,
    pub date_created: String,
}

impl From<&Car> for CarDto {
    fn from(car: &Car) -> Self {
        Self {
            id:           car.id(),
            make:         car.make().to_string(),
            model:        car.model().to_string(),
            year:         car.year(),
            deleted_flag: car.deleted_flag().as_i8(),
            date_created: car.date_created().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListCarsResponse {
    pub cars: Vec<CarDto>,
}

/// 車両登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    pub make:  String,
    pub model: String,
    pub year:  i32,
}

#[derive(Debug, Serialize)]
pub struct CreateCarResponse {
    pub id:      CarId,
    pub make:    String,
    pub model:   String,
    pub year:    i32,
    pub success: bool,
    pub message: String,
}

/// 車両更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateCarRequest {
    pub id:    CarId,
    pub make:  String,
    pub model: String,
    pub year:  i32,
}

#[derive(Debug, Serialize)]
pub struct UpdateCarResponse {
    pub id:      CarId,
    pub make:    String,
    pub model:   String,
    pub year:    i32,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteCarResponse {
    pub success: bool,
}

// --- ハンドラ ---

/// GET /car
#[tracing::instrument(skip_all)]
pub async fn list_cars<C: CarRepository>(
    Extension(conn): Extension<RequestConnection<C>>,
) -> Result<Json<ListCarsResponse>, ApiError> {
    let mut conn = conn.lock().await?;
    let cars = conn
        .find_all_active()
        .await
        .map_err(|e| ApiError::query(QueryAction::FetchCars, e))?;

    tracing::debug!(count = cars.len(), "車両一覧を取得しました");
    Ok(Json(ListCarsResponse {
        cars: cars.iter().map(CarDto::from).collect(),
    }))
}

/// POST /car
#[tracing::instrument(skip_all)]
pub async fn create_car<C: CarRepository>(
    Extension(conn): Extension<RequestConnection<C>>,
    payload: Result<Json<CreateCarRequest>, JsonRejection>,
) -> Result<Json<CreateCarResponse>, ApiError> {
    let Json(req) = payload?;
    let new_car = NewCar {
        make:  req.make,
        model: req.model,
        year:  req.year,
    };

    let mut conn = conn.lock().await?;
    let id = conn
        .insert(&new_car)
        .await
        .map_err(|e| ApiError::query(QueryAction::CreateCar, e))?;

    tracing::info!(%id, "車両を登録しました");
    Ok(Json(CreateCarResponse {
        id,
        make:    new_car.make,
        model:   new_car.model,
        year:    new_car.year,
        success: true,
        message: "Car created successfully".to_string(),
    }))
}

/// PUT /car
///
/// 一致する行がなくても既定では成功を返す。
#[tracing::instrument(skip_all)]
pub async fn update_car<C: CarRepository>(
    State(state): State<Arc<CarState>>,
    Extension(conn): Extension<RequestConnection<C>>,
    payload: Result<Json<UpdateCarRequest>, JsonRejection>,
) -> Result<Json<UpdateCarResponse>, ApiError> {
    let Json(req) = payload?;
    let id = req.id;
    let changes = CarChanges {
        make:  req.make,
        model: req.model,
        year:  req.year,
    };

    let mut conn = conn.lock().await?;
    let matched = conn
        .update(id, &changes)
        .await
        .map_err(|e| ApiError::query(QueryAction::UpdateCar, e))?;
    ensure_matched(&state, id, matched)?;

    tracing::info!(%id, matched, "車両を更新しました");
    Ok(Json(UpdateCarResponse {
        id,
        make:    changes.make,
        model:   changes.model,
        year:    changes.year,
        success: true,
    }))
}

/// DELETE /car/{id}
///
/// 一致する行がなくても既定では成功を返す。
#[tracing::instrument(skip_all)]
pub async fn delete_car<C: CarRepository>(
    State(state): State<Arc<CarState>>,
    Extension(conn): Extension<RequestConnection<C>>,
    path: Result<Path<CarId>, PathRejection>,
) -> Result<Json<DeleteCarResponse>, ApiError> {
    let Path(id) = path?;

    let mut conn = conn.lock().await?;
    let matched = conn
        .soft_delete(id)
        .await
        .map_err(|e| ApiError::query(QueryAction::DeleteCar, e))?;
    ensure_matched(&state, id, matched)?;

    tracing::info!(%id, matched, "車両を論理削除しました");
    Ok(Json(DeleteCarResponse { success: true }))
}

fn ensure_matched(state: &CarState, id: CarId, matched: u64) -> Result<(), ApiError> {
    if matched == 0 {
        if state.strict_row_match {
            return Err(ApiError::NotFound(id));
        }
        tracing::warn!(%id, "対象の車両が存在しませんでした");
    }
    Ok(())
}
