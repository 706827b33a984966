//! # ヘルスチェックハンドラ
//!
//! - `/health`: Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready`: Readiness Check（DB への接続を確認する）
//!
//! レスポンス型は [`carlot_shared::HealthResponse`] / [`carlot_shared::ReadinessResponse`] を参照。

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use carlot_infra::{ConnectionProvider, ScopedConnection};
use carlot_shared::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness Check 用の State
pub struct ReadinessState<P> {
    pub provider: Arc<P>,
}

/// GET /health/ready
///
/// 接続を 1 本借りて PING する。OK → 200、失敗 → 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check<P: ConnectionProvider>(
    State(state): State<Arc<ReadinessState<P>>>,
) -> impl IntoResponse {
    let database = check_database(state.provider.as_ref()).await;

    let mut checks = HashMap::new();
    checks.insert("database".to_string(), database);
    let body = ReadinessResponse::from_checks(checks);

    let http_status = match body.status {
        ReadinessStatus::Ready => StatusCode::OK,
        ReadinessStatus::NotReady => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(body))
}

async fn check_database<P: ConnectionProvider>(provider: &P) -> CheckStatus {
    let ping = async {
        let mut conn = provider.acquire().await?;
        conn.ping().await
    };

    match tokio::time::timeout(READINESS_TIMEOUT, ping).await {
        Ok(Ok(())) => CheckStatus::Ok,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "readiness check: database ping failed");
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!("readiness check: database check timed out");
            CheckStatus::Error
        }
    }
}
