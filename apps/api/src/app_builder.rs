//! # アプリケーション構築
//!
//! State の初期化とルーター構築を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get},
};
use carlot_infra::{ConnectionProvider, SessionSettings};
use carlot_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    error::panic_response,
    handler::{
        CarState,
        ReadinessState,
        create_car,
        delete_car,
        health_check,
        list_cars,
        readiness_check,
        update_car,
        welcome,
    },
    middleware::{ConnectionScopeState, scope_connection},
};

/// ルーター構築時の設定
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    /// リクエストごとに適用するセッション設定
    pub session:          SessionSettings,
    /// 0 行一致の更新・論理削除を 404 にするか
    pub strict_row_match: bool,
}

/// ルーターを構築する
///
/// `/car` 配下のルートだけが接続スコープミドルウェアを通る。
/// `/` と `/health` は DB 接続を借りない（`/health/ready` は自前で 1 本借りる）。
pub fn build_app<P: ConnectionProvider>(provider: Arc<P>, settings: AppSettings) -> Router {
    let scope_state = ConnectionScopeState {
        provider: Arc::clone(&provider),
        session:  settings.session,
    };
    let car_state = Arc::new(CarState {
        strict_row_match: settings.strict_row_match,
    });
    let readiness_state = Arc::new(ReadinessState { provider });

    let car_routes = Router::new()
        .route(
            "/car",
            get(list_cars::<P::Connection>)
                .post(create_car::<P::Connection>)
                .put(update_car::<P::Connection>),
        )
        .route("/car/{id}", delete(delete_car::<P::Connection>))
        .layer(from_fn_with_state(scope_state, scope_connection::<P>))
        .with_state(car_state);

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check::<P>))
        .with_state(readiness_state);

    // レイヤー順序: 下に書いたものが外側
    // 1. CorsLayer（最外）: プリフライトを含むすべてのリクエストに CORS ヘッダーを付与
    // 2. SetRequestIdLayer: UUID v7 を生成（またはクライアント提供値を使用）
    // 3. TraceLayer: カスタムスパンに request_id を含める
    // 4. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
    // 5. CatchPanicLayer（最内）: ハンドラのパニックを 500 に変換
    Router::new()
        .route("/", get(welcome))
        .merge(car_routes)
        .merge(health_routes)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive())
}
