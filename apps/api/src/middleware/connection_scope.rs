//! # リクエスト単位の接続スコープ
//!
//! 1 リクエストにつき 1 本の DB 接続を貸し出すミドルウェア。
//!
//! ## 流れ
//!
//! ```text
//! 1. ConnectionProvider::acquire()            失敗 → 500 "Database connection error"
//! 2. ScopedConnection::configure_session()    失敗 → 接続を返却して 500 "Database session error"
//! 3. RequestConnection をリクエスト extensions に格納
//! 4. ハンドラを実行
//! 5. 接続を取り出してドロップ（プールへ返却）
//! ```
//!
//! ハンドラがパニックした場合は外側の `CatchPanicLayer` が 500 を返し、
//! このミドルウェアの Future ごと破棄されるため接続は同様に返却される。
//!
//! ## 使い方
//!
//! ```rust,ignore
//! use axum::{Extension, middleware::from_fn_with_state};
//!
//! async fn handler<C: CarRepository>(
//!     Extension(conn): Extension<RequestConnection<C>>,
//! ) -> Result<Json<..>, ApiError> {
//!     let mut conn = conn.lock().await?;
//!     let cars = conn.find_all_active().await?;
//!     ...
//! }
//!
//! Router::new()
//!     .route("/car", get(handler::<P::Connection>))
//!     .layer(from_fn_with_state(scope_state, scope_connection::<P>))
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use carlot_infra::{ConnectionProvider, ScopedConnection, SessionSettings};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::ApiError;

/// 接続スコープミドルウェアの状態
pub struct ConnectionScopeState<P> {
    pub provider: Arc<P>,
    pub session:  SessionSettings,
}

impl<P> Clone for ConnectionScopeState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            session:  self.session.clone(),
        }
    }
}

/// リクエストに紐づく接続
///
/// ミドルウェアがリクエスト extensions に格納し、ハンドラは
/// `Extension<RequestConnection<C>>` で受け取る。接続の所有者は
/// ミドルウェアで、ハンドラ終了後に取り出されて返却される。
pub struct RequestConnection<C>(Arc<Mutex<Option<C>>>);

impl<C> Clone for RequestConnection<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C: ScopedConnection> RequestConnection<C> {
    fn new(conn: C) -> Self {
        Self(Arc::new(Mutex::new(Some(conn))))
    }

    /// 接続を排他的に借りる
    ///
    /// 返却済みの場合は `ApiError::Internal`。
    pub async fn lock(&self) -> Result<MappedMutexGuard<'_, C>, ApiError> {
        MutexGuard::try_map(self.0.lock().await, |slot| slot.as_mut()).map_err(|_| {
            ApiError::Internal("request connection has already been released".to_string())
        })
    }

    /// 接続を取り出してドロップする
    async fn release(&self) {
        drop(self.0.lock().await.take());
    }
}

/// リクエスト単位で接続を貸し出すミドルウェア
pub async fn scope_connection<P: ConnectionProvider>(
    State(state): State<ConnectionScopeState<P>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let mut conn = match state.provider.acquire().await {
        Ok(conn) => conn,
        Err(e) => return ApiError::ConnectionAcquire(e).into_response(),
    };

    if let Err(e) = conn.configure_session(&state.session).await {
        drop(conn);
        return ApiError::SessionSetup(e).into_response();
    }
    tracing::debug!("リクエスト用の接続を準備しました");

    let scoped = RequestConnection::new(conn);
    request.extensions_mut().insert(scoped.clone());

    let response = next.run(request).await;

    scoped.release().await;
    tracing::debug!("リクエスト用の接続を返却しました");
    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        Router,
        http::{Method, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use carlot_infra::{
        CarRepository,
        mock::{InMemoryCarRepository, InMemoryConnectionProvider},
    };
    use carlot_shared::ErrorResponse;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;

    type Conn = RequestConnection<InMemoryCarRepository>;

    fn create_test_app(provider: &InMemoryConnectionProvider, router: Router) -> Router {
        let state = ConnectionScopeState {
            provider: Arc::new(provider.clone()),
            session:  SessionSettings::default(),
        };
        router.layer(from_fn_with_state(
            state,
            scope_connection::<InMemoryConnectionProvider>,
        ))
    }

    fn get_request() -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri("/test")
            .body(Body::empty())
            .unwrap()
    }

    async fn error_body(response: Response) -> ErrorResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ハンドラ実行中は接続を1本占有し終了後に返却する() {
        // Given
        let provider = InMemoryConnectionProvider::new();
        let observer = provider.clone();
        let sut = create_test_app(
            &provider,
            Router::new().route(
                "/test",
                get(move |Extension(conn): Extension<Conn>| {
                    let observer = observer.clone();
                    async move {
                        let mut conn = conn.lock().await.unwrap();
                        conn.find_all_active().await.unwrap();
                        observer.checked_out().to_string()
                    }
                }),
            ),
        );

        // When
        let response = sut.oneshot(get_request()).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"1");
        assert_eq!(provider.checked_out(), 0);
    }

    #[tokio::test]
    async fn test_リクエストごとにセッション設定が実行される() {
        // Given
        let provider = InMemoryConnectionProvider::new();
        let sut = create_test_app(
            &provider,
            Router::new().route("/test", get(|| async { StatusCode::OK })),
        );

        // When
        for _ in 0..3 {
            sut.clone().oneshot(get_request()).await.unwrap();
        }

        // Then
        assert_eq!(provider.total_acquired(), 3);
        assert_eq!(
            provider.session_setups(),
            vec![SessionSettings::default(); 3]
        );
    }

    #[tokio::test]
    async fn test_接続取得に失敗するとハンドラを実行せず500を返す() {
        // Given
        let provider = InMemoryConnectionProvider::new();
        provider.fail_acquire("pool timed out");
        let sut = create_test_app(
            &provider,
            Router::new().route("/test", get(|| async { StatusCode::NO_CONTENT })),
        );

        // When
        let response = sut.oneshot(get_request()).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_body(response).await,
            ErrorResponse::new("Database connection error", "pool timed out")
        );
        assert_eq!(provider.checked_out(), 0);
    }

    #[tokio::test]
    async fn test_セッション設定に失敗すると接続を返却して500を返す() {
        // Given
        let provider = InMemoryConnectionProvider::new();
        provider.fail_session("Unknown or incorrect time zone");
        let sut = create_test_app(
            &provider,
            Router::new().route("/test", get(|| async { StatusCode::NO_CONTENT })),
        );

        // When
        let response = sut.oneshot(get_request()).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_body(response).await,
            ErrorResponse::new("Database session error", "Unknown or incorrect time zone")
        );
        assert_eq!(provider.total_acquired(), 1);
        assert_eq!(provider.checked_out(), 0);
    }

    #[tokio::test]
    async fn test_ハンドラがエラーを返しても接続は返却される() {
        // Given
        let provider = InMemoryConnectionProvider::new();
        provider.fail_queries("connection reset");
        let sut = create_test_app(
            &provider,
            Router::new().route(
                "/test",
                get(|Extension(conn): Extension<Conn>| async move {
                    let mut conn = conn.lock().await?;
                    conn.find_all_active().await.map_err(|e| {
                        ApiError::query(crate::error::QueryAction::FetchCars, e)
                    })?;
                    Ok::<_, ApiError>(StatusCode::OK)
                }),
            ),
        );

        // When
        let response = sut.oneshot(get_request()).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_body(response).await,
            ErrorResponse::new("Failed to fetch cars", "connection reset")
        );
        assert_eq!(provider.checked_out(), 0);
    }
}
