//! # 車両 API サーバー
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（.env から DATABASE_URL などを読み込む）
//! cargo run -p carlot-api
//!
//! # 本番環境
//! DATABASE_URL=mysql://... LOG_FORMAT=json cargo run -p carlot-api --release
//! ```
//!
//! 環境変数の一覧は [`carlot_api::config`] を参照。

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use carlot_api::{AppSettings, build_app, config::CarApiConfig};
use carlot_infra::{MySqlConnectionProvider, db};
use carlot_shared::observability::{self, TracingConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    let _tracing_guard = observability::init_tracing(TracingConfig::from_env("carlot-api"));

    // 設定読み込み
    let config = CarApiConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!("車両 API サーバーを起動します: {}:{}", config.host, config.port);

    // データベース接続プールを作成
    let pool = db::create_pool(&config.pool)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!(
        max_connections = config.pool.max_connections,
        "データベースに接続しました"
    );

    if config.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("マイグレーションの適用に失敗しました")?;
        tracing::info!("マイグレーションを適用しました");
    }

    let provider = Arc::new(MySqlConnectionProvider::new(pool));
    let app = build_app(
        provider,
        AppSettings {
            session:          config.session,
            strict_row_match: config.strict_row_match,
        },
    );

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスのパースに失敗しました")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("車両 API サーバーが起動しました: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("車両 API サーバーを停止しました");
    Ok(())
}

/// Ctrl+C を待つ
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("シグナルハンドラの登録に失敗しました: {}", e);
    }
}
