//! # ログ・トレーシング
//!
//! 車両 API のログ出力を組み立てる。
//!
//! ## 出力されるスパン
//!
//! ```text
//! app{service="carlot-api"}                      … init_tracing が開始する
//!   └─ request{method, uri, request_id}          … make_request_span（1 リクエスト 1 つ）
//!        └─ find_all_active / insert / ...       … リポジトリの debug スパン
//! ```
//!
//! `request_id` は `SetRequestIdLayer` が採番した UUID v7 で、レスポンスの
//! `x-request-id` ヘッダーと一致する。ログからリクエストを特定するときの鍵になる。
//!
//! 出力形式は `LOG_FORMAT`（`json` / `pretty`）、レベルは `RUST_LOG` で変更する。

/// Request ID を運ぶ HTTP ヘッダー名
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `RUST_LOG` 未設定時のフィルタ
///
/// 自前クレートは debug まで出し、sqlx のクエリログは遅延警告だけに絞る。
pub const DEFAULT_LOG_FILTER: &str = "info,carlot_api=debug,carlot_infra=debug,sqlx=warn";

/// ログ出力形式（`LOG_FORMAT`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 JSON。イベントのフィールドはトップレベルに展開される
    Json,
    /// 端末向けの人間が読みやすい表示
    #[default]
    Pretty,
}

impl LogFormat {
    /// `json` / `pretty` 以外は Pretty 扱いにする
    ///
    /// subscriber 初期化前に呼ばれるため、警告は stderr に直接書く。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|val| Self::parse(&val))
            .unwrap_or_default()
    }
}

/// [`init_tracing`] の入力
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// ルートスパン `app` の `service` フィールド
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }
}

/// グローバル subscriber を登録し、`app` スパンに入った状態のガードを返す
///
/// ガードを保持している間に出たログにはすべて `service` が付く。
/// `main` の先頭で一度だけ呼ぶ。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) -> tracing::span::EnteredSpan {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info_span!("app", service = %config.service_name).entered()
}

/// HTTP リクエストごとのスパンを生成する
///
/// `TraceLayer::make_span_with` に渡す。`SetRequestIdLayer` より内側で
/// 実行されるため、`x-request-id` ヘッダーは必ず設定済みになっている。
#[cfg(feature = "observability")]
pub fn make_request_span<B>(request: &http::Request<B>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// UUID v7 で Request ID を生成する `MakeRequestId` 実装
///
/// 時系列ソート可能なため、ログから同一時間帯のリクエストを辿りやすい。
#[cfg(feature = "observability")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

#[cfg(feature = "observability")]
impl tower_http::request_id::MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(
        &mut self,
        _request: &http::Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        let id = uuid::Uuid::now_v7().to_string();
        http::HeaderValue::from_str(&id)
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}
