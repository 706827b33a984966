//! # アプリケーション設定
//!
//! 環境変数から車両 API サーバーの設定を読み込む。
//!
//! ## 環境変数一覧
//!
//! | 変数名 | 必須 | デフォルト | 説明 |
//! |--------|------|------------|------|
//! | `CAR_API_HOST` | No | `0.0.0.0` | バインドアドレス |
//! | `CAR_API_PORT` | No | `3000` | ポート番号 |
//! | `DATABASE_URL` | **Yes** | - | MySQL 接続 URL |
//! | `DB_MAX_CONNECTIONS` | No | `10` | 接続プールの最大接続数 |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | No | `5` | 接続取得のタイムアウト（秒） |
//! | `DB_SQL_MODE` | No | `TRADITIONAL` | セッションの sql_mode |
//! | `DB_TIME_ZONE` | No | `+00:00` | セッションの time_zone（`±HH:MM` 形式のみ） |
//! | `DB_RUN_MIGRATIONS` | No | `true` | 起動時にマイグレーションを適用するか |
//! | `CAR_STRICT_ROW_MATCH` | No | `false` | 0 行一致の更新・削除を 404 にするか |
//!
//! ログ関連（`LOG_FORMAT`, `RUST_LOG`）は
//! [`carlot_shared::observability::TracingConfig`] が読み込む。

use std::{env, str::FromStr, time::Duration};

use carlot_infra::{SessionSettings, db::PoolSettings};
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// 車両 API サーバーの設定
#[derive(Debug, Clone)]
pub struct CarApiConfig {
    /// バインドアドレス
    pub host:             String,
    /// ポート番号
    pub port:             u16,
    /// 接続プール設定
    pub pool:             PoolSettings,
    /// リクエストごとに適用するセッション設定
    pub session:          SessionSettings,
    /// 起動時にマイグレーションを適用するか
    pub run_migrations:   bool,
    /// 0 行一致の更新・論理削除を 404 にするか
    pub strict_row_match: bool,
}

impl CarApiConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の取得関数から設定を読み込む
    ///
    /// `from_env` の実体。テストでは環境変数を書き換えずに値を差し込む。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let pool = PoolSettings {
            database_url,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
        };

        let defaults = SessionSettings::default();
        let session = SessionSettings {
            sql_mode:  lookup("DB_SQL_MODE").unwrap_or(defaults.sql_mode),
            time_zone: match lookup("DB_TIME_ZONE") {
                None => defaults.time_zone,
                Some(value) => parse_offset("DB_TIME_ZONE", value)?,
            },
        };

        Ok(Self {
            host: lookup("CAR_API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "CAR_API_PORT", 3000)?,
            pool,
            session,
            run_migrations: parse_flag(&lookup, "DB_RUN_MIGRATIONS", true)?,
            strict_row_match: parse_flag(&lookup, "CAR_STRICT_ROW_MATCH", false)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

/// `+09:00` / `-05:30` 形式の固定オフセットだけを受け付ける
///
/// 名前付きタイムゾーンはサーバーのタイムゾーンテーブルに依存し、
/// `CONVERT_TZ` が NULL を返しうるため拒否する。
fn parse_offset(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    let digit = |i: usize| char::from(bytes[i]).to_digit(10);

    let valid = bytes.len() == 6
        && matches!(bytes[0], b'+' | b'-')
        && bytes[3] == b':'
        && match (digit(1), digit(2), digit(4), digit(5)) {
            (Some(h1), Some(h2), Some(m1), Some(m2)) => h1 * 10 + h2 <= 14 && m1 * 10 + m2 <= 59,
            _ => false,
        };

    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::Invalid { name, value })
    }
}
