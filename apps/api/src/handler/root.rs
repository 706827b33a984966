//! # ルートハンドラ

/// 歓迎メッセージ
pub const WELCOME_MESSAGE: &str = "Welcome to the Car API";

/// GET /
///
/// DB 接続は使用しない。
pub async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}
