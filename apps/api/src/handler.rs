//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## モジュール構成
//!
//! ```text
//! handler.rs          # 親モジュール（re-export）
//! └── handler/
//!     ├── car.rs      # 車両 CRUD（接続スコープ内で実行）
//!     ├── health.rs   # ヘルスチェック
//!     └── root.rs     # 歓迎メッセージ
//! ```

pub mod car;
pub mod health;
pub mod root;

pub use car::{CarState, create_car, delete_car, list_cars, update_car};
pub use health::{ReadinessState, health_check, readiness_check};
pub use root::welcome;
