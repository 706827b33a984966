//! # テスト用インメモリ接続
//!
//! API 層のテストで使用するインメモリの [`ConnectionProvider`] 実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! carlot-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! MySQL 実装と同じ観測可能な振る舞い（論理削除、一致行数、ID 順の一覧）を
//! 再現したうえで、以下を検証できるようにする:
//!
//! - 貸し出し中の接続数（[`InMemoryConnectionProvider::checked_out`]）
//! - セッション設定の実行回数と内容
//! - 接続取得・セッション設定・クエリの各段階での障害注入

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use carlot_domain::car::{Car, CarChanges, CarId, NewCar};
use chrono::Utc;

use crate::{
    db::{ConnectionProvider, ScopedConnection, SessionSettings},
    error::InfraError,
    repository::CarRepository,
};

/// 障害注入の設定
///
/// `Some(msg)` の段階は `msg` をメッセージとするエラーで失敗する。
#[derive(Debug, Clone, Default)]
struct Faults {
    acquire: Option<String>,
    session: Option<String>,
    query:   Option<String>,
}

#[derive(Debug, Default)]
struct Store {
    cars:          Vec<Car>,
    last_id:       i64,
    session_setup: Vec<SessionSettings>,
}

/// インメモリの接続供給元
///
/// `Clone` はストアを共有する（テストから状態を観測するため）。
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnectionProvider {
    store:       Arc<Mutex<Store>>,
    faults:      Arc<Mutex<Faults>>,
    checked_out: Arc<AtomicUsize>,
    acquired:    Arc<AtomicUsize>,
}

impl InMemoryConnectionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    /// 現在貸し出し中の接続数
    pub fn checked_out(&self) -> usize {
        self.checked_out.load(Ordering::SeqCst)
    }

    /// これまでに貸し出した接続の累計
    pub fn total_acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// 実行されたセッション設定（実行順）
    pub fn session_setups(&self) -> Vec<SessionSettings> {
        self.store().session_setup.clone()
    }

    /// 論理削除済みを含む全車両（ストレージ上の状態）
    pub fn all_cars(&self) -> Vec<Car> {
        self.store().cars.clone()
    }

    /// ID で車両を検索する（論理削除済みを含む）
    pub fn find(&self, id: CarId) -> Option<Car> {
        self.store().cars.iter().find(|c| c.id() == id).cloned()
    }

    /// テストデータを直接投入する
    pub fn seed(&self, car: NewCar) -> CarId {
        insert_into(&mut self.store(), car)
    }

    pub fn fail_acquire(&self, msg: impl Into<String>) {
        self.faults.lock().unwrap().acquire = Some(msg.into());
    }

    pub fn fail_session(&self, msg: impl Into<String>) {
        self.faults.lock().unwrap().session = Some(msg.into());
    }

    pub fn fail_queries(&self, msg: impl Into<String>) {
        self.faults.lock().unwrap().query = Some(msg.into());
    }

    pub fn clear_faults(&self) {
        *self.faults.lock().unwrap() = Faults::default();
    }
}

fn insert_into(store: &mut Store, car: NewCar) -> CarId {
    store.last_id += 1;
    let id = CarId::new(store.last_id);
    store.cars.push(car.into_car(id, Utc::now()));
    id
}

#[async_trait]
impl ConnectionProvider for InMemoryConnectionProvider {
    type Connection = InMemoryCarRepository;

    async fn acquire(&self) -> Result<Self::Connection, InfraError> {
        if let Some(msg) = self.faults.lock().unwrap().acquire.clone() {
            return Err(InfraError::unexpected(msg));
        }
        self.checked_out.fetch_add(1, Ordering::SeqCst);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryCarRepository {
            provider: self.clone(),
        })
    }
}

/// インメモリの接続兼リポジトリ
///
/// ドロップ時に貸し出し中カウンタを減らす（プールへの返却に相当）。
#[derive(Debug)]
pub struct InMemoryCarRepository {
    provider: InMemoryConnectionProvider,
}

impl InMemoryCarRepository {
    fn check_query(&self) -> Result<(), InfraError> {
        match self.provider.faults.lock().unwrap().query.clone() {
            Some(msg) => Err(InfraError::unexpected(msg)),
            None => Ok(()),
        }
    }
}

impl Drop for InMemoryCarRepository {
    fn drop(&mut self) {
        self.provider.checked_out.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScopedConnection for InMemoryCarRepository {
    async fn configure_session(&mut self, settings: &SessionSettings) -> Result<(), InfraError> {
        if let Some(msg) = self.provider.faults.lock().unwrap().session.clone() {
            return Err(InfraError::unexpected(msg));
        }
        self.provider.store().session_setup.push(settings.clone());
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), InfraError> {
        self.check_query()
    }
}

#[async_trait]
impl CarRepository for InMemoryCarRepository {
    async fn find_all_active(&mut self) -> Result<Vec<Car>, InfraError> {
        self.check_query()?;
        let mut cars: Vec<Car> = self
            .provider
            .store()
            .cars
            .iter()
            .filter(|c| c.is_active())
            .cloned()
            .collect();
        cars.sort_by_key(Car::id);
        Ok(cars)
    }

    async fn insert(&mut self, car: &NewCar) -> Result<CarId, InfraError> {
        self.check_query()?;
        // DB 呼び出しと同じく中断点を作り、並行リクエストを交互に実行させる
        tokio::task::yield_now().await;
        Ok(insert_into(&mut self.provider.store(), car.clone()))
    }

    async fn update(&mut self, id: CarId, changes: &CarChanges) -> Result<u64, InfraError> {
        self.check_query()?;
        let mut store = self.provider.store();
        let Some(slot) = store.cars.iter_mut().find(|c| c.id() == id) else {
            return Ok(0);
        };
        *slot = slot.clone().with_changes(changes);
        Ok(1)
    }

    async fn soft_delete(&mut self, id: CarId) -> Result<u64, InfraError> {
        self.check_query()?;
        let mut store = self.provider.store();
        let Some(slot) = store.cars.iter_mut().find(|c| c.id() == id) else {
            return Ok(0);
        };
        *slot = slot.clone().soft_deleted();
        Ok(1)
    }
}
