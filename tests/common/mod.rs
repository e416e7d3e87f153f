#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rusqlite::Connection;

use booking_engine::db;
use booking_engine::models::{
    Booking, CustomerInfo, PaymentMethod, PaymentMethodKind, PricingInfo, ServiceDetails,
    SkillLevel, TeachingDetails,
};
use booking_engine::services::clock::{Clock, IdGenerator};
use booking_engine::services::lifecycle::{BookingController, Collaborators, EngineContext};
use booking_engine::services::notifications::Notifier;
use booking_engine::services::payment::{
    ChargeRequest, GatewayCharge, GatewayError, PaymentGateway, PaymentRequest,
};
use booking_engine::services::scheduling::SqliteAppointmentRepository;
use booking_engine::services::store::{KeyValueStore, MemoryStore};

pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

// ── Clock & ids ──

/// Advances one second on every read so successive mutations get distinct timestamps.
pub struct StepClock {
    base: NaiveDateTime,
    ticks: AtomicI64,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            base: dt("2025-06-01 09:00"),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> NaiveDateTime {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.base + chrono::Duration::seconds(n)
    }
}

#[derive(Default)]
pub struct SequentialIds {
    next: AtomicUsize,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_{n}")
    }
}

// ── Mock Providers ──

pub struct MockGateway {
    pub settle: AtomicBool,
    pub stall: AtomicBool,
    pub decline: Mutex<Option<GatewayError>>,
    pub charges: AtomicUsize,
    pub refunds: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            settle: AtomicBool::new(true),
            stall: AtomicBool::new(false),
            decline: Mutex::new(None),
            charges: AtomicUsize::new(0),
            refunds: AtomicUsize::new(0),
        }
    }

    pub fn charge_count(&self) -> usize {
        self.charges.load(Ordering::SeqCst)
    }

    pub fn refund_count(&self) -> usize {
        self.refunds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        let n = self.charges.fetch_add(1, Ordering::SeqCst) + 1;
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.decline.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(GatewayCharge {
            transaction_id: format!("txn_{}_{n}", request.booking_id),
            settled: self.settle.load(Ordering::SeqCst),
        })
    }

    async fn refund(
        &self,
        transaction_id: &str,
        _amount: Decimal,
        _currency: &str,
    ) -> Result<String, GatewayError> {
        let n = self.refunds.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("re_{transaction_id}_{n}"))
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl MockNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_booking_confirmation(&self, booking: &Booking) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("smtp relay down");
        }
        self.sent.lock().unwrap().push(booking.id.clone());
        Ok(())
    }
}

/// Memory store that can be switched to fail every write.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.inner.delete(key).await
    }

    async fn list_keys(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        self.inner.list_keys(prefix).await
    }
}

// ── Harness ──

pub struct Harness {
    pub engine: Arc<EngineContext>,
    pub store: Arc<FlakyStore>,
    pub db: Arc<Mutex<Connection>>,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<MockNotifier>,
}

pub fn harness() -> Harness {
    let db = Arc::new(Mutex::new(db::init_db(":memory:").unwrap()));
    build_harness(Arc::new(FlakyStore::default()), db)
}

/// A fresh engine over the same store and appointment database, as after a process restart.
/// Nothing in memory carries over.
pub fn restart(previous: &Harness) -> Harness {
    build_harness(Arc::clone(&previous.store), Arc::clone(&previous.db))
}

fn build_harness(store: Arc<FlakyStore>, db: Arc<Mutex<Connection>>) -> Harness {
    let gateway = Arc::new(MockGateway::new());
    let notifier = Arc::new(MockNotifier::default());

    let engine = Arc::new(EngineContext::new(
        Collaborators {
            store: store.clone(),
            gateway: gateway.clone(),
            appointments: Arc::new(SqliteAppointmentRepository::new(Arc::clone(&db))),
            notifier: notifier.clone(),
            clock: Arc::new(StepClock::new()),
            ids: Arc::new(SequentialIds::default()),
        },
        Duration::from_secs(5),
        "USD",
    ));

    Harness {
        engine,
        store,
        db,
        gateway,
        notifier,
    }
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+15551234567".to_string(),
        ..Default::default()
    }
}

pub fn piano_lessons() -> ServiceDetails {
    ServiceDetails::Teaching(TeachingDetails {
        lesson_type: Some("Piano".to_string()),
        skill_level: Some(SkillLevel::Beginner),
        session_count: 4,
        focus_areas: vec!["sight reading".to_string()],
    })
}

pub fn priced(base: Decimal) -> PricingInfo {
    PricingInfo {
        base_price: base,
        ..PricingInfo::new("USD")
    }
}

pub fn card_payment(amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        amount,
        currency: "USD".to_string(),
        method: PaymentMethod {
            kind: PaymentMethodKind::Card,
            token: "tok_visa".to_string(),
        },
        description: "Piano lessons".to_string(),
        timeout_secs: None,
    }
}

/// A teaching booking with everything required filled in, priced at $200.
pub fn ready_booking(h: &Harness) -> BookingController {
    let mut controller =
        BookingController::create(h.engine.clone(), piano_lessons(), customer()).unwrap();
    controller.update_pricing(priced(dec!(200))).unwrap();
    controller
}

/// A $200 booking paid in full and confirmed.
pub async fn paid_booking(h: &Harness) -> BookingController {
    let mut controller = ready_booking(h);
    controller.process_payment(card_payment(dec!(200))).await.unwrap();
    controller
}
