use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use shared_config::AppConfig;
use shared_database::Database;

use crate::clock::FixedClock;
use crate::notification::{NotificationKind, NotificationPort};
use crate::state::AppState;

pub struct TestConfig {
    pub patient_id_prefix: String,
    pub conversation_ttl_seconds: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            patient_id_prefix: "APL".to_string(),
            conversation_ttl_seconds: 1800,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_path: ":memory:".to_string(),
            notification_webhook_url: None,
            redis_url: None,
            conversation_ttl_seconds: self.conversation_ttl_seconds,
            patient_id_prefix: self.patient_id_prefix.clone(),
            server_port: 0,
        }
    }
}

/// Captures every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotificationKind, Value)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(NotificationKind, Value)> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.events().into_iter().map(|(kind, _)| kind).collect()
    }

    /// Yields to spawned deliveries until `count` events have arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<NotificationKind> {
        for _ in 0..100 {
            if self.events().len() >= count {
                break;
            }
            tokio::task::yield_now().await;
        }
        self.kinds()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(&self, kind: NotificationKind, payload: Value) -> Result<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push((kind, payload));
        }
        Ok(())
    }
}

/// Always fails, for proving that delivery errors never reach the caller.
pub struct FailingNotifier;

#[async_trait]
impl NotificationPort for FailingNotifier {
    async fn notify(&self, _kind: NotificationKind, _payload: Value) -> Result<()> {
        Err(anyhow!("notification gateway unavailable"))
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    /// In-memory database, recording notifier and a clock frozen at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self::with_config(TestConfig::default(), now)
    }

    pub fn with_config(config: TestConfig, now: NaiveDateTime) -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        let clock = Arc::new(FixedClock::new(now));
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::with_parts(
            config.to_app_config(),
            db,
            notifier.clone(),
            clock.clone(),
        );

        Self { state, clock, notifier }
    }

    pub fn with_failing_notifier(now: NaiveDateTime) -> Self {
        let mut harness = Self::new(now);
        harness.state.notifier = Arc::new(FailingNotifier);
        harness
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, minute, 0).expect("valid test time")
}
