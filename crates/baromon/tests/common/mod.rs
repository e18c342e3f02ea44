#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use baromon::cycle::Watcher;
use baromon_alert::DecisionEngine;
use baromon_common::clock::Clock;
use baromon_common::types::{NotificationMemory, PressureReading};
use baromon_notify::error::NotifyError;
use baromon_notify::manager::NotificationManager;
use baromon_notify::NotificationChannel;
use baromon_source::{ReadingSource, SourceError};
use baromon_storage::{MemoryStore, PRESSURE_DROP_KEY};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 2024-06-01 at `h:m` JST.
pub fn jst(h: u32, m: u32) -> DateTime<Utc> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 1, h, m, 0)
        .unwrap()
        .with_timezone(&Utc)
}

#[derive(Debug, Clone)]
pub enum Answer {
    Reading(PressureReading),
    Missing,
    Unavailable(String),
    Invalid(String),
}

pub struct FakeSource {
    name: &'static str,
    answer: Arc<Mutex<Answer>>,
}

#[async_trait]
impl ReadingSource for FakeSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, _now: DateTime<Utc>) -> baromon_source::Result<Option<PressureReading>> {
        match self.answer.lock().unwrap().clone() {
            Answer::Reading(r) => Ok(Some(r)),
            Answer::Missing => Ok(None),
            Answer::Unavailable(msg) => Err(SourceError::Unavailable(msg)),
            Answer::Invalid(msg) => Err(SourceError::InvalidReading(msg)),
        }
    }
}

pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<String>>>,
    ok: Arc<Mutex<bool>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, message: &str) -> baromon_notify::error::Result<()> {
        if !*self.ok.lock().unwrap() {
            return Err(NotifyError::ApiError {
                service: "line".to_string(),
                status: 500,
                body: "internal error".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "recording"
    }
}

pub struct SharedClock(Arc<Mutex<DateTime<Utc>>>);

impl Clock for SharedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub struct Harness {
    pub temp_dir: TempDir,
    pub watcher: Watcher,
    historical: Arc<Mutex<Answer>>,
    current: Arc<Mutex<Answer>>,
    now: Arc<Mutex<DateTime<Utc>>>,
    sent: Arc<Mutex<Vec<String>>>,
    channel_ok: Arc<Mutex<bool>>,
}

impl Harness {
    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    /// Historical reading 30 minutes before the current clock, current
    /// reading at the clock.
    pub fn set_pressure(&self, historical_hpa: f64, current_hpa: f64) {
        let now = *self.now.lock().unwrap();
        self.set_historical(Answer::Reading(PressureReading::new(
            now - Duration::minutes(30),
            historical_hpa,
        )));
        self.set_current(Answer::Reading(PressureReading::new(now, current_hpa)));
    }

    pub fn set_historical(&self, answer: Answer) {
        *self.historical.lock().unwrap() = answer;
    }

    pub fn set_current(&self, answer: Answer) {
        *self.current.lock().unwrap() = answer;
    }

    pub fn set_channel_ok(&self, ok: bool) {
        *self.channel_ok.lock().unwrap() = ok;
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn memory(&self) -> NotificationMemory {
        self.watcher.store.load(PRESSURE_DROP_KEY).unwrap()
    }

    /// Records a send at `at` directly in the store.
    pub fn seed_memory(&self, at: DateTime<Utc>) {
        self.watcher
            .store
            .transact(PRESSURE_DROP_KEY, |m| {
                Ok::<_, baromon_storage::StorageError>(((), Some(m.recorded(at))))
            })
            .unwrap();
    }
}

/// Watcher with the default policy, fake sources, one recording channel
/// and a fresh SQLite store in a temp dir. The clock starts at 09:00 JST.
pub fn build_harness() -> Result<Harness> {
    let temp_dir = tempfile::tempdir()?;
    let store = MemoryStore::new(temp_dir.path(), std::time::Duration::from_millis(500))?;

    let historical = Arc::new(Mutex::new(Answer::Missing));
    let current = Arc::new(Mutex::new(Answer::Missing));
    let now = Arc::new(Mutex::new(jst(9, 0)));
    let sent = Arc::new(Mutex::new(Vec::new()));
    let channel_ok = Arc::new(Mutex::new(true));

    let channel = RecordingChannel {
        sent: Arc::clone(&sent),
        ok: Arc::clone(&channel_ok),
    };

    let watcher = Watcher {
        engine: DecisionEngine::default(),
        historical: Box::new(FakeSource {
            name: "fake-history",
            answer: Arc::clone(&historical),
        }),
        current: Box::new(FakeSource {
            name: "fake-sensor",
            answer: Arc::clone(&current),
        }),
        store,
        notifier: NotificationManager::new(vec![Box::new(channel)]),
        clock: Box::new(SharedClock(Arc::clone(&now))),
        message_template: baromon_notify::message::DEFAULT_TEMPLATE.to_string(),
    };

    Ok(Harness {
        temp_dir,
        watcher,
        historical,
        current,
        now,
        sent,
        channel_ok,
    })
}
