use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{InMemoryStore, NotificationSink, Repositories, StoreError};
use shared_models::{DoctorProfile, Notification, VerificationStatus};

use crate::clock::{ClinicClock, FixedClock};
use crate::telemetry::init_test_tracing;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub cancel_cutoff_hours: i64,
    pub reschedule_cutoff_hours: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            cancel_cutoff_hours: 12,
            reschedule_cutoff_hours: 12,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            cancel_cutoff_hours: self.cancel_cutoff_hours,
            reschedule_cutoff_hours: self.reschedule_cutoff_hours,
            ..AppConfig::default()
        }
    }
}

/// `hm(9, 30)` -> 09:30:00
pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// In-memory clinic with a frozen clock, for driving the booking core in tests.
/// The clinic runs on UTC so wall-clock and stored times line up.
pub struct TestClinic {
    pub config: AppConfig,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    pub clinic_clock: ClinicClock,
    pub repos: Repositories,
}

impl Default for TestClinic {
    fn default() -> Self {
        // Monday morning
        Self::starting_at(Utc.with_ymd_and_hms(2030, 1, 7, 8, 0, 0).unwrap())
    }
}

impl TestClinic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self::with_config(TestConfig::default().to_app_config(), now)
    }

    pub fn with_config(config: AppConfig, now: DateTime<Utc>) -> Self {
        init_test_tracing();

        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(now));
        let clinic_clock = ClinicClock::from_config(&config, clock.clone());
        let repos = Repositories::in_memory(store.clone());

        Self { config, store, clock, clinic_clock, repos }
    }

    pub fn today(&self) -> NaiveDate {
        self.clinic_clock.today()
    }

    pub fn days_from_today(&self, days: i64) -> NaiveDate {
        self.today() + Duration::days(days)
    }

    /// Moves the frozen clock to `time` on `date` (clinic-local).
    pub fn set_now(&self, date: NaiveDate, time: NaiveTime) {
        self.clock.set(date.and_time(time).and_utc());
    }

    pub async fn add_doctor(&self, status: VerificationStatus, is_available: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.store.add_doctor(DoctorProfile {
            id,
            price: 250_000,
            verification_status: status,
            is_available,
        }).await;
        id
    }

    pub async fn add_verified_doctor(&self) -> Uuid {
        self.add_doctor(VerificationStatus::Verified, true).await
    }

    pub fn new_patient(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// A notification sink whose delivery always fails.
pub struct FailingNotifier;

#[async_trait]
impl NotificationSink for FailingNotifier {
    async fn notify(&self, _notification: Notification) -> Result<(), StoreError> {
        Err(StoreError::Backend("notification service unavailable".to_string()))
    }
}
