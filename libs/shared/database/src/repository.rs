use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{
    Appointment, AppointmentRecord, AppointmentStatus, BookingError, DoctorProfile,
    NewAppointment, NewSchedule, Notification, Schedule,
};

use crate::memory::InMemoryStore;
use crate::store::SupabaseStore;
use crate::supabase::SupabaseError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A storage-level unique constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<SupabaseError> for StoreError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::UniqueViolation { constraint, .. } => StoreError::Conflict(constraint),
            SupabaseError::NotFound(message) => StoreError::NotFound(message),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// The only unique constraint a booking write can trip is the active-slot
/// index, so a conflict always means the slot was taken concurrently.
impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => BookingError::SlotTaken,
            StoreError::NotFound(what) => BookingError::NotFound(what),
            StoreError::Backend(message) => {
                error!("Storage failure: {}", message);
                BookingError::Storage(message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub schedule: Schedule,
    /// False when an existing (doctor, date) row was overwritten.
    pub created: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.date.map_or(true, |date| appointment.date == date)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn find_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Option<Schedule>, StoreError>;

    /// Insert or overwrite the single schedule row for (doctor, date).
    async fn upsert_schedule(&self, schedule: NewSchedule) -> Result<UpsertOutcome, StoreError>;

    /// Ordered by date, then start time. `None` lists every doctor.
    async fn list_schedules(&self, doctor_id: Option<Uuid>) -> Result<Vec<Schedule>, StoreError>;

    async fn delete_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Pending and confirmed appointments of a doctor on one date.
    async fn active_on(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, StoreError>;

    async fn find_active_at(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn count_active_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<usize, StoreError>;

    /// Creates a pending appointment. Fails with `StoreError::Conflict` when
    /// another active appointment already holds (doctor, date, time); the
    /// check is atomic with the write.
    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment, StoreError>;

    /// Moves an appointment to a new slot and resets it to pending, with the
    /// same atomic active-slot check as `insert_appointment`.
    async fn move_appointment(&self, id: Uuid, date: NaiveDate, time: NaiveTime) -> Result<Appointment, StoreError>;

    /// Newest date and time first.
    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Returns the record of an appointment, creating an empty shell on first
    /// call. The flag reports whether this call created it.
    async fn get_or_create_record(&self, appointment_id: Uuid) -> Result<(AppointmentRecord, bool), StoreError>;

    async fn save_record(&self, record: &AppointmentRecord) -> Result<AppointmentRecord, StoreError>;
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, StoreError>;
}

/// Fire-and-forget delivery of state-change notices. Callers log and drop failures.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError>;
}

/// Every port the booking core talks to.
#[derive(Clone)]
pub struct Repositories {
    pub schedules: Arc<dyn ScheduleRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub records: Arc<dyn RecordRepository>,
    pub doctors: Arc<dyn DoctorDirectory>,
    pub notifications: Arc<dyn NotificationSink>,
}

impl Repositories {
    pub fn supabase(config: &AppConfig) -> Self {
        let store = Arc::new(SupabaseStore::new(config));
        Self {
            schedules: store.clone(),
            appointments: store.clone(),
            records: store.clone(),
            doctors: store.clone(),
            notifications: store,
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            schedules: store.clone(),
            appointments: store.clone(),
            records: store.clone(),
            doctors: store.clone(),
            notifications: store,
        }
    }

    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = sink;
        self
    }
}
