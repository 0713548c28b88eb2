use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::{
    Appointment, AppointmentRecord, AppointmentStatus, DoctorProfile, NewAppointment,
    NewSchedule, Notification, Schedule,
};

use crate::repository::{
    AppointmentFilter, AppointmentRepository, DoctorDirectory, NotificationSink,
    RecordRepository, ScheduleRepository, StoreError, UpsertOutcome,
};

const ACTIVE_SLOT_CONSTRAINT: &str = "uq_appointments_active_slot";

#[derive(Default)]
struct MemoryState {
    doctors: HashMap<Uuid, DoctorProfile>,
    schedules: HashMap<(Uuid, NaiveDate), Schedule>,
    appointments: HashMap<Uuid, Appointment>,
    /// Keyed by appointment id (one record per appointment).
    records: HashMap<Uuid, AppointmentRecord>,
    notifications: Vec<Notification>,
}

impl MemoryState {
    fn slot_taken(&self, doctor_id: Uuid, date: NaiveDate, time: NaiveTime, exclude: Option<Uuid>) -> bool {
        self.appointments.values().any(|apt| {
            apt.is_active()
                && Some(apt.id) != exclude
                && apt.doctor_id == doctor_id
                && apt.date == date
                && apt.time == time
        })
    }

    fn active_on(&self, doctor_id: Uuid, date: NaiveDate) -> impl Iterator<Item = &Appointment> {
        self.appointments.values()
            .filter(move |apt| apt.is_active() && apt.doctor_id == doctor_id && apt.date == date)
    }
}

/// Storage held in process memory. Every write takes the single write lock,
/// so the active-slot check and the write it guards are one atomic step.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_doctor(&self, doctor: DoctorProfile) {
        self.state.write().await.doctors.insert(doctor.id, doctor);
    }

    /// Writes an appointment row verbatim, bypassing booking rules. Meant
    /// for seeding history (past or already-completed visits).
    pub async fn seed_appointment(&self, appointment: Appointment) {
        self.state.write().await.appointments.insert(appointment.id, appointment);
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }

    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStore {
    async fn find_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Option<Schedule>, StoreError> {
        Ok(self.state.read().await.schedules.get(&(doctor_id, date)).cloned())
    }

    async fn upsert_schedule(&self, schedule: NewSchedule) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let key = (schedule.doctor_id, schedule.date);

        let (id, created_at, created) = match state.schedules.get(&key) {
            Some(existing) => (existing.id, existing.created_at, false),
            None => (Uuid::new_v4(), now, true),
        };

        let stored = Schedule {
            id,
            doctor_id: schedule.doctor_id,
            date: schedule.date,
            start_time: schedule.start_time,
            end_time: schedule.end_time,
            is_available: schedule.is_available,
            max_patients: schedule.max_patients,
            created_at,
            updated_at: now,
        };
        state.schedules.insert(key, stored.clone());

        Ok(UpsertOutcome { schedule: stored, created })
    }

    async fn list_schedules(&self, doctor_id: Option<Uuid>) -> Result<Vec<Schedule>, StoreError> {
        let state = self.state.read().await;
        let mut schedules: Vec<Schedule> = state.schedules.values()
            .filter(|s| doctor_id.map_or(true, |id| s.doctor_id == id))
            .cloned()
            .collect();
        schedules.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(schedules)
    }

    async fn delete_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.state.write().await.schedules.remove(&(doctor_id, date)).is_some())
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryStore {
    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.state.read().await.appointments.get(&id).cloned())
    }

    async fn active_on(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state.active_on(doctor_id, date).cloned().collect();
        appointments.sort_by_key(|apt| apt.time);
        Ok(appointments)
    }

    async fn find_active_at(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<Option<Appointment>, StoreError> {
        let state = self.state.read().await;
        let found = state.active_on(doctor_id, date)
            .find(|apt| apt.time == time && Some(apt.id) != exclude)
            .cloned();
        Ok(found)
    }

    async fn count_active_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<usize, StoreError> {
        let state = self.state.read().await;
        let count = state.active_on(doctor_id, date)
            .filter(|apt| Some(apt.id) != exclude)
            .count();
        Ok(count)
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut state = self.state.write().await;

        if state.slot_taken(appointment.doctor_id, appointment.date, appointment.time, None) {
            debug!("Rejecting insert for doctor {} at {} {}: slot held",
                   appointment.doctor_id, appointment.date, appointment.time);
            return Err(StoreError::Conflict(ACTIVE_SLOT_CONSTRAINT.to_string()));
        }

        let now = Utc::now();
        let stored = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            date: appointment.date,
            time: appointment.time,
            status: AppointmentStatus::Pending,
            notes: appointment.notes,
            created_at: now,
            updated_at: now,
        };
        state.appointments.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment, StoreError> {
        let mut state = self.state.write().await;

        let current = state.appointments.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Appointment".to_string()))?;

        if status.is_active()
            && !current.is_active()
            && state.slot_taken(current.doctor_id, current.date, current.time, Some(id))
        {
            return Err(StoreError::Conflict(ACTIVE_SLOT_CONSTRAINT.to_string()));
        }

        let appointment = state.appointments.get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("Appointment".to_string()))?;
        appointment.status = status;
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn move_appointment(&self, id: Uuid, date: NaiveDate, time: NaiveTime) -> Result<Appointment, StoreError> {
        let mut state = self.state.write().await;

        let doctor_id = state.appointments.get(&id)
            .map(|apt| apt.doctor_id)
            .ok_or_else(|| StoreError::NotFound("Appointment".to_string()))?;

        if state.slot_taken(doctor_id, date, time, Some(id)) {
            return Err(StoreError::Conflict(ACTIVE_SLOT_CONSTRAINT.to_string()));
        }

        let appointment = state.appointments.get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("Appointment".to_string()))?;
        appointment.date = date;
        appointment.time = time;
        appointment.status = AppointmentStatus::Pending;
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state.appointments.values()
            .filter(|apt| filter.matches(apt))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
        Ok(appointments)
    }
}

#[async_trait]
impl RecordRepository for InMemoryStore {
    async fn get_or_create_record(&self, appointment_id: Uuid) -> Result<(AppointmentRecord, bool), StoreError> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.records.get(&appointment_id) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let record = AppointmentRecord {
            id: Uuid::new_v4(),
            appointment_id,
            reason: None,
            description: None,
            status_before: None,
            status_after: None,
            created_at: now,
            updated_at: now,
        };
        state.records.insert(appointment_id, record.clone());

        Ok((record, true))
    }

    async fn save_record(&self, record: &AppointmentRecord) -> Result<AppointmentRecord, StoreError> {
        let mut state = self.state.write().await;

        let stored = state.records.get_mut(&record.appointment_id)
            .ok_or_else(|| StoreError::NotFound("Appointment record".to_string()))?;
        *stored = AppointmentRecord { updated_at: Utc::now(), ..record.clone() };

        Ok(stored.clone())
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        Ok(self.state.read().await.doctors.get(&doctor_id).cloned())
    }
}

#[async_trait]
impl NotificationSink for InMemoryStore {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        self.state.write().await.notifications.push(notification);
        Ok(())
    }
}
