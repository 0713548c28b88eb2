use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{
    Appointment, AppointmentRecord, AppointmentStatus, DoctorProfile, NewAppointment,
    NewSchedule, Notification, Schedule,
};

use crate::repository::{
    AppointmentFilter, AppointmentRepository, DoctorDirectory, NotificationSink,
    RecordRepository, ScheduleRepository, StoreError, UpsertOutcome,
};
use crate::supabase::SupabaseClient;

const ACTIVE_STATUSES: &str = "status=in.(pending,confirmed)";
const TIME_FORMAT: &str = "%H:%M:%S";

const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";
const IGNORE_DUPLICATES: &str = "resolution=ignore-duplicates,return=representation";

/// PostgREST-backed storage. The active-slot partial unique index in
/// `sql/schema.sql` is what makes concurrent bookings safe here.
pub struct SupabaseStore {
    supabase: SupabaseClient,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn auth_token(&self) -> Option<&str> {
        Some(self.service_key.as_str()).filter(|key| !key.is_empty())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        Ok(self.supabase.request(Method::GET, path, self.auth_token(), None).await?)
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
        prefer: &'static str,
    ) -> Result<T, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(prefer));

        Ok(self.supabase.request_with_headers(
            method,
            path,
            self.auth_token(),
            Some(body),
            Some(headers),
        ).await?)
    }
}

fn first_or_missing<T>(rows: Vec<T>, what: &str) -> Result<T, StoreError> {
    rows.into_iter().next().ok_or_else(|| StoreError::NotFound(what.to_string()))
}

#[async_trait]
impl ScheduleRepository for SupabaseStore {
    async fn find_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Option<Schedule>, StoreError> {
        let path = format!("/rest/v1/schedules?doctor_id=eq.{}&date=eq.{}&limit=1", doctor_id, date);
        let rows: Vec<Schedule> = self.get(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_schedule(&self, schedule: NewSchedule) -> Result<UpsertOutcome, StoreError> {
        debug!("Upserting schedule for doctor {} on {}", schedule.doctor_id, schedule.date);

        let existed = self.find_schedule(schedule.doctor_id, schedule.date).await?.is_some();

        let body = json!({
            "doctor_id": schedule.doctor_id,
            "date": schedule.date,
            "start_time": schedule.start_time.format(TIME_FORMAT).to_string(),
            "end_time": schedule.end_time.format(TIME_FORMAT).to_string(),
            "is_available": schedule.is_available,
            "max_patients": schedule.max_patients,
            "updated_at": Utc::now().to_rfc3339()
        });

        let rows: Vec<Schedule> = self.write(
            Method::POST,
            "/rest/v1/schedules?on_conflict=doctor_id,date",
            body,
            MERGE_DUPLICATES,
        ).await?;

        let schedule = rows.into_iter().next()
            .ok_or_else(|| StoreError::Backend("Schedule upsert returned no rows".to_string()))?;

        Ok(UpsertOutcome { schedule, created: !existed })
    }

    async fn list_schedules(&self, doctor_id: Option<Uuid>) -> Result<Vec<Schedule>, StoreError> {
        let mut path = "/rest/v1/schedules?order=date.asc,start_time.asc".to_string();
        if let Some(doctor_id) = doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }
        self.get(&path).await
    }

    async fn delete_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> Result<bool, StoreError> {
        let path = format!("/rest/v1/schedules?doctor_id=eq.{}&date=eq.{}", doctor_id, date);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(RETURN_REPRESENTATION));

        let deleted: Vec<Schedule> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            self.auth_token(),
            None,
            Some(headers),
        ).await?;

        Ok(!deleted.is_empty())
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseStore {
    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let rows: Vec<Appointment> = self.get(&format!("/rest/v1/appointments?id=eq.{}", id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn active_on(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&{}&order=time.asc",
            doctor_id, date, ACTIVE_STATUSES
        );
        self.get(&path).await
    }

    async fn find_active_at(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&time=eq.{}&{}&limit=1",
            doctor_id, date, time.format(TIME_FORMAT), ACTIVE_STATUSES
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }
        let rows: Vec<Appointment> = self.get(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn count_active_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<usize, StoreError> {
        let mut path = format!(
            "/rest/v1/appointments?select=id&doctor_id=eq.{}&date=eq.{}&{}",
            doctor_id, date, ACTIVE_STATUSES
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }
        let rows: Vec<Value> = self.get(&path).await?;
        Ok(rows.len())
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let now = Utc::now().to_rfc3339();
        let body = json!({
            "patient_id": appointment.patient_id,
            "doctor_id": appointment.doctor_id,
            "date": appointment.date,
            "time": appointment.time.format(TIME_FORMAT).to_string(),
            "status": AppointmentStatus::Pending,
            "notes": appointment.notes,
            "created_at": now,
            "updated_at": now
        });

        let rows: Vec<Appointment> = self.write(
            Method::POST,
            "/rest/v1/appointments",
            body,
            RETURN_REPRESENTATION,
        ).await?;

        rows.into_iter().next()
            .ok_or_else(|| StoreError::Backend("Appointment insert returned no rows".to_string()))
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment, StoreError> {
        let body = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        });
        let rows: Vec<Appointment> = self.write(
            Method::PATCH,
            &format!("/rest/v1/appointments?id=eq.{}", id),
            body,
            RETURN_REPRESENTATION,
        ).await?;

        first_or_missing(rows, "Appointment")
    }

    async fn move_appointment(&self, id: Uuid, date: NaiveDate, time: NaiveTime) -> Result<Appointment, StoreError> {
        let body = json!({
            "date": date,
            "time": time.format(TIME_FORMAT).to_string(),
            "status": AppointmentStatus::Pending,
            "updated_at": Utc::now().to_rfc3339()
        });
        let rows: Vec<Appointment> = self.write(
            Method::PATCH,
            &format!("/rest/v1/appointments?id=eq.{}", id),
            body,
            RETURN_REPRESENTATION,
        ).await?;

        first_or_missing(rows, "Appointment")
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let mut query_parts = Vec::new();

        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(date) = filter.date {
            query_parts.push(format!("date=eq.{}", date));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        query_parts.push("order=date.desc,time.desc".to_string());

        self.get(&format!("/rest/v1/appointments?{}", query_parts.join("&"))).await
    }
}

#[async_trait]
impl RecordRepository for SupabaseStore {
    async fn get_or_create_record(&self, appointment_id: Uuid) -> Result<(AppointmentRecord, bool), StoreError> {
        // ignore-duplicates returns no rows when the record already exists
        let inserted: Vec<AppointmentRecord> = self.write(
            Method::POST,
            "/rest/v1/appointment_records?on_conflict=appointment_id",
            json!({ "appointment_id": appointment_id }),
            IGNORE_DUPLICATES,
        ).await?;

        if let Some(record) = inserted.into_iter().next() {
            return Ok((record, true));
        }

        let existing: Vec<AppointmentRecord> = self.get(
            &format!("/rest/v1/appointment_records?appointment_id=eq.{}", appointment_id)
        ).await?;

        Ok((first_or_missing(existing, "Appointment record")?, false))
    }

    async fn save_record(&self, record: &AppointmentRecord) -> Result<AppointmentRecord, StoreError> {
        let body = json!({
            "reason": record.reason,
            "description": record.description,
            "status_before": record.status_before,
            "status_after": record.status_after,
            "updated_at": Utc::now().to_rfc3339()
        });
        let rows: Vec<AppointmentRecord> = self.write(
            Method::PATCH,
            &format!("/rest/v1/appointment_records?id=eq.{}", record.id),
            body,
            RETURN_REPRESENTATION,
        ).await?;

        first_or_missing(rows, "Appointment record")
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=id,price,verification_status,is_available",
            doctor_id
        );
        let rows: Vec<DoctorProfile> = self.get(&path).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl NotificationSink for SupabaseStore {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        let body = json!({
            "recipient_id": notification.recipient_id,
            "appointment_id": notification.appointment_id,
            "message": notification.message,
            "type": notification.notification_type,
            "is_read": false,
            "created_at": notification.created_at.to_rfc3339()
        });

        let _: Value = self.write(Method::POST, "/rest/v1/notifications", body, RETURN_MINIMAL).await?;
        Ok(())
    }
}
