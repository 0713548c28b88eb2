use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::{AvailableSlots, SlotCalculator};
use shared_config::AppConfig;
use shared_database::{AppointmentFilter, Repositories, StoreError};
use shared_models::{
    Actor, Appointment, AppointmentStatus, BookingError, NewAppointment, Notification,
    NotificationType, RecordFields,
};
use shared_utils::ClinicClock;

use crate::models::{
    AppointmentSearchQuery, BookingRules, CompletionOutcome, CreateAppointmentRequest,
    RescheduleAppointmentRequest,
};
use crate::services::lifecycle::{AppointmentAction, AppointmentLifecycleService};
use crate::services::validator::BookingValidator;

pub struct AppointmentBookingService {
    repos: Repositories,
    validator: BookingValidator,
    lifecycle_service: AppointmentLifecycleService,
    slot_calculator: SlotCalculator,
    clock: ClinicClock,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_repositories(
            Repositories::supabase(config),
            ClinicClock::system(config),
            BookingRules::from_config(config),
        )
    }

    pub fn with_repositories(repos: Repositories, clock: ClinicClock, rules: BookingRules) -> Self {
        Self {
            validator: BookingValidator::new(&repos, clock.clone()),
            lifecycle_service: AppointmentLifecycleService::new(rules),
            slot_calculator: SlotCalculator::with_repositories(&repos, clock.clone()),
            repos,
            clock,
        }
    }

    /// Book a pending appointment for the calling patient.
    pub async fn create_appointment(
        &self,
        actor: &Actor,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let Actor::Patient(patient_id) = *actor else {
            warn!(role = actor.role(), "Only patients may book appointments");
            return Err(BookingError::NotOwner("book appointments".to_string()));
        };

        debug!(%patient_id, doctor_id = %request.doctor_id, date = %request.date, time = %request.time,
               "Creating appointment");

        self.validator
            .validate_booking(patient_id, request.doctor_id, request.date, request.time, None)
            .await?;

        let appointment = self.repos.appointments.insert_appointment(NewAppointment {
            patient_id,
            doctor_id: request.doctor_id,
            date: request.date,
            time: request.time,
            notes: request.notes,
        }).await.map_err(|err| self.slot_conflict(err, request.doctor_id))?;

        info!(appointment_id = %appointment.id, doctor_id = %appointment.doctor_id, "Appointment booked");

        self.notify(
            appointment.doctor_id,
            &appointment,
            NotificationType::AppointmentCreated,
            format!("New appointment booked for {}", appointment.slot_label()),
        ).await;

        Ok(appointment)
    }

    pub async fn confirm_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, BookingError> {
        let appointment = self.transition(appointment_id, actor, AppointmentAction::Confirm).await?;

        self.notify(
            appointment.patient_id,
            &appointment,
            NotificationType::AppointmentConfirmed,
            format!("Your appointment on {} has been confirmed", appointment.slot_label()),
        ).await;

        Ok(appointment)
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, BookingError> {
        let appointment = self.transition(appointment_id, actor, AppointmentAction::Cancel).await?;

        self.notify(
            appointment.doctor_id,
            &appointment,
            NotificationType::AppointmentCanceled,
            format!("Appointment on {} was canceled by the patient", appointment.slot_label()),
        ).await;

        Ok(appointment)
    }

    /// Mark a confirmed visit completed and stamp its record. The record
    /// shell is created at most once per appointment.
    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        fields: Option<RecordFields>,
    ) -> Result<CompletionOutcome, BookingError> {
        let current = self.load(appointment_id).await?;
        self.lifecycle_service.authorize_transition(
            &current,
            actor,
            AppointmentAction::Complete,
            self.clock.now(),
        )?;

        // Record before status, so a failed status write leaves nothing a retry would duplicate.
        let (mut record, created) = self.repos.records.get_or_create_record(appointment_id).await?;
        debug!(%appointment_id, created, "Appointment record ready");

        if let Some(fields) = fields.filter(|fields| !fields.is_empty()) {
            if record.apply(&fields) {
                record = self.repos.records.save_record(&record).await?;
            }
        }

        let appointment = self.repos.appointments
            .update_status(appointment_id, AppointmentStatus::Completed)
            .await?;
        info!(%appointment_id, "Appointment completed");

        self.notify(
            appointment.patient_id,
            &appointment,
            NotificationType::AppointmentCompleted,
            format!("Your appointment on {} has been completed", appointment.slot_label()),
        ).await;

        Ok(CompletionOutcome { appointment, record })
    }

    /// Move an appointment to a new slot with the same doctor. The row is
    /// updated in place and goes back to pending.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let current = self.load(appointment_id).await?;
        self.lifecycle_service.authorize_transition(
            &current,
            actor,
            AppointmentAction::Reschedule,
            self.clock.now(),
        )?;

        self.validator.validate_booking(
            current.patient_id,
            current.doctor_id,
            request.new_date,
            request.new_time,
            Some(current.id),
        ).await?;

        let appointment = self.repos.appointments
            .move_appointment(appointment_id, request.new_date, request.new_time)
            .await
            .map_err(|err| self.slot_conflict(err, current.doctor_id))?;

        info!(
            %appointment_id,
            from = %current.slot_label(),
            to = %appointment.slot_label(),
            "Appointment rescheduled"
        );

        self.notify(
            appointment.doctor_id,
            &appointment,
            NotificationType::AppointmentRescheduled,
            format!("Appointment moved from {} to {}", current.slot_label(), appointment.slot_label()),
        ).await;

        Ok(appointment)
    }

    /// Appointments the caller may not see are reported as missing.
    pub async fn get_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, BookingError> {
        let appointment = self.load(appointment_id).await?;

        let visible = actor.is_staff()
            || actor.is_patient(appointment.patient_id)
            || actor.is_doctor(appointment.doctor_id);
        if !visible {
            return Err(BookingError::NotFound("Appointment".to_string()));
        }

        Ok(appointment)
    }

    /// Newest first. Patients and doctors only see their own appointments.
    pub async fn list_appointments(
        &self,
        actor: &Actor,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut filter = AppointmentFilter {
            date: query.date,
            status: query.status,
            ..AppointmentFilter::default()
        };

        match actor {
            Actor::Patient(id) => filter.patient_id = Some(*id),
            Actor::Doctor(id) => filter.doctor_id = Some(*id),
            Actor::Staff => {}
        }

        Ok(self.repos.appointments.list_appointments(filter).await?)
    }

    pub async fn list_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot_duration_minutes: Option<u32>,
    ) -> Result<AvailableSlots, BookingError> {
        let minutes = slot_duration_minutes.unwrap_or(self.lifecycle_service.rules().default_slot_minutes);
        self.slot_calculator.compute_slots(doctor_id, date, minutes).await
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.repos.appointments.find_appointment(appointment_id).await?
            .ok_or_else(|| BookingError::NotFound("Appointment".to_string()))
    }

    /// Shared path of confirm and cancel: guard, then write the target status.
    async fn transition(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        action: AppointmentAction,
    ) -> Result<Appointment, BookingError> {
        debug!(%appointment_id, role = actor.role(), "Attempting {}", action.as_str());

        let current = self.load(appointment_id).await?;
        self.lifecycle_service.authorize_transition(&current, actor, action, self.clock.now())?;

        let appointment = self.repos.appointments
            .update_status(appointment_id, action.target_status())
            .await?;

        info!(%appointment_id, from = %current.status, to = %appointment.status, "Appointment status changed");
        Ok(appointment)
    }

    fn slot_conflict(&self, err: StoreError, doctor_id: Uuid) -> BookingError {
        let err = BookingError::from(err);
        if err == BookingError::SlotTaken {
            warn!(%doctor_id, "Slot was taken by a concurrent booking");
        }
        err
    }

    async fn notify(
        &self,
        recipient_id: Uuid,
        appointment: &Appointment,
        notification_type: NotificationType,
        message: String,
    ) {
        let notification = Notification::new(
            recipient_id,
            appointment.id,
            notification_type,
            message,
            self.clock.now_utc(),
        );

        if let Err(err) = self.repos.notifications.notify(notification).await {
            warn!(
                appointment_id = %appointment.id,
                %recipient_id,
                "Failed to send {} notification: {}",
                notification_type,
                err
            );
        }
    }
}
