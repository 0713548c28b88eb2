use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{AppointmentRepository, DoctorDirectory, Repositories, ScheduleRepository};
use shared_models::{BookingError, Schedule, SLOT_LABEL_FORMAT};
use shared_utils::ClinicClock;

/// Admission checks run before a booking is written or moved. Cheap field
/// comparisons come first and the capacity count last; the first failure wins.
///
/// The slot check here only rejects early. Two requests can both pass it,
/// and the storage constraint decides between them.
pub struct BookingValidator {
    schedules: Arc<dyn ScheduleRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    doctors: Arc<dyn DoctorDirectory>,
    clock: ClinicClock,
}

impl BookingValidator {
    pub fn new(repos: &Repositories, clock: ClinicClock) -> Self {
        Self {
            schedules: Arc::clone(&repos.schedules),
            appointments: Arc::clone(&repos.appointments),
            doctors: Arc::clone(&repos.doctors),
            clock,
        }
    }

    /// `exclude` is the appointment being rescheduled, whose current slot
    /// must not count against its new one.
    pub async fn validate_booking(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<Schedule, BookingError> {
        debug!(%patient_id, %doctor_id, %date, %time, "Validating booking");

        let result = self.run_checks(doctor_id, date, time, exclude).await;
        if let Err(err) = &result {
            if err.is_rejection() {
                warn!(%patient_id, %doctor_id, %date, %time, reason = %err.kind(), "Booking rejected");
            }
        }
        result
    }

    async fn run_checks(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<Schedule, BookingError> {
        match self.doctors.find_doctor(doctor_id).await? {
            Some(doctor) if doctor.is_bookable() => {}
            _ => return Err(BookingError::DoctorNotBookable),
        }

        if date.and_time(time) < self.clock.now() {
            return Err(BookingError::PastBooking);
        }

        let schedule = match self.schedules.find_schedule(doctor_id, date).await? {
            Some(schedule) if schedule.is_available => schedule,
            _ => return Err(BookingError::NoWorkingHours(date.to_string())),
        };

        if !schedule.contains(time) {
            return Err(BookingError::OutsideWorkingHours {
                start: schedule.start_time.format(SLOT_LABEL_FORMAT).to_string(),
                end: schedule.end_time.format(SLOT_LABEL_FORMAT).to_string(),
            });
        }

        if self.appointments.find_active_at(doctor_id, date, time, exclude).await?.is_some() {
            return Err(BookingError::SlotTaken);
        }

        if schedule.max_patients.is_some() {
            let active = self.appointments.count_active_on(doctor_id, date, exclude).await?;
            if schedule.is_full(active) {
                return Err(BookingError::CapacityExceeded);
            }
        }

        Ok(schedule)
    }
}
