use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{AppointmentRepository, DoctorDirectory, Repositories, ScheduleRepository};
use shared_models::{BookingError, Schedule};
use shared_utils::ClinicClock;

use crate::models::AvailableSlots;

const CAPACITY_REACHED_MESSAGE: &str = "Doctor has reached the maximum number of patients for this date";

/// Derives the bookable slots of a doctor for one date. Nothing is cached;
/// every call reads the current schedule and bookings.
pub struct SlotCalculator {
    schedules: Arc<dyn ScheduleRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    doctors: Arc<dyn DoctorDirectory>,
    clock: ClinicClock,
}

impl SlotCalculator {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_repositories(&Repositories::supabase(config), ClinicClock::system(config))
    }

    pub fn with_repositories(repos: &Repositories, clock: ClinicClock) -> Self {
        Self {
            schedules: Arc::clone(&repos.schedules),
            appointments: Arc::clone(&repos.appointments),
            doctors: Arc::clone(&repos.doctors),
            clock,
        }
    }

    pub async fn compute_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot_duration_minutes: u32,
    ) -> Result<AvailableSlots, BookingError> {
        debug!(%doctor_id, %date, slot_duration_minutes, "Computing available slots");

        match self.doctors.find_doctor(doctor_id).await? {
            Some(doctor) if doctor.is_bookable() => {}
            _ => return Err(BookingError::DoctorNotBookable),
        }

        if slot_duration_minutes == 0 {
            return Err(BookingError::InvalidRequest(
                "Slot duration must be a positive number of minutes".to_string(),
            ));
        }

        let schedule = match self.schedules.find_schedule(doctor_id, date).await? {
            Some(schedule) if schedule.is_available => schedule,
            _ => return Err(BookingError::NoSchedule),
        };

        let booked = self.appointments.active_on(doctor_id, date).await?;

        let mut response = AvailableSlots {
            doctor_id,
            date,
            slot_duration_minutes,
            slots: Vec::new(),
            capacity_reached: false,
            message: None,
        };

        if schedule.is_full(booked.len()) {
            debug!(%doctor_id, %date, booked = booked.len(), "Capacity reached, no slots offered");
            response.capacity_reached = true;
            response.message = Some(CAPACITY_REACHED_MESSAGE.to_string());
            return Ok(response);
        }

        let taken: HashSet<NaiveTime> = booked.iter().map(|apt| apt.time).collect();
        response.slots = walk_window(
            &schedule,
            Duration::minutes(i64::from(slot_duration_minutes)),
            self.clock.now(),
            &taken,
        );

        Ok(response)
    }
}

/// Steps through the schedule window from its start, keeping each candidate
/// that fits before the end, is not in the past and is not already taken.
fn walk_window(
    schedule: &Schedule,
    step: Duration,
    now: NaiveDateTime,
    taken: &HashSet<NaiveTime>,
) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    if step <= Duration::zero() {
        return slots;
    }

    let end = schedule.date.and_time(schedule.end_time);
    let mut current = schedule.date.and_time(schedule.start_time);

    while current + step <= end {
        if current >= now && !taken.contains(&current.time()) {
            slots.push(current.time());
        }
        current += step;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn window(start: NaiveTime, end: NaiveTime) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2030, 1, 8).unwrap(),
            start_time: start,
            end_time: end,
            is_available: true,
            max_patients: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day_before(schedule: &Schedule) -> NaiveDateTime {
        schedule.date.pred_opt().unwrap().and_time(hm(12, 0))
    }

    #[test]
    fn last_slot_must_end_inside_window() {
        let schedule = window(hm(8, 0), hm(9, 45));
        let slots = walk_window(&schedule, Duration::minutes(30), day_before(&schedule), &HashSet::new());

        assert_eq!(slots, vec![hm(8, 0), hm(8, 30), hm(9, 0)]);
    }

    #[test]
    fn slot_ending_exactly_at_close_is_offered() {
        let schedule = window(hm(8, 0), hm(9, 0));
        let slots = walk_window(&schedule, Duration::minutes(30), day_before(&schedule), &HashSet::new());

        assert_eq!(slots, vec![hm(8, 0), hm(8, 30)]);
    }

    #[test]
    fn past_and_taken_times_are_skipped() {
        let schedule = window(hm(8, 0), hm(11, 0));
        let now = schedule.date.and_time(hm(8, 45));
        let taken: HashSet<NaiveTime> = [hm(9, 30)].into_iter().collect();

        let slots = walk_window(&schedule, Duration::minutes(30), now, &taken);

        assert_eq!(slots, vec![hm(9, 0), hm(10, 0), hm(10, 30)]);
    }

    #[test]
    fn window_shorter_than_step_has_no_slots() {
        let schedule = window(hm(8, 0), hm(8, 20));
        assert!(walk_window(&schedule, Duration::minutes(30), day_before(&schedule), &HashSet::new()).is_empty());
    }

    #[test]
    fn late_window_does_not_wrap_past_midnight() {
        let schedule = window(hm(22, 0), hm(23, 59));
        let slots = walk_window(&schedule, Duration::minutes(60), day_before(&schedule), &HashSet::new());

        assert_eq!(slots, vec![hm(22, 0)]);
    }
}
