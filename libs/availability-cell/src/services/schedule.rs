use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Repositories, ScheduleRepository};
use shared_models::{Actor, BookingError, NewSchedule, Schedule};
use shared_utils::ClinicClock;

use crate::models::{CopyWeekSummary, UpsertScheduleRequest};

const DAYS_PER_WEEK: i64 = 7;

pub struct ScheduleService {
    schedules: Arc<dyn ScheduleRepository>,
    clock: ClinicClock,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_repositories(&Repositories::supabase(config), ClinicClock::system(config))
    }

    pub fn with_repositories(repos: &Repositories, clock: ClinicClock) -> Self {
        Self {
            schedules: Arc::clone(&repos.schedules),
            clock,
        }
    }

    /// Create or replace the working-hours window of a doctor for one date.
    pub async fn upsert_schedule(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        request: UpsertScheduleRequest,
    ) -> Result<Schedule, BookingError> {
        debug!(%doctor_id, date = %request.date, "Upserting schedule");

        if !actor.manages_doctor(doctor_id) {
            warn!(%doctor_id, role = actor.role(), "Schedule upsert refused: not owner");
            return Err(BookingError::NotOwner("manage this doctor's schedule".to_string()));
        }

        if request.date < self.clock.today() {
            return Err(BookingError::PastDate);
        }

        if request.start_time >= request.end_time {
            return Err(BookingError::InvalidRange);
        }

        let outcome = self.schedules.upsert_schedule(NewSchedule {
            doctor_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            is_available: request.is_available,
            max_patients: request.max_patients,
        }).await?;

        info!(
            %doctor_id,
            date = %outcome.schedule.date,
            created = outcome.created,
            "Schedule saved"
        );

        Ok(outcome.schedule)
    }

    pub async fn get_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Schedule, BookingError> {
        self.schedules.find_schedule(doctor_id, date).await?
            .ok_or_else(|| BookingError::NotFound("Schedule".to_string()))
    }

    /// Replicate every schedule of the week starting at `source_week_start`
    /// onto the same weekday offsets of the week starting at
    /// `target_week_start`, overwriting target days that already have one.
    pub async fn copy_week(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        source_week_start: NaiveDate,
        target_week_start: NaiveDate,
    ) -> Result<CopyWeekSummary, BookingError> {
        debug!(%doctor_id, %source_week_start, %target_week_start, "Copying schedule week");

        if !actor.manages_doctor(doctor_id) {
            warn!(%doctor_id, role = actor.role(), "Week copy refused: not owner");
            return Err(BookingError::NotOwner("manage this doctor's schedule".to_string()));
        }

        let today = self.clock.today();
        let mut summary = CopyWeekSummary::default();

        for offset in 0..DAYS_PER_WEEK {
            let source_date = source_week_start + Duration::days(offset);
            let target_date = target_week_start + Duration::days(offset);

            let Some(source) = self.schedules.find_schedule(doctor_id, source_date).await? else {
                summary.skipped += 1;
                summary.skipped_dates.push(target_date);
                continue;
            };

            if target_date < today {
                debug!(%doctor_id, %target_date, "Skipping past target date");
                summary.skipped += 1;
                summary.skipped_dates.push(target_date);
                continue;
            }

            let outcome = self.schedules
                .upsert_schedule(NewSchedule::replicate(&source, target_date))
                .await?;

            if outcome.created {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }

        info!(
            %doctor_id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "Schedule week copied"
        );

        Ok(summary)
    }

    /// Staff see every schedule, doctors their own, patients none.
    pub async fn list_schedules(&self, actor: &Actor) -> Result<Vec<Schedule>, BookingError> {
        let schedules = match actor {
            Actor::Staff => self.schedules.list_schedules(None).await?,
            Actor::Doctor(doctor_id) => self.schedules.list_schedules(Some(*doctor_id)).await?,
            Actor::Patient(_) => Vec::new(),
        };
        Ok(schedules)
    }

    pub async fn delete_schedule(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), BookingError> {
        if !actor.manages_doctor(doctor_id) {
            return Err(BookingError::NotOwner("manage this doctor's schedule".to_string()));
        }

        if !self.schedules.delete_schedule(doctor_id, date).await? {
            return Err(BookingError::NotFound("Schedule".to_string()));
        }

        info!(%doctor_id, %date, "Schedule deleted");
        Ok(())
    }
}
