use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A doctor's working-hours window for one calendar date. At most one
/// exists per (doctor, date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    /// Capacity ceiling for active appointments on this date; `None` is unlimited.
    pub max_patients: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }

    pub fn is_full(&self, active_count: usize) -> bool {
        matches!(self.max_patients, Some(max) if active_count >= max as usize)
    }
}

/// Values written by a schedule upsert. Storage fills in id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSchedule {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub max_patients: Option<u32>,
}

impl NewSchedule {
    /// Same hours, availability and capacity as `source`, placed on `date`.
    pub fn replicate(source: &Schedule, date: NaiveDate) -> Self {
        Self {
            doctor_id: source.doctor_id,
            date,
            start_time: source.start_time,
            end_time: source.end_time,
            is_available: source.is_available,
            max_patients: source.max_patients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(max_patients: Option<u32>) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            is_available: true,
            max_patients,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let s = schedule(None);
        assert!(s.contains(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
        assert!(s.contains(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
        assert!(!s.contains(NaiveTime::from_hms_opt(7, 59, 0).unwrap()));
        assert!(!s.contains(NaiveTime::from_hms_opt(17, 1, 0).unwrap()));
    }

    #[test]
    fn capacity_is_unlimited_without_max_patients() {
        assert!(!schedule(None).is_full(500));
        assert!(!schedule(Some(2)).is_full(1));
        assert!(schedule(Some(2)).is_full(2));
        assert!(schedule(Some(0)).is_full(0));
    }

    #[test]
    fn replicate_keeps_hours_and_capacity() {
        let source = schedule(Some(4));
        let target = NaiveDate::from_ymd_opt(2030, 1, 14).unwrap();
        let copy = NewSchedule::replicate(&source, target);

        assert_eq!(copy.date, target);
        assert_eq!(copy.start_time, source.start_time);
        assert_eq!(copy.end_time, source.end_time);
        assert_eq!(copy.max_patients, Some(4));
        assert_eq!(copy.doctor_id, source.doctor_id);
    }
}
