#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use appointment_cell::{AppointmentBookingService, BookingRules, CreateAppointmentRequest};
use availability_cell::{ScheduleService, UpsertScheduleRequest};
use shared_database::Repositories;
use shared_models::Actor;
use shared_utils::test_utils::{hm, TestClinic};

pub struct Harness {
    pub clinic: TestClinic,
    pub service: AppointmentBookingService,
    pub doctor_id: Uuid,
    pub tomorrow: NaiveDate,
}

impl Harness {
    /// A verified doctor working 08:00-17:00 tomorrow with no capacity limit.
    pub async fn new() -> Self {
        Self::with_capacity(None).await
    }

    pub async fn with_capacity(max_patients: Option<u32>) -> Self {
        let clinic = TestClinic::new();
        let doctor_id = clinic.add_verified_doctor().await;
        let tomorrow = clinic.days_from_today(1);
        publish(&clinic, doctor_id, tomorrow, hm(8, 0), hm(17, 0), max_patients).await;

        let service = booking_service(&clinic, clinic.repos.clone());
        Self { clinic, service, doctor_id, tomorrow }
    }

    pub async fn book(&self, patient_id: Uuid, time: NaiveTime) -> shared_models::Appointment {
        self.service
            .create_appointment(&Actor::Patient(patient_id), request(self.doctor_id, self.tomorrow, time))
            .await
            .unwrap()
    }
}

pub fn booking_service(clinic: &TestClinic, repos: Repositories) -> AppointmentBookingService {
    AppointmentBookingService::with_repositories(repos, clinic.clinic_clock.clone(), BookingRules::default())
}

pub async fn publish(
    clinic: &TestClinic,
    doctor_id: Uuid,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    max_patients: Option<u32>,
) {
    ScheduleService::with_repositories(&clinic.repos, clinic.clinic_clock.clone())
        .upsert_schedule(&Actor::Doctor(doctor_id), doctor_id, UpsertScheduleRequest {
            date,
            start_time: start,
            end_time: end,
            is_available: true,
            max_patients,
        })
        .await
        .unwrap();
}

pub fn request(doctor_id: Uuid, date: NaiveDate, time: NaiveTime) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        doctor_id,
        date,
        time,
        notes: None,
    }
}
