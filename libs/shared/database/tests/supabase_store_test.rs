use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, headers, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{
    AppointmentRepository, DoctorDirectory, RecordRepository, ScheduleRepository, StoreError,
    SupabaseStore,
};
use shared_models::{BookingError, NewAppointment, NewSchedule, VerificationStatus};

fn test_config(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_key: "test-service-key".to_string(),
        ..AppConfig::default()
    }
}

fn schedule_row(doctor_id: Uuid, date: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "doctor_id": doctor_id,
        "date": date,
        "start_time": "08:00:00",
        "end_time": "17:00:00",
        "is_available": true,
        "max_patients": 5,
        "created_at": "2024-01-01T00:00:00+00:00",
        "updated_at": "2024-01-01T00:00:00+00:00"
    })
}

fn record_row(appointment_id: Uuid) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "appointment_id": appointment_id,
        "reason": null,
        "description": null,
        "status_before": null,
        "status_after": null,
        "created_at": "2024-01-01T00:00:00+00:00",
        "updated_at": "2024-01-01T00:00:00+00:00"
    })
}

#[tokio::test]
async fn test_active_slot_conflict_becomes_slot_taken() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("apikey", "test-anon-key"))
        .and(header("Authorization", "Bearer test-service-key"))
        .and(body_partial_json(json!({ "status": "pending", "time": "09:00:00" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "details": "Key (doctor_id, date, \"time\")=(...) already exists.",
            "hint": null,
            "message": "duplicate key value violates unique constraint \"uq_appointments_active_slot\""
        })))
        .mount(&mock_server)
        .await;

    let store = SupabaseStore::new(&test_config(&mock_server));
    let result = store.insert_appointment(NewAppointment {
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
        time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        notes: None,
    }).await;

    let err = result.unwrap_err();
    assert_eq!(err, StoreError::Conflict("uq_appointments_active_slot".to_string()));
    assert_matches!(BookingError::from(err), BookingError::SlotTaken);
}

#[tokio::test]
async fn test_reschedule_into_taken_slot_becomes_slot_taken() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "status": "pending", "date": "2030-01-08", "time": "10:30:00" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": "duplicate key value violates unique constraint \"uq_appointments_active_slot\""
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseStore::new(&test_config(&mock_server));
    let err = store.move_appointment(
        appointment_id,
        NaiveDate::from_ymd_opt(2030, 1, 8).unwrap(),
        NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
    ).await.unwrap_err();

    assert_eq!(err, StoreError::Conflict("uq_appointments_active_slot".to_string()));
    assert_matches!(BookingError::from(err), BookingError::SlotTaken);
}

#[tokio::test]
async fn test_foreign_key_conflict_is_storage_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23503",
            "details": "Key (doctor_id)=(...) is not present in table \"doctors\".",
            "hint": null,
            "message": "insert or update on table \"appointments\" violates foreign key constraint \"appointments_doctor_id_fkey\""
        })))
        .mount(&mock_server)
        .await;

    let store = SupabaseStore::new(&test_config(&mock_server));
    let err = store.insert_appointment(NewAppointment {
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
        time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        notes: None,
    }).await.unwrap_err();

    assert_matches!(err, StoreError::Backend(_));
    assert_matches!(BookingError::from(err), BookingError::Storage(_));
}

#[tokio::test]
async fn test_schedule_upsert_merges_on_doctor_and_date() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2030-01-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/schedules"))
        .and(query_param("on_conflict", "doctor_id,date"))
        .and(headers("Prefer", vec!["resolution=merge-duplicates", "return=representation"]))
        .and(body_partial_json(json!({ "start_time": "08:00:00", "max_patients": 5 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            schedule_row(doctor_id, "2030-01-07")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseStore::new(&test_config(&mock_server));
    let outcome = store.upsert_schedule(NewSchedule {
        doctor_id,
        date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
        start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        is_available: true,
        max_patients: Some(5),
    }).await.unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.schedule.doctor_id, doctor_id);
    assert_eq!(outcome.schedule.max_patients, Some(5));
}

#[tokio::test]
async fn test_existing_record_is_fetched_not_duplicated() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_records"))
        .and(query_param("on_conflict", "appointment_id"))
        .and(headers("Prefer", vec!["resolution=ignore-duplicates", "return=representation"]))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_records"))
        .and(query_param("appointment_id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record_row(appointment_id)])))
        .mount(&mock_server)
        .await;

    let store = SupabaseStore::new(&test_config(&mock_server));
    let (record, created) = store.get_or_create_record(appointment_id).await.unwrap();

    assert!(!created);
    assert_eq!(record.appointment_id, appointment_id);
}

#[tokio::test]
async fn test_doctor_profile_and_active_count() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": doctor_id,
            "price": 300000,
            "verification_status": "VERIFIED",
            "is_available": true
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id"))
        .and(query_param("status", "in.(pending,confirmed)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() }
        ])))
        .mount(&mock_server)
        .await;

    let store = SupabaseStore::new(&test_config(&mock_server));

    let doctor = store.find_doctor(doctor_id).await.unwrap().unwrap();
    assert_eq!(doctor.verification_status, VerificationStatus::Verified);
    assert!(doctor.is_bookable());

    let count = store.count_active_on(doctor_id, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(), None)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_backend_failure_is_storage_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let store = SupabaseStore::new(&test_config(&mock_server));
    let err = store.find_appointment(Uuid::new_v4()).await.unwrap_err();

    assert_matches!(err, StoreError::Backend(_));
    assert_matches!(BookingError::from(err), BookingError::Storage(_));
}
