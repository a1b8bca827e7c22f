use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, CreateAppointmentRequest, PatchAppointmentRequest};
use appointment_cell::services::AppointmentBookingService;
use shared_database::ClinicStore;
use shared_models::clinic::{AppointmentStatus, Doctor};
use shared_utils::test_utils::{utc, TestClinic, TestConfig, TestDoctor};

fn clinic_with(doctor: &Doctor) -> TestClinic {
    TestClinic::with_doctors(vec![doctor.clone()])
}

fn booking(doctor_id: Uuid, patient: &str, start_at: DateTime<Utc>) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_name: patient.to_string(),
        doctor_id,
        start_at,
        status: None,
    }
}

fn reschedule(start_at: DateTime<Utc>) -> PatchAppointmentRequest {
    PatchAppointmentRequest { status: None, start_at: Some(start_at) }
}

fn set_status(status: AppointmentStatus) -> PatchAppointmentRequest {
    PatchAppointmentRequest { status: Some(status), start_at: None }
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn test_create_derives_end_and_defaults_to_confirmed() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let service = AppointmentBookingService::new(&clinic.state);

    let created = service
        .create_appointment(booking(doctor.id, "  Pedro Castillo ", utc(2025, 3, 10, 10, 0)))
        .await
        .unwrap();

    let stored = clinic.store.find_appointment(created.id).await.unwrap().unwrap();
    assert_eq!(stored.patient_name, "Pedro Castillo");
    assert_eq!(stored.end_at, utc(2025, 3, 10, 10, 30));
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_create_conflict_leaves_store_unchanged() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 10, 0), AppointmentStatus::Confirmed).await;

    let service = AppointmentBookingService::new(&clinic.state);
    let result = service
        .create_appointment(booking(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 0)))
        .await;

    assert_matches!(result, Err(AppointmentError::Conflict));
    assert_eq!(clinic.store.appointment_count().await, 1);
}

#[tokio::test]
async fn test_partial_overlap_is_a_conflict() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 10, 0), AppointmentStatus::Done).await;

    let service = AppointmentBookingService::new(&clinic.state);
    let result = service
        .create_appointment(booking(doctor.id, "Luis Vega", utc(2025, 3, 10, 9, 45)))
        .await;

    assert_matches!(result, Err(AppointmentError::Conflict));
}

#[tokio::test]
async fn test_back_to_back_appointments_are_allowed() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 10, 0), AppointmentStatus::Confirmed).await;

    let service = AppointmentBookingService::new(&clinic.state);
    service.create_appointment(booking(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 30))).await.unwrap();
    service.create_appointment(booking(doctor.id, "Rosa Díaz", utc(2025, 3, 10, 9, 30))).await.unwrap();

    assert_eq!(clinic.store.appointment_count().await, 3);
}

#[tokio::test]
async fn test_cancelled_slot_can_be_rebooked() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 10, 0), AppointmentStatus::Cancelled).await;

    let service = AppointmentBookingService::new(&clinic.state);
    let result = service
        .create_appointment(booking(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 0)))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_same_slot_with_another_doctor_is_allowed() {
    let first = TestDoctor::general("Dra. Camila Rojas");
    let second = TestDoctor::general("Dr. Tomás Fuentes");
    let clinic = TestClinic::with_doctors(vec![first.clone(), second.clone()]);
    clinic.seed_appointment(first.id, "Ana Torres", utc(2025, 3, 10, 10, 0), AppointmentStatus::Confirmed).await;

    let service = AppointmentBookingService::new(&clinic.state);
    let result = service
        .create_appointment(booking(second.id, "Luis Vega", utc(2025, 3, 10, 10, 0)))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_short_patient_name_is_rejected_before_doctor_lookup() {
    let clinic = TestClinic::with_doctors(vec![]);
    let service = AppointmentBookingService::new(&clinic.state);

    let result = service
        .create_appointment(booking(Uuid::new_v4(), " J ", utc(2025, 3, 10, 10, 0)))
        .await;

    assert_matches!(result, Err(AppointmentError::Validation(_)));
}

#[tokio::test]
async fn test_unknown_doctor_is_not_found() {
    let clinic = TestClinic::with_doctors(vec![]);
    let service = AppointmentBookingService::new(&clinic.state);

    let result = service
        .create_appointment(booking(Uuid::new_v4(), "Luis Vega", utc(2025, 3, 10, 10, 0)))
        .await;

    assert_matches!(result, Err(AppointmentError::DoctorNotFound));
    assert_eq!(clinic.store.appointment_count().await, 0);
}

#[tokio::test]
async fn test_unknown_doctors_leave_no_lock_entries() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let service = AppointmentBookingService::new(&clinic.state);

    for _ in 0..50 {
        let result = service
            .create_appointment(booking(Uuid::new_v4(), "Luis Vega", utc(2025, 3, 10, 10, 0)))
            .await;
        assert_matches!(result, Err(AppointmentError::DoctorNotFound));
    }
    assert_eq!(clinic.state.doctor_locks.len(), 0);

    service
        .create_appointment(booking(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 0)))
        .await
        .unwrap();
    assert_eq!(clinic.state.doctor_locks.len(), 1);
}

#[tokio::test]
async fn test_unrepresentable_end_is_a_validation_error() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");

    let clinic = TestClinic::with_config(
        TestConfig { appointment_minutes: 1_000_000_000_000, ..TestConfig::default() },
        vec![doctor.clone()],
    );
    let result = AppointmentBookingService::new(&clinic.state)
        .create_appointment(booking(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 0)))
        .await;
    assert_matches!(result, Err(AppointmentError::Validation(_)));

    let clinic = clinic_with(&doctor);
    let service = AppointmentBookingService::new(&clinic.state);
    let result = service
        .create_appointment(booking(doctor.id, "Luis Vega", DateTime::<Utc>::MAX_UTC))
        .await;
    assert_matches!(result, Err(AppointmentError::Validation(_)));
    assert_eq!(clinic.store.appointment_count().await, 0);

    let apt = clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 9, 0), AppointmentStatus::Confirmed).await;
    let result = service.update_appointment(apt.id, reschedule(DateTime::<Utc>::MAX_UTC)).await;
    assert_matches!(result, Err(AppointmentError::Validation(_)));

    let stored = clinic.store.find_appointment(apt.id).await.unwrap().unwrap();
    assert_eq!(stored.start_at, utc(2025, 3, 10, 9, 0));
}

#[tokio::test]
async fn test_explicit_status_is_kept() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let service = AppointmentBookingService::new(&clinic.state);

    let request = CreateAppointmentRequest {
        status: Some(AppointmentStatus::Done),
        ..booking(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 0))
    };
    let created = service.create_appointment(request).await.unwrap();

    assert_eq!(created.status, AppointmentStatus::Done);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_for_one_slot_yield_one_success() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);

    let tasks = (0..16).map(|i| {
        let state = Arc::clone(&clinic.state);
        let doctor_id = doctor.id;
        tokio::spawn(async move {
            AppointmentBookingService::new(&state)
                .create_appointment(booking(doctor_id, &format!("Paciente {}", i), utc(2025, 3, 10, 10, 0)))
                .await
        })
    });

    let results = futures::future::join_all(tasks).await;
    let successes = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(successes, 1);
    assert_eq!(clinic.store.appointment_count().await, 1);
}

// ==============================================================================
// PATCH
// ==============================================================================

#[tokio::test]
async fn test_reschedule_onto_taken_slot_conflicts() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let a = clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 9, 0), AppointmentStatus::Confirmed).await;
    clinic.seed_appointment(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 0), AppointmentStatus::Confirmed).await;

    let service = AppointmentBookingService::new(&clinic.state);
    let result = service.update_appointment(a.id, reschedule(utc(2025, 3, 10, 10, 0))).await;

    assert_matches!(result, Err(AppointmentError::Conflict));
    let stored = clinic.store.find_appointment(a.id).await.unwrap().unwrap();
    assert_eq!(stored.start_at, utc(2025, 3, 10, 9, 0));
}

#[tokio::test]
async fn test_reschedule_onto_own_slot_succeeds() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let a = clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 9, 0), AppointmentStatus::Confirmed).await;

    let service = AppointmentBookingService::new(&clinic.state);
    service.update_appointment(a.id, reschedule(utc(2025, 3, 10, 9, 15))).await.unwrap();

    let stored = clinic.store.find_appointment(a.id).await.unwrap().unwrap();
    assert_eq!(stored.start_at, utc(2025, 3, 10, 9, 15));
    assert_eq!(stored.end_at, utc(2025, 3, 10, 9, 45));
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_status_change_keeps_schedule() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let a = clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 9, 0), AppointmentStatus::Confirmed).await;

    let service = AppointmentBookingService::new(&clinic.state);
    service.update_appointment(a.id, set_status(AppointmentStatus::Cancelled)).await.unwrap();

    let stored = clinic.store.find_appointment(a.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
    assert_eq!(stored.start_at, a.start_at);
    assert_eq!(stored.end_at, a.end_at);
}

#[tokio::test]
async fn test_reviving_into_taken_slot_conflicts() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let cancelled = clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 10, 0), AppointmentStatus::Cancelled).await;
    clinic.seed_appointment(doctor.id, "Luis Vega", utc(2025, 3, 10, 10, 0), AppointmentStatus::Confirmed).await;

    let service = AppointmentBookingService::new(&clinic.state);
    let result = service.update_appointment(cancelled.id, set_status(AppointmentStatus::Confirmed)).await;

    assert_matches!(result, Err(AppointmentError::Conflict));
    let stored = clinic.store.find_appointment(cancelled.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_reviving_into_free_slot_succeeds() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let cancelled = clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 10, 0), AppointmentStatus::Cancelled).await;

    let service = AppointmentBookingService::new(&clinic.state);
    service.update_appointment(cancelled.id, set_status(AppointmentStatus::Done)).await.unwrap();

    let stored = clinic.store.find_appointment(cancelled.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Done);
}

#[tokio::test]
async fn test_patch_unknown_appointment_is_not_found() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let service = AppointmentBookingService::new(&clinic.state);

    let result = service
        .update_appointment(Uuid::new_v4(), set_status(AppointmentStatus::Done))
        .await;
    assert_matches!(result, Err(AppointmentError::NotFound));

    let result = service
        .update_appointment(Uuid::new_v4(), PatchAppointmentRequest::default())
        .await;
    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_empty_patch_is_a_no_op() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let a = clinic.seed_appointment(doctor.id, "Ana Torres", utc(2025, 3, 10, 9, 0), AppointmentStatus::Done).await;

    let service = AppointmentBookingService::new(&clinic.state);
    service.update_appointment(a.id, PatchAppointmentRequest::default()).await.unwrap();

    let stored = clinic.store.find_appointment(a.id).await.unwrap().unwrap();
    assert_eq!(stored, a);
}

#[tokio::test]
async fn test_invariant_holds_after_mixed_operations() {
    let doctor = TestDoctor::general("Dra. Camila Rojas");
    let clinic = clinic_with(&doctor);
    let service = AppointmentBookingService::new(&clinic.state);

    let mut ids = Vec::new();
    for (hour, minute) in [(9, 0), (9, 15), (9, 30), (10, 0), (10, 10), (10, 30)] {
        if let Ok(apt) = service
            .create_appointment(booking(doctor.id, "Paciente Prueba", utc(2025, 3, 10, hour, minute)))
            .await
        {
            ids.push(apt.id);
        }
    }
    let _ = service.update_appointment(ids[0], reschedule(utc(2025, 3, 10, 10, 20))).await;
    let _ = service.update_appointment(ids[1], set_status(AppointmentStatus::Cancelled)).await;
    let _ = service.update_appointment(ids[0], reschedule(utc(2025, 3, 10, 9, 40))).await;

    let all = clinic
        .store
        .list_appointments(&shared_database::AppointmentFilter::for_doctor(doctor.id))
        .await
        .unwrap();
    let active: Vec<_> = all.iter().filter(|a| a.status.holds_slot()).collect();
    for (i, left) in active.iter().enumerate() {
        for right in active.iter().skip(i + 1) {
            assert!(!left.range().overlaps(&right.range()), "{:?} overlaps {:?}", left, right);
        }
    }
}
