//! Shared test doubles: an in-process clinic backend that records calls.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use clinic_bot::bot::AppState;
use clinic_bot::clock::FixedClock;
use clinic_bot::errors::GatewayError;
use clinic_bot::gateway::{filter_by_specialization, ClinicGateway};
use clinic_bot::models::{Appointment, Doctor, EntityId};
use clinic_bot::store::UserKey;
use std::sync::{Arc, Mutex};

pub const EMAIL: &str = "patient@example.com";
pub const PASSWORD: &str = "password123";
pub const TOKEN: &str = "token-abc";

#[derive(Debug, Clone, PartialEq)]
pub struct CreateCall {
    pub doctor_id: EntityId,
    pub date: NaiveDate,
    pub time: String,
    pub email: String,
    pub token: String,
}

#[derive(Default)]
pub struct FakeGateway {
    pub doctors: Mutex<Vec<Doctor>>,
    pub appointments: Mutex<Vec<Appointment>>,
    pub creates: Mutex<Vec<CreateCall>>,
    pub cancels: Mutex<Vec<EntityId>>,
    pub missing_doctor: Mutex<Option<EntityId>>,
    pub create_error: Mutex<Option<GatewayError>>,
}

impl FakeGateway {
    pub fn with_doctors(doctors: Vec<Doctor>) -> Self {
        let gateway = Self::default();
        *gateway.doctors.lock().unwrap() = doctors;
        gateway
    }

    pub fn create_calls(&self) -> Vec<CreateCall> {
        self.creates.lock().unwrap().clone()
    }

    pub fn fail_doctor_lookup(&self, id: impl Into<EntityId>) {
        *self.missing_doctor.lock().unwrap() = Some(id.into());
    }

    pub fn fail_create(&self, error: GatewayError) {
        *self.create_error.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl ClinicGateway for FakeGateway {
    async fn login(&self, email: &str, password: &str) -> Result<String, GatewayError> {
        if email == EMAIL && password == PASSWORD {
            Ok(TOKEN.to_string())
        } else {
            Err(GatewayError::AuthFailed)
        }
    }

    async fn list_doctors(&self, specialization: Option<&str>, _token: Option<&str>) -> Vec<Doctor> {
        filter_by_specialization(self.doctors.lock().unwrap().clone(), specialization)
    }

    async fn get_doctor(&self, doctor_id: &EntityId, _token: &str) -> Result<Doctor, GatewayError> {
        if self.missing_doctor.lock().unwrap().as_ref() == Some(doctor_id) {
            return Err(GatewayError::NotFound);
        }
        self.doctors
            .lock()
            .unwrap()
            .iter()
            .find(|d| &d.id == doctor_id)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn list_appointments(&self, _email: &str, _token: &str) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }

    async fn create_appointment(
        &self,
        doctor_id: &EntityId,
        date: NaiveDate,
        time: &str,
        email: &str,
        token: &str,
    ) -> Result<Appointment, GatewayError> {
        self.creates.lock().unwrap().push(CreateCall {
            doctor_id: doctor_id.clone(),
            date,
            time: time.to_string(),
            email: email.to_string(),
            token: token.to_string(),
        });
        if let Some(error) = self.create_error.lock().unwrap().clone() {
            return Err(error);
        }
        let id = EntityId::Int(100 + self.creates.lock().unwrap().len() as i64);
        Ok(Appointment {
            id,
            user_id: Some(EntityId::Int(1)),
            doctor_id: Some(doctor_id.clone()),
            room_id: Some(EntityId::Int(1)),
            datetime: Some(format!("{}T{}:00", date.format("%Y-%m-%d"), time)),
        })
    }

    async fn cancel_appointment(&self, appointment_id: &EntityId, _token: &str) -> bool {
        self.cancels.lock().unwrap().push(appointment_id.clone());
        let mut appointments = self.appointments.lock().unwrap();
        let before = appointments.len();
        appointments.retain(|a| &a.id != appointment_id);
        appointments.len() != before
    }
}

pub fn doctor(id: i64, name: &str, surname: &str, specialization: &str) -> Doctor {
    Doctor {
        id: id.into(),
        name: name.to_string(),
        surname: surname.to_string(),
        specialization: specialization.to_string(),
        experience_years: Some(10),
    }
}

pub fn sample_doctors() -> Vec<Doctor> {
    vec![
        doctor(1, "Анна", "Смирнова", "Кардиология"),
        doctor(2, "Игорь", "Петров", "Терапия"),
        doctor(3, "Мария", "Иванова", "кардиология"),
    ]
}

pub fn appointment(id: i64, doctor_id: i64, datetime: &str) -> Appointment {
    Appointment {
        id: id.into(),
        user_id: Some(EntityId::Int(1)),
        doctor_id: Some(doctor_id.into()),
        room_id: Some(EntityId::Int(1)),
        datetime: Some(datetime.to_string()),
    }
}

/// 2026-10-19 12:00
pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub clock: Arc<FixedClock>,
    pub state: AppState,
}

impl Harness {
    pub fn new(gateway: FakeGateway) -> Self {
        let gateway = Arc::new(gateway);
        let clock = Arc::new(FixedClock::new(noon()));
        let state = AppState::in_memory(gateway.clone(), clock.clone(), None, None);
        Self { gateway, clock, state }
    }

    pub fn with_draft_ttl(gateway: FakeGateway, ttl: std::time::Duration) -> Self {
        let gateway = Arc::new(gateway);
        let clock = Arc::new(FixedClock::new(noon()));
        let state = AppState::in_memory(gateway.clone(), clock.clone(), None, Some(ttl));
        Self { gateway, clock, state }
    }

    pub async fn login(&self, user: UserKey) {
        let credentials = clinic_bot::service::parse_credentials(&format!("{EMAIL}:{PASSWORD}")).unwrap();
        self.state.service.login(user, credentials).await.unwrap();
    }
}
