//! # Clinic Backend Gateway
//!
//! [`ClinicGateway`] is the boundary between the bot and the clinic REST API.
//! No transport failure crosses it unhandled: list-style operations collapse
//! failures into an empty result, the rest return a [`GatewayError`] that keeps
//! the detail for logs.
//!
//! [`HttpClinicGateway`] is the `reqwest` implementation. Every call is
//! attempted once, with the configured timeout, behind a circuit breaker.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::breaker::CircuitBreaker;
use crate::config::ApiConfig;
use crate::errors::GatewayError;
use crate::models::{Appointment, Doctor, EntityId, NewAppointment, Room, TokenResponse, User};
use crate::statistics::{self, UserStatistics};

/// Specialization filter value meaning "no filter".
pub const ALL_SPECIALIZATIONS: &str = "all";

#[async_trait]
pub trait ClinicGateway: Send + Sync {
    /// Exchange credentials for an access token.
    async fn login(&self, email: &str, password: &str) -> Result<String, GatewayError>;

    /// Doctors, optionally restricted to one specialization (case-insensitive
    /// exact match; `None` or `"all"` means every doctor). Empty on failure.
    async fn list_doctors(&self, specialization: Option<&str>, token: Option<&str>) -> Vec<Doctor>;

    async fn get_doctor(&self, doctor_id: &EntityId, token: &str) -> Result<Doctor, GatewayError>;

    /// Appointments of the user with `email`. Empty on failure.
    async fn list_appointments(&self, email: &str, token: &str) -> Vec<Appointment>;

    /// Book `time` (`HH:MM`) on `date` with the doctor, in the first available room.
    async fn create_appointment(
        &self,
        doctor_id: &EntityId,
        date: NaiveDate,
        time: &str,
        email: &str,
        token: &str,
    ) -> Result<Appointment, GatewayError>;

    async fn cancel_appointment(&self, appointment_id: &EntityId, token: &str) -> bool;

    /// Statistics over the user's appointments, attributing each visit via
    /// the doctor's detail record. Each distinct doctor is fetched once.
    async fn compute_statistics(&self, email: &str, token: &str) -> UserStatistics {
        let appointments = self.list_appointments(email, token).await;

        let mut doctors: HashMap<EntityId, Doctor> = HashMap::new();
        let mut unresolved: HashSet<EntityId> = HashSet::new();
        for doctor_id in appointments.iter().filter_map(|a| a.doctor_id.as_ref()) {
            if doctors.contains_key(doctor_id) || unresolved.contains(doctor_id) {
                continue;
            }
            match self.get_doctor(doctor_id, token).await {
                Ok(doctor) => {
                    doctors.insert(doctor_id.clone(), doctor);
                }
                Err(e) => {
                    warn!(doctor_id = %doctor_id, error = %e, "Doctor lookup failed while computing statistics");
                    unresolved.insert(doctor_id.clone());
                }
            }
        }

        statistics::aggregate(&appointments, &doctors)
    }
}

/// Keep the doctors matching `specialization`, see [`ClinicGateway::list_doctors`].
pub fn filter_by_specialization(doctors: Vec<Doctor>, specialization: Option<&str>) -> Vec<Doctor> {
    match specialization.map(str::trim) {
        None => doctors,
        Some(filter) if filter.is_empty() || filter.eq_ignore_ascii_case(ALL_SPECIALIZATIONS) => doctors,
        Some(filter) => {
            let wanted = filter.to_lowercase();
            doctors
                .into_iter()
                .filter(|d| d.specialization.trim().to_lowercase() == wanted)
                .collect()
        }
    }
}

pub struct HttpClinicGateway {
    client: Client,
    base_url: String,
    breaker: CircuitBreaker,
}

impl HttpClinicGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker: CircuitBreaker::new(config.breaker.clone()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request, refusing locally while the breaker is open.
    ///
    /// The breaker is not updated here; callers pass the outcome of the whole
    /// exchange, body included, through [`Self::settle`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        if self.breaker.is_open() {
            warn!("Circuit breaker open, refusing backend call");
            return Err(GatewayError::Unavailable);
        }
        Ok(request.send().await?)
    }

    /// Feed the outcome of one backend exchange to the breaker.
    fn settle<T>(&self, result: Result<T, GatewayError>) -> Result<T, GatewayError> {
        match &result {
            Err(GatewayError::Unavailable) => {}
            Err(e) if e.is_backend_fault() => self.breaker.record_failure(),
            _ => self.breaker.record_success(),
        }
        result
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, GatewayError> {
        let result = self.fetch_json(path, token).await;
        self.settle(result)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, GatewayError> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = self.send(request).await?;
        match response.status() {
            status if status.is_success() => decode_body(response).await,
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::AuthFailed),
            status => Err(GatewayError::Status(status.as_u16())),
        }
    }

    async fn request_token(&self, email: &str, password: &str) -> Result<String, GatewayError> {
        let request = self
            .client
            .post(self.url("/auth/login"))
            .form(&[("username", email), ("password", password)]);

        let response = self.send(request).await?;
        let status = response.status();
        if status.is_client_error() {
            info!(status = status.as_u16(), "Login rejected by backend");
            return Err(GatewayError::AuthFailed);
        }
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: TokenResponse = decode_body(response).await?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or(GatewayError::AuthFailed)
    }

    async fn post_appointment(&self, body: &NewAppointment, token: &str) -> Result<Appointment, GatewayError> {
        let request = self.client.post(self.url("/appointments")).bearer_auth(token).json(body);

        let response = self.send(request).await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => decode_body(response).await,
            status => {
                warn!(status = status.as_u16(), doctor_id = %body.doctor_id, "Appointment creation rejected");
                Err(GatewayError::Status(status.as_u16()))
            }
        }
    }

    async fn delete_appointment(&self, appointment_id: &EntityId, token: &str) -> Result<(), GatewayError> {
        let request = self
            .client
            .delete(self.url(&format!("/appointments/{appointment_id}")))
            .bearer_auth(token);

        let response = self.send(request).await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => Err(GatewayError::Status(status.as_u16())),
        }
    }

    /// The API has no "appointments by email" endpoint, so the email is first
    /// resolved to a user id through the full user list.
    async fn resolve_user_id(&self, email: &str, token: &str) -> Result<EntityId, GatewayError> {
        let users: Vec<User> = self.get_json("/users", Some(token)).await?;
        let email = email.trim();
        users
            .into_iter()
            .find(|u| u.email.trim().eq_ignore_ascii_case(email))
            .map(|u| u.id)
            .ok_or_else(|| GatewayError::UserNotFound(email.to_string()))
    }

    async fn fetch_user_appointments(&self, email: &str, token: &str) -> Result<Vec<Appointment>, GatewayError> {
        let user_id = self.resolve_user_id(email, token).await?;
        let appointments: Vec<Appointment> = self.get_json("/appointments", Some(token)).await?;
        Ok(appointments
            .into_iter()
            .filter(|a| a.user_id.as_ref() == Some(&user_id))
            .collect())
    }

    async fn first_room(&self, token: &str) -> Result<EntityId, GatewayError> {
        let rooms: Vec<Room> = self.get_json("/rooms", Some(token)).await?;
        rooms
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or(GatewayError::NoRoomsAvailable)
    }
}

#[async_trait]
impl ClinicGateway for HttpClinicGateway {
    async fn login(&self, email: &str, password: &str) -> Result<String, GatewayError> {
        let result = self.request_token(email, password).await;
        self.settle(result)
    }

    async fn list_doctors(&self, specialization: Option<&str>, token: Option<&str>) -> Vec<Doctor> {
        match self.get_json::<Vec<Doctor>>("/doctors", token).await {
            Ok(doctors) => {
                let doctors = filter_by_specialization(doctors, specialization);
                debug!(count = doctors.len(), specialization = ?specialization, "Doctors fetched");
                doctors
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch doctors");
                Vec::new()
            }
        }
    }

    async fn get_doctor(&self, doctor_id: &EntityId, token: &str) -> Result<Doctor, GatewayError> {
        self.get_json(&format!("/doctors/{doctor_id}"), Some(token))
            .await
            .inspect_err(|e| warn!(doctor_id = %doctor_id, error = %e, "Failed to fetch doctor"))
    }

    async fn list_appointments(&self, email: &str, token: &str) -> Vec<Appointment> {
        match self.fetch_user_appointments(email, token).await {
            Ok(appointments) => appointments,
            Err(e) => {
                warn!(error = %e, "Failed to fetch user appointments");
                Vec::new()
            }
        }
    }

    async fn create_appointment(
        &self,
        doctor_id: &EntityId,
        date: NaiveDate,
        time: &str,
        email: &str,
        token: &str,
    ) -> Result<Appointment, GatewayError> {
        let user_id = self.resolve_user_id(email, token).await?;
        let room_id = self.first_room(token).await?;

        let body = NewAppointment {
            user_id,
            doctor_id: doctor_id.clone(),
            room_id,
            datetime: format!("{}T{}:00", date.format("%Y-%m-%d"), time),
        };

        let result = self.post_appointment(&body, token).await;
        let appointment = self.settle(result)?;
        info!(appointment_id = %appointment.id, doctor_id = %doctor_id, "Appointment created");
        Ok(appointment)
    }

    async fn cancel_appointment(&self, appointment_id: &EntityId, token: &str) -> bool {
        let result = self.delete_appointment(appointment_id, token).await;
        match self.settle(result) {
            Ok(()) => {
                info!(appointment_id = %appointment_id, "Appointment cancelled");
                true
            }
            Err(e) => {
                warn!(appointment_id = %appointment_id, error = %e, "Appointment cancellation failed");
                false
            }
        }
    }
}

async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: i64, specialization: &str) -> Doctor {
        Doctor {
            id: id.into(),
            name: "Имя".into(),
            surname: "Фамилия".into(),
            specialization: specialization.into(),
            experience_years: None,
        }
    }

    #[test]
    fn test_filter_all_or_absent_keeps_everything() {
        let doctors = vec![doctor(1, "Кардиология"), doctor(2, "Терапия")];
        assert_eq!(filter_by_specialization(doctors.clone(), None).len(), 2);
        assert_eq!(filter_by_specialization(doctors.clone(), Some("all")).len(), 2);
        assert_eq!(filter_by_specialization(doctors, Some("ALL")).len(), 2);
    }

    #[test]
    fn test_filter_is_case_insensitive_exact_match() {
        let doctors = vec![
            doctor(1, "кардиология"),
            doctor(2, "Терапия"),
            doctor(3, "Детская кардиология"),
        ];
        let filtered = filter_by_specialization(doctors, Some("Кардиология"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, EntityId::Int(1));
    }

    #[test]
    fn test_gateway_url_building() {
        let config = ApiConfig {
            base_url: "http://clinic.local/api/v1/".into(),
            ..Default::default()
        };
        let gateway = HttpClinicGateway::new(&config).unwrap();
        assert_eq!(gateway.base_url(), "http://clinic.local/api/v1");
        assert_eq!(gateway.url("/doctors"), "http://clinic.local/api/v1/doctors");
    }
}
