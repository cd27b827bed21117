//! Clinic operations behind the menu: login, doctor search, appointment
//! history and cancellation, statistics.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

use crate::booking::BookingDraft;
use crate::errors::{ClinicError, GatewayError};
use crate::gateway::{ClinicGateway, ALL_SPECIALIZATIONS};
use crate::models::{Appointment, Doctor, EntityId};
use crate::session::{Session, SessionStore};
use crate::statistics::UserStatistics;
use crate::store::{UserKey, UserStore};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@:]+@[^\s@:]+\.[^\s@:]+$").expect("email pattern should be valid"));

/// Medical fields offered in the search menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specialization {
    Cardiology,
    Neurology,
    Ophthalmology,
    Dentistry,
    Therapy,
    Surgery,
    All,
}

impl Specialization {
    pub const ALL: [Specialization; 7] = [
        Specialization::Cardiology,
        Specialization::Neurology,
        Specialization::Ophthalmology,
        Specialization::Dentistry,
        Specialization::Therapy,
        Specialization::Surgery,
        Specialization::All,
    ];

    /// Short code used in callback data.
    pub fn code(&self) -> &'static str {
        match self {
            Specialization::Cardiology => "cardiology",
            Specialization::Neurology => "neurology",
            Specialization::Ophthalmology => "ophthalmology",
            Specialization::Dentistry => "dentistry",
            Specialization::Therapy => "therapy",
            Specialization::Surgery => "surgery",
            Specialization::All => ALL_SPECIALIZATIONS,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Specialization name as stored by the clinic backend.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Specialization::Cardiology => "Кардиология",
            Specialization::Neurology => "Неврология",
            Specialization::Ophthalmology => "Офтальмология",
            Specialization::Dentistry => "Стоматология",
            Specialization::Therapy => "Терапия",
            Specialization::Surgery => "Хирургия",
            Specialization::All => ALL_SPECIALIZATIONS,
        }
    }

    /// Localization key of the menu label.
    pub fn label_key(&self) -> &'static str {
        match self {
            Specialization::Cardiology => "spec-cardiology",
            Specialization::Neurology => "spec-neurology",
            Specialization::Ophthalmology => "spec-ophthalmology",
            Specialization::Dentistry => "spec-dentistry",
            Specialization::Therapy => "spec-therapy",
            Specialization::Surgery => "spec-surgery",
            Specialization::All => "spec-all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Parse a login message of the form `email:password`.
pub fn parse_credentials(text: &str) -> Result<Credentials, ClinicError> {
    let (email, password) = text
        .trim()
        .split_once(':')
        .ok_or(ClinicError::InvalidCredentialsFormat)?;
    let email = email.trim();
    let password = password.trim();

    if !EMAIL_PATTERN.is_match(email) || password.is_empty() {
        return Err(ClinicError::InvalidCredentialsFormat);
    }

    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

pub struct ClinicService {
    gateway: Arc<dyn ClinicGateway>,
    sessions: Arc<SessionStore>,
    drafts: Arc<dyn UserStore<BookingDraft>>,
}

impl ClinicService {
    pub fn new(
        gateway: Arc<dyn ClinicGateway>,
        sessions: Arc<SessionStore>,
        drafts: Arc<dyn UserStore<BookingDraft>>,
    ) -> Self {
        Self {
            gateway,
            sessions,
            drafts,
        }
    }

    pub async fn login(&self, user: UserKey, credentials: Credentials) -> Result<(), ClinicError> {
        match self.gateway.login(&credentials.email, &credentials.password).await {
            Ok(token) => {
                self.sessions.record_login(user, token, credentials.email).await?;
                info!(user_id = %user, "User logged in");
                Ok(())
            }
            Err(GatewayError::AuthFailed) => Err(ClinicError::AuthFailed),
            Err(e) => {
                warn!(user_id = %user, error = %e, "Login failed");
                Err(ClinicError::OperationFailed(e))
            }
        }
    }

    /// Forget the session and any booking in progress.
    pub async fn logout(&self, user: UserKey) -> Result<bool, ClinicError> {
        self.drafts.take(user).await?;
        let had_session = self.sessions.logout(user).await?;
        if had_session {
            info!(user_id = %user, "User logged out");
        }
        Ok(had_session)
    }

    pub async fn is_authenticated(&self, user: UserKey) -> Result<bool, ClinicError> {
        Ok(self.sessions.is_authenticated(user).await?)
    }

    /// Doctors of one specialization; the user's token is sent when logged in.
    pub async fn find_doctors(&self, user: UserKey, specialization: Specialization) -> Result<Vec<Doctor>, ClinicError> {
        let token = self.sessions.token(user).await?;
        let filter = match specialization {
            Specialization::All => None,
            other => Some(other.backend_name()),
        };
        Ok(self.gateway.list_doctors(filter, token.as_deref()).await)
    }

    pub async fn appointments(&self, user: UserKey) -> Result<Vec<Appointment>, ClinicError> {
        let session = self.require_session(user).await?;
        Ok(self.gateway.list_appointments(&session.email, &session.token).await)
    }

    pub async fn cancel_appointment(&self, user: UserKey, appointment_id: &EntityId) -> Result<(), ClinicError> {
        let session = self.require_session(user).await?;
        if self.gateway.cancel_appointment(appointment_id, &session.token).await {
            Ok(())
        } else {
            Err(ClinicError::OperationFailed(GatewayError::NotFound))
        }
    }

    pub async fn statistics(&self, user: UserKey) -> Result<UserStatistics, ClinicError> {
        let session = self.require_session(user).await?;
        Ok(self.gateway.compute_statistics(&session.email, &session.token).await)
    }

    async fn require_session(&self, user: UserKey) -> Result<Session, ClinicError> {
        self.sessions.session(user).await?.ok_or(ClinicError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let credentials = parse_credentials(" patient@example.com : password123 ").unwrap();
        assert_eq!(credentials.email, "patient@example.com");
        assert_eq!(credentials.password, "password123");
    }

    #[test]
    fn test_password_may_contain_colons() {
        let credentials = parse_credentials("a@x.com:pa:ss").unwrap();
        assert_eq!(credentials.password, "pa:ss");
    }

    #[test]
    fn test_rejects_malformed_credentials() {
        assert_eq!(parse_credentials("no-colon"), Err(ClinicError::InvalidCredentialsFormat));
        assert_eq!(parse_credentials("not-an-email:pw"), Err(ClinicError::InvalidCredentialsFormat));
        assert_eq!(parse_credentials("a@x.com:"), Err(ClinicError::InvalidCredentialsFormat));
        assert_eq!(parse_credentials("a b@x.com:pw"), Err(ClinicError::InvalidCredentialsFormat));
        assert_eq!(parse_credentials("a@xcom:pw"), Err(ClinicError::InvalidCredentialsFormat));
    }

    #[test]
    fn test_email_pattern_compiles() {
        assert!(EMAIL_PATTERN.is_match("patient@example.com"));
        assert!(!EMAIL_PATTERN.is_match("patient@example"));
    }

    #[test]
    fn test_specialization_codes_round_trip() {
        for specialization in Specialization::ALL {
            assert_eq!(Specialization::from_code(specialization.code()), Some(specialization));
        }
        assert_eq!(Specialization::Cardiology.backend_name(), "Кардиология");
        assert!(Specialization::from_code("astrology").is_none());
    }
}
