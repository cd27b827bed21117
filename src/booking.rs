//! # Appointment Booking Flow
//!
//! Per-user state machine for booking an appointment:
//!
//! ```text
//! Idle ──Start──▶ SelectingDoctor ──SelectDoctor──▶ SelectingTime ──SelectTime──▶ Confirming ──Confirm──▶ Idle
//!                       │                                 │                           │
//!                       └──────────────Cancel─────────────┴───────────────────────────┴──────────────────▶ Idle
//! ```
//!
//! `Idle` is the absence of a draft. Each stage carries the data gathered so
//! far, so a time can never be stored without a doctor. The flow never
//! retries a backend call; a failed step is reported and the user decides.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::errors::{ClinicError, GatewayError};
use crate::gateway::ClinicGateway;
use crate::models::{Doctor, EntityId};
use crate::session::SessionStore;
use crate::store::{UserKey, UserStore};

/// Bookable start times offered for every doctor.
pub const TIME_SLOTS: &[&str] = &["09:00", "10:00", "11:00", "14:00", "15:00", "16:00", "17:00"];

/// Number of doctors offered when a booking starts.
pub const MAX_DOCTOR_CHOICES: usize = 8;

/// One of [`TIME_SLOTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct TimeSlot(&'static str);

impl TimeSlot {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        TIME_SLOTS.iter().find(|slot| **slot == raw).map(|slot| TimeSlot(*slot))
    }

    pub fn all() -> impl Iterator<Item = TimeSlot> {
        TIME_SLOTS.iter().map(|slot| TimeSlot(*slot))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        TimeSlot::parse(&raw).ok_or_else(|| format!("not a bookable slot: {raw}"))
    }
}

// Derived `try_from` would tie the input lifetime to `'static`
impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TimeSlot::try_from(raw).map_err(de::Error::custom)
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.0.to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Doctor details captured when the doctor is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenDoctor {
    pub id: EntityId,
    pub display_name: String,
    pub specialization: String,
}

impl From<&Doctor> for ChosenDoctor {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id.clone(),
            display_name: doctor.display_name(),
            specialization: doctor.specialization.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStage {
    SelectingDoctor,
    SelectingTime {
        doctor: ChosenDoctor,
    },
    Confirming {
        doctor: ChosenDoctor,
        date: NaiveDate,
        time: TimeSlot,
    },
}

impl BookingStage {
    pub fn name(&self) -> &'static str {
        match self {
            BookingStage::SelectingDoctor => "selecting_doctor",
            BookingStage::SelectingTime { .. } => "selecting_time",
            BookingStage::Confirming { .. } => "confirming",
        }
    }
}

/// In-progress booking of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Doctors offered at start; selections must come from this list
    pub candidates: Vec<Doctor>,
    pub stage: BookingStage,
    pub touched_at: NaiveDateTime,
}

/// Inbound booking actions, decoded once at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    Start,
    SelectDoctor(EntityId),
    SelectTime(String),
    Confirm,
    Cancel,
}

/// What the user should see after a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingReply {
    ChooseDoctor {
        doctors: Vec<Doctor>,
    },
    ChooseTime {
        doctor: ChosenDoctor,
        slots: Vec<TimeSlot>,
    },
    Confirm {
        doctor: ChosenDoctor,
        date: NaiveDate,
        time: TimeSlot,
    },
    Booked {
        appointment_id: EntityId,
        doctor: ChosenDoctor,
        date: NaiveDate,
        time: TimeSlot,
    },
    Cancelled,
}

pub type BookingResult = Result<BookingReply, ClinicError>;

pub struct BookingFlow {
    gateway: Arc<dyn ClinicGateway>,
    sessions: Arc<SessionStore>,
    drafts: Arc<dyn UserStore<BookingDraft>>,
    clock: Arc<dyn Clock>,
    draft_ttl: Option<Duration>,
}

impl BookingFlow {
    pub fn new(
        gateway: Arc<dyn ClinicGateway>,
        sessions: Arc<SessionStore>,
        drafts: Arc<dyn UserStore<BookingDraft>>,
        clock: Arc<dyn Clock>,
        draft_ttl: Option<Duration>,
    ) -> Self {
        Self {
            gateway,
            sessions,
            drafts,
            clock,
            draft_ttl,
        }
    }

    /// Route an event to its transition.
    pub async fn handle(&self, user: UserKey, event: BookingEvent) -> BookingResult {
        debug!(user_id = %user, event = ?event, "Booking event");
        let result = match event {
            BookingEvent::Start => self.start(user).await,
            BookingEvent::SelectDoctor(doctor_id) => self.select_doctor(user, doctor_id).await,
            BookingEvent::SelectTime(slot) => self.select_time(user, &slot).await,
            BookingEvent::Confirm => self.confirm(user).await,
            BookingEvent::Cancel => self.cancel(user).await,
        };
        if let Err(e) = &result {
            info!(user_id = %user, error = %e, "Booking step rejected");
        }
        result
    }

    /// The user's live draft, if any.
    pub async fn draft(&self, user: UserKey) -> Result<Option<BookingDraft>, ClinicError> {
        let Some(draft) = self.drafts.get(user).await? else {
            return Ok(None);
        };
        if self.is_expired(&draft) {
            debug!(user_id = %user, "Booking draft expired, discarding");
            self.drafts.take(user).await?;
            return Ok(None);
        }
        Ok(Some(draft))
    }

    pub async fn start(&self, user: UserKey) -> BookingResult {
        let token = self.sessions.token(user).await?.ok_or(ClinicError::Unauthenticated)?;

        let doctors = self.gateway.list_doctors(None, Some(&token)).await;
        if doctors.is_empty() {
            self.drafts.take(user).await?;
            return Err(ClinicError::NoDoctorsAvailable);
        }

        let candidates: Vec<Doctor> = doctors.into_iter().take(MAX_DOCTOR_CHOICES).collect();
        let draft = BookingDraft {
            candidates: candidates.clone(),
            stage: BookingStage::SelectingDoctor,
            touched_at: self.clock.now(),
        };
        self.drafts.put(user, draft).await?;
        info!(user_id = %user, offered = candidates.len(), "Booking started");

        Ok(BookingReply::ChooseDoctor { doctors: candidates })
    }

    /// Pick a doctor. Also valid from later stages, in which case the new
    /// doctor replaces the old one and any chosen time is dropped.
    pub async fn select_doctor(&self, user: UserKey, doctor_id: EntityId) -> BookingResult {
        let mut draft = self.draft(user).await?.ok_or(ClinicError::NoActiveBooking)?;

        if !draft.candidates.iter().any(|d| d.id == doctor_id) {
            return Err(ClinicError::InvalidSelection(doctor_id.to_string()));
        }

        let token = self.sessions.token(user).await?.ok_or(ClinicError::Unauthenticated)?;
        let doctor = match self.gateway.get_doctor(&doctor_id, &token).await {
            Ok(doctor) => doctor,
            Err(e) => {
                warn!(user_id = %user, doctor_id = %doctor_id, error = %e, "Doctor lookup failed, stage unchanged");
                return Err(ClinicError::DoctorLookupFailed);
            }
        };

        let chosen = ChosenDoctor::from(&doctor);
        draft.stage = BookingStage::SelectingTime {
            doctor: chosen.clone(),
        };
        draft.touched_at = self.clock.now();
        self.drafts.put(user, draft).await?;

        Ok(BookingReply::ChooseTime {
            doctor: chosen,
            slots: TimeSlot::all().collect(),
        })
    }

    /// Pick a time slot; the date is always tomorrow.
    pub async fn select_time(&self, user: UserKey, slot: &str) -> BookingResult {
        let mut draft = self.draft(user).await?.ok_or(ClinicError::NoActiveBooking)?;

        let doctor = match &draft.stage {
            BookingStage::SelectingDoctor => return Err(ClinicError::UnexpectedStep),
            BookingStage::SelectingTime { doctor } | BookingStage::Confirming { doctor, .. } => doctor.clone(),
        };
        let time = TimeSlot::parse(slot).ok_or_else(|| ClinicError::InvalidSelection(slot.to_string()))?;

        let now = self.clock.now();
        let date = now
            .date()
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ClinicError::InvalidSelection(slot.to_string()))?;

        draft.stage = BookingStage::Confirming {
            doctor: doctor.clone(),
            date,
            time,
        };
        draft.touched_at = now;
        self.drafts.put(user, draft).await?;

        Ok(BookingReply::Confirm { doctor, date, time })
    }

    /// Submit the draft. The draft is discarded whatever the outcome.
    pub async fn confirm(&self, user: UserKey) -> BookingResult {
        // Taken out before the backend call so a repeated confirm finds nothing
        let draft = self.drafts.take(user).await?.ok_or(ClinicError::NoActiveBooking)?;
        if self.is_expired(&draft) {
            return Err(ClinicError::NoActiveBooking);
        }

        let (doctor, date, time) = match draft.stage {
            BookingStage::Confirming { doctor, date, time } => (doctor, date, time),
            stage => {
                self.drafts
                    .put(
                        user,
                        BookingDraft {
                            stage,
                            ..draft
                        },
                    )
                    .await?;
                return Err(ClinicError::UnexpectedStep);
            }
        };

        let Some(session) = self.sessions.session(user).await? else {
            return Err(ClinicError::Unauthenticated);
        };

        match self
            .gateway
            .create_appointment(&doctor.id, date, time.as_str(), &session.email, &session.token)
            .await
        {
            Ok(appointment) => {
                info!(user_id = %user, appointment_id = %appointment.id, "Booking completed");
                Ok(BookingReply::Booked {
                    appointment_id: appointment.id,
                    doctor,
                    date,
                    time,
                })
            }
            Err(GatewayError::NoRoomsAvailable) => Err(ClinicError::NoRoomsAvailable),
            Err(e) => {
                warn!(user_id = %user, error = %e, "Appointment creation failed");
                Err(ClinicError::AppointmentCreationFailed)
            }
        }
    }

    /// Drop the draft, whatever stage it is in.
    pub async fn cancel(&self, user: UserKey) -> BookingResult {
        if self.drafts.take(user).await?.is_some() {
            info!(user_id = %user, "Booking cancelled");
        }
        Ok(BookingReply::Cancelled)
    }

    fn is_expired(&self, draft: &BookingDraft) -> bool {
        let Some(ttl) = self.draft_ttl else {
            return false;
        };
        (self.clock.now() - draft.touched_at)
            .to_std()
            .map_or(false, |idle| idle >= ttl)
    }
}
