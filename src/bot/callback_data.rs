//! Typed inline-keyboard callback data.
//!
//! Buttons carry a compact `prefix[:payload]` string (Telegram allows 64
//! bytes). It is decoded once into [`CallbackAction`] before routing.

use crate::booking::BookingEvent;
use crate::models::EntityId;
use crate::service::Specialization;

/// Telegram's limit on `callback_data`, in bytes.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    Login,
    Register,
    Logout,
    DoctorsMenu,
    Doctors(Specialization),
    AppointmentsMenu,
    ViewAppointments,
    CancelAppointmentsMenu,
    CancelAppointment(EntityId),
    Statistics,
    Booking(BookingEvent),
    /// Decorative button, nothing to do
    Noop,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let (prefix, payload) = match data.split_once(':') {
            Some((prefix, payload)) => (prefix, Some(payload)),
            None => (data, None),
        };

        let action = match (prefix, payload) {
            ("menu", None) => CallbackAction::MainMenu,
            ("login", None) => CallbackAction::Login,
            ("register", None) => CallbackAction::Register,
            ("logout", None) => CallbackAction::Logout,
            ("docs", None) => CallbackAction::DoctorsMenu,
            ("docs", Some(code)) => CallbackAction::Doctors(Specialization::from_code(code)?),
            ("appts", None) => CallbackAction::AppointmentsMenu,
            ("appts", Some("list")) => CallbackAction::ViewAppointments,
            ("appts", Some("cancel")) => CallbackAction::CancelAppointmentsMenu,
            ("apc", Some(id)) => CallbackAction::CancelAppointment(EntityId::parse(id)?),
            ("stats", None) => CallbackAction::Statistics,
            ("bk", Some(rest)) => CallbackAction::Booking(parse_booking(rest)?),
            ("noop", None) => CallbackAction::Noop,
            _ => return None,
        };
        Some(action)
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackAction::MainMenu => "menu".to_string(),
            CallbackAction::Login => "login".to_string(),
            CallbackAction::Register => "register".to_string(),
            CallbackAction::Logout => "logout".to_string(),
            CallbackAction::DoctorsMenu => "docs".to_string(),
            CallbackAction::Doctors(specialization) => format!("docs:{}", specialization.code()),
            CallbackAction::AppointmentsMenu => "appts".to_string(),
            CallbackAction::ViewAppointments => "appts:list".to_string(),
            CallbackAction::CancelAppointmentsMenu => "appts:cancel".to_string(),
            CallbackAction::CancelAppointment(id) => format!("apc:{id}"),
            CallbackAction::Statistics => "stats".to_string(),
            CallbackAction::Booking(event) => match event {
                BookingEvent::Start => "bk:start".to_string(),
                BookingEvent::SelectDoctor(id) => format!("bk:doc:{id}"),
                BookingEvent::SelectTime(slot) => format!("bk:time:{slot}"),
                BookingEvent::Confirm => "bk:confirm".to_string(),
                BookingEvent::Cancel => "bk:cancel".to_string(),
            },
            CallbackAction::Noop => "noop".to_string(),
        }
    }
}

fn parse_booking(rest: &str) -> Option<BookingEvent> {
    let (step, arg) = match rest.split_once(':') {
        Some((step, arg)) => (step, Some(arg)),
        None => (rest, None),
    };
    match (step, arg) {
        ("start", None) => Some(BookingEvent::Start),
        ("doc", Some(id)) => EntityId::parse(id).map(BookingEvent::SelectDoctor),
        // Slots contain a colon themselves ("09:00")
        ("time", Some(slot)) if !slot.is_empty() => Some(BookingEvent::SelectTime(slot.to_string())),
        ("confirm", None) => Some(BookingEvent::Confirm),
        ("cancel", None) => Some(BookingEvent::Cancel),
        _ => None,
    }
}
