//! UI Builder module for creating keyboards and formatting messages
//!
//! Replies are HTML (`ParseMode::Html`); every value coming from the backend
//! or the user is escaped.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html::escape;

use super::callback_data::CallbackAction;
use crate::booking::{BookingEvent, BookingReply, ChosenDoctor, TimeSlot};
use crate::errors::ClinicError;
use crate::localization::{t_args_lang, t_lang};
use crate::models::{Appointment, Doctor};
use crate::service::Specialization;
use crate::statistics::UserStatistics;
use chrono::NaiveDate;

/// Doctors listed in a search result.
pub const MAX_LISTED_DOCTORS: usize = 10;
/// Appointments listed in the history and the cancellation keyboard.
pub const MAX_LISTED_APPOINTMENTS: usize = 5;
/// Telegram limit on button text, in characters.
pub const MAX_BUTTON_TEXT_CHARS: usize = 64;

/// A rendered reply: HTML text plus its inline keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

impl Screen {
    pub fn new(text: String, keyboard: InlineKeyboardMarkup) -> Self {
        Self { text, keyboard }
    }
}

fn button(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    let text: String = text.into();
    let text: String = text.chars().take(MAX_BUTTON_TEXT_CHARS).collect();
    InlineKeyboardButton::callback(text, action.encode())
}

fn title(text: &str) -> String {
    format!("<b>{}</b>", escape(text))
}

fn main_menu_button(lang: Option<&str>) -> InlineKeyboardButton {
    button(t_lang("btn-main-menu", lang), CallbackAction::MainMenu)
}

pub fn main_menu_keyboard(logged_in: bool, lang: Option<&str>) -> InlineKeyboardMarkup {
    let account_button = if logged_in {
        button(t_lang("btn-logout", lang), CallbackAction::Logout)
    } else {
        button(t_lang("btn-login", lang), CallbackAction::Login)
    };

    let mut rows = vec![
        vec![account_button, button(t_lang("btn-doctors", lang), CallbackAction::DoctorsMenu)],
        vec![
            button(t_lang("btn-book", lang), CallbackAction::Booking(BookingEvent::Start)),
            button(t_lang("btn-my-appointments", lang), CallbackAction::AppointmentsMenu),
        ],
        vec![button(t_lang("btn-statistics", lang), CallbackAction::Statistics)],
    ];
    if !logged_in {
        rows.push(vec![button(t_lang("btn-register", lang), CallbackAction::Register)]);
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn back_to_main_keyboard(lang: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![main_menu_button(lang)]])
}

pub fn specializations_keyboard(lang: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Specialization::ALL
        .into_iter()
        .filter(|s| *s != Specialization::All)
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|s| button(t_lang(s.label_key(), lang), CallbackAction::Doctors(*s)))
                .collect()
        })
        .collect();

    rows.push(vec![button(
        t_lang(Specialization::All.label_key(), lang),
        CallbackAction::Doctors(Specialization::All),
    )]);
    rows.push(vec![main_menu_button(lang)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn doctors_for_booking_keyboard(doctors: &[Doctor], lang: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = doctors
        .iter()
        .map(|doctor| {
            vec![button(
                format!("👨‍⚕️ {} - {}", doctor.display_name(), doctor.specialization),
                CallbackAction::Booking(BookingEvent::SelectDoctor(doctor.id.clone())),
            )]
        })
        .collect();

    rows.push(vec![
        button(t_lang("btn-cancel", lang), CallbackAction::Booking(BookingEvent::Cancel)),
        main_menu_button(lang),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Keyboard under a doctor search result.
pub fn doctors_result_keyboard(lang: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(t_lang("btn-book", lang), CallbackAction::Booking(BookingEvent::Start))],
        vec![
            button(t_lang("btn-back", lang), CallbackAction::DoctorsMenu),
            main_menu_button(lang),
        ],
    ])
}

pub fn time_slots_keyboard(slots: &[TimeSlot], lang: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = slots
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|slot| {
                    button(
                        format!("⏰ {slot}"),
                        CallbackAction::Booking(BookingEvent::SelectTime(slot.to_string())),
                    )
                })
                .collect()
        })
        .collect();

    rows.push(vec![
        button(t_lang("btn-back", lang), CallbackAction::Booking(BookingEvent::Start)),
        button(t_lang("btn-cancel", lang), CallbackAction::Booking(BookingEvent::Cancel)),
    ]);
    InlineKeyboardMarkup::new(rows)
}

pub fn booking_confirmation_keyboard(lang: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(t_lang("btn-confirm", lang), CallbackAction::Booking(BookingEvent::Confirm)),
            button(t_lang("btn-cancel", lang), CallbackAction::Booking(BookingEvent::Cancel)),
        ],
        vec![main_menu_button(lang)],
    ])
}

pub fn appointments_menu_keyboard(lang: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(t_lang("btn-view-appointments", lang), CallbackAction::ViewAppointments),
            button(t_lang("btn-cancel-appointment", lang), CallbackAction::CancelAppointmentsMenu),
        ],
        vec![main_menu_button(lang)],
    ])
}

pub fn appointments_for_cancellation_keyboard(
    appointments: &[Appointment],
    lang: Option<&str>,
) -> InlineKeyboardMarkup {
    let not_specified = t_lang("label-not-specified", lang);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = appointments
        .iter()
        .take(MAX_LISTED_APPOINTMENTS)
        .enumerate()
        .map(|(i, appointment)| {
            let date = appointment.date_part().unwrap_or(&not_specified);
            let time = appointment.time_part().unwrap_or("--:--");
            vec![button(
                format!("❌ {}. {} {}", i + 1, date, time),
                CallbackAction::CancelAppointment(appointment.id.clone()),
            )]
        })
        .collect();

    rows.push(vec![
        button(t_lang("btn-back", lang), CallbackAction::AppointmentsMenu),
        main_menu_button(lang),
    ]);
    InlineKeyboardMarkup::new(rows)
}

pub fn format_welcome(first_name: &str, lang: Option<&str>) -> String {
    format!(
        "🏥 {}\n\n{}\n\n{}\n\n{}",
        title(&t_lang("welcome-title", lang)),
        escape(&t_args_lang("welcome-greeting", &[("name", first_name)], lang)),
        escape(&t_lang("welcome-features", lang)),
        escape(&t_lang("welcome-choose", lang)),
    )
}

/// Bold title followed by a paragraph, both localized.
pub fn format_section(icon: &str, title_key: &str, body_key: &str, lang: Option<&str>) -> String {
    format!(
        "{} {}\n\n{}",
        icon,
        title(&t_lang(title_key, lang)),
        escape(&t_lang(body_key, lang))
    )
}

pub fn format_notice(icon: &str, key: &str, lang: Option<&str>) -> String {
    format!("{} {}", icon, escape(&t_lang(key, lang)))
}

pub fn format_main_menu(lang: Option<&str>) -> String {
    format!(
        "🏠 {}\n\n{}",
        title(&t_lang("main-menu-title", lang)),
        escape(&t_lang("main-menu-choose", lang))
    )
}

pub fn format_login_prompt(lang: Option<&str>) -> String {
    format!(
        "🔐 {}\n\n{}\n<code>email:password</code>\n\n{} <code>patient@example.com:password123</code>",
        title(&t_lang("login-title", lang)),
        escape(&t_lang("login-prompt", lang)),
        escape(&t_lang("login-example", lang)),
    )
}

/// Numbered doctor list, at most [`MAX_LISTED_DOCTORS`] entries.
pub fn format_doctor_list(doctors: &[Doctor], specialization: Specialization, lang: Option<&str>) -> String {
    let mut header = t_lang("doctors-title", lang);
    if specialization != Specialization::All {
        header.push_str(&format!(" - {}", specialization.backend_name()));
    }

    let not_specified = t_lang("label-not-specified", lang);
    let mut text = format!("👨‍⚕️ {}\n\n", title(&header));
    for (i, doctor) in doctors.iter().take(MAX_LISTED_DOCTORS).enumerate() {
        let experience = match doctor.experience_years {
            Some(years) => t_args_lang("label-years", &[("years", years.to_string().as_str())], lang),
            None => not_specified.clone(),
        };
        let specialization = if doctor.specialization.is_empty() {
            not_specified.as_str()
        } else {
            doctor.specialization.as_str()
        };
        text.push_str(&format!(
            "<b>{}. {}</b>\n🏥 {}: {}\n📅 {}: {}\n\n",
            i + 1,
            escape(&doctor.display_name()),
            escape(&t_lang("label-specialization", lang)),
            escape(specialization),
            escape(&t_lang("label-experience", lang)),
            escape(&experience),
        ));
    }

    if doctors.len() > MAX_LISTED_DOCTORS {
        let more = (doctors.len() - MAX_LISTED_DOCTORS).to_string();
        text.push_str(&escape(&t_args_lang("doctors-more", &[("count", more.as_str())], lang)));
        text.push_str("\n\n");
    }

    text.push_str(&escape(&t_lang("doctors-booking-hint", lang)));
    text
}

pub fn format_no_doctors(specialization: Specialization, lang: Option<&str>) -> String {
    let name = match specialization {
        Specialization::All => t_lang(Specialization::All.label_key(), lang),
        other => other.backend_name().to_string(),
    };
    format!(
        "❌ {}",
        escape(&t_args_lang("doctors-none", &[("specialization", name.as_str())], lang))
    )
}

/// Appointment history, at most [`MAX_LISTED_APPOINTMENTS`] entries.
pub fn format_appointments(appointments: &[Appointment], lang: Option<&str>) -> String {
    if appointments.is_empty() {
        return format!(
            "📋 {}\n\n{}",
            title(&t_lang("appointments-title", lang)),
            escape(&t_lang("appointments-empty", lang))
        );
    }

    let not_specified = t_lang("label-not-specified", lang);
    let mut text = format!("📋 {}\n\n", title(&t_lang("appointments-title", lang)));
    for (i, appointment) in appointments.iter().take(MAX_LISTED_APPOINTMENTS).enumerate() {
        let entry = t_args_lang("appointment-entry", &[("id", appointment.id.short().as_str())], lang);
        text.push_str(&format!(
            "<b>{}.</b> {}\n📅 {}: {}\n⏰ {}: {}\n\n",
            i + 1,
            escape(&entry),
            escape(&t_lang("label-date", lang)),
            escape(appointment.date_part().unwrap_or(&not_specified)),
            escape(&t_lang("label-time", lang)),
            escape(appointment.time_part().unwrap_or(&not_specified)),
        ));
    }
    text
}

pub fn format_statistics(stats: &UserStatistics, lang: Option<&str>) -> String {
    let mut text = format!("📊 {}\n\n", title(&t_lang("stats-title", lang)));
    text.push_str(&escape(&t_args_lang(
        "stats-total",
        &[("count", stats.total_appointments.to_string().as_str())],
        lang,
    )));

    if stats.total_appointments == 0 {
        text.push_str("\n\n");
        text.push_str(&escape(&t_lang("stats-empty", lang)));
        return text;
    }

    if !stats.favorite_doctors.is_empty() {
        text.push_str(&format!("\n\n⭐ {}\n", title(&t_lang("stats-favorites", lang))));
        for (i, doctor) in stats.favorite_doctors.iter().enumerate() {
            let visits = t_args_lang("stats-visits", &[("count", doctor.visits.to_string().as_str())], lang);
            text.push_str(&format!(
                "{}. {} ({}) - {}\n",
                i + 1,
                escape(&doctor.name),
                escape(&doctor.specialization),
                escape(&visits)
            ));
        }
    }

    if !stats.by_specialization.is_empty() {
        text.push_str(&format!("\n🏥 {}\n", title(&t_lang("stats-by-specialization", lang))));
        for (specialization, count) in &stats.by_specialization {
            text.push_str(&format!("• {}: {}\n", escape(specialization), count));
        }
    }

    if !stats.by_month.is_empty() {
        text.push_str(&format!("\n📅 {}\n", title(&t_lang("stats-by-month", lang))));
        for (month, count) in &stats.by_month {
            text.push_str(&format!("• {month}: {count}\n"));
        }
    }

    text
}

pub fn format_error(error: &ClinicError, lang: Option<&str>) -> String {
    format!(
        "❌ {}\n\n{}",
        title(&t_lang("error-title", lang)),
        escape(&t_lang(error.message_key(), lang))
    )
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn doctor_lines(doctor: &ChosenDoctor, lang: Option<&str>) -> String {
    format!(
        "👨‍⚕️ {}: {}\n🏥 {}: {}",
        escape(&t_lang("label-doctor", lang)),
        escape(&doctor.display_name),
        escape(&t_lang("label-specialization", lang)),
        escape(&doctor.specialization),
    )
}

/// Render a booking transition result.
pub fn render_booking_reply(reply: &BookingReply, lang: Option<&str>) -> Screen {
    match reply {
        BookingReply::ChooseDoctor { doctors } => Screen::new(
            format!("👨‍⚕️ {}", title(&t_lang("booking-choose-doctor", lang))),
            doctors_for_booking_keyboard(doctors, lang),
        ),
        BookingReply::ChooseTime { doctor, slots } => Screen::new(
            format!(
                "{}\n\n{}\n\n⏰ {}",
                title(&t_args_lang("booking-doctor-chosen", &[("name", doctor.display_name.as_str())], lang)),
                doctor_lines(doctor, lang),
                title(&t_lang("booking-choose-time", lang)),
            ),
            time_slots_keyboard(slots, lang),
        ),
        BookingReply::Confirm { doctor, date, time } => Screen::new(
            format!(
                "✅ {}\n\n{}\n📅 {}: {}\n⏰ {}: {}\n\n{}",
                title(&t_lang("booking-confirm-title", lang)),
                doctor_lines(doctor, lang),
                escape(&t_lang("label-date", lang)),
                format_date(*date),
                escape(&t_lang("label-time", lang)),
                time,
                escape(&t_lang("booking-confirm-question", lang)),
            ),
            booking_confirmation_keyboard(lang),
        ),
        BookingReply::Booked {
            appointment_id,
            doctor,
            date,
            time,
        } => Screen::new(
            format!(
                "🎉 {}\n\n📋 {}: #{}\n{}\n📅 {}: {}\n⏰ {}: {}\n\n✅ {}",
                title(&t_lang("booking-success-title", lang)),
                escape(&t_lang("booking-number", lang)),
                escape(&appointment_id.short()),
                doctor_lines(doctor, lang),
                escape(&t_lang("label-date", lang)),
                format_date(*date),
                escape(&t_lang("label-time", lang)),
                time,
                escape(&t_lang("booking-saved", lang)),
            ),
            back_to_main_keyboard(lang),
        ),
        BookingReply::Cancelled => Screen::new(
            format!(
                "❌ {}\n\n{}",
                title(&t_lang("booking-cancelled-title", lang)),
                escape(&t_lang("booking-cancelled", lang))
            ),
            back_to_main_keyboard(lang),
        ),
    }
}
