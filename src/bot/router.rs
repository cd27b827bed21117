//! Transport-independent routing: a decoded action or a text message goes in,
//! the [`Screen`] to show comes out. Handlers only deal with Telegram I/O.

use tracing::{debug, warn};

use super::callback_data::CallbackAction;
use super::ui_builder::{
    appointments_for_cancellation_keyboard, appointments_menu_keyboard, back_to_main_keyboard,
    doctors_result_keyboard, format_appointments, format_doctor_list, format_error, format_login_prompt,
    format_main_menu, format_no_doctors, format_notice, format_section, format_statistics, format_welcome,
    main_menu_keyboard, render_booking_reply, specializations_keyboard, Screen,
};
use super::AppState;
use crate::errors::ClinicError;
use crate::service::parse_credentials;
use crate::store::UserKey;

/// Reply to a text message.
#[derive(Debug, Clone, PartialEq)]
pub struct TextReply {
    pub screen: Screen,
    /// The incoming message held credentials and should be removed from the chat.
    pub delete_source: bool,
}

impl TextReply {
    fn keep(screen: Screen) -> Self {
        Self {
            screen,
            delete_source: false,
        }
    }
}

fn error_screen(error: &ClinicError, lang: Option<&str>) -> Screen {
    let keyboard = match error {
        ClinicError::Unauthenticated => main_menu_keyboard(false, lang),
        _ => back_to_main_keyboard(lang),
    };
    Screen::new(format_error(error, lang), keyboard)
}

fn render<T>(result: Result<T, ClinicError>, lang: Option<&str>, ok: impl FnOnce(T) -> Screen) -> Screen {
    match result {
        Ok(value) => ok(value),
        Err(e) => error_screen(&e, lang),
    }
}

async fn main_menu(state: &AppState, user: UserKey, lang: Option<&str>) -> Screen {
    let logged_in = logged_in(state, user).await;
    Screen::new(format_main_menu(lang), main_menu_keyboard(logged_in, lang))
}

async fn logged_in(state: &AppState, user: UserKey) -> bool {
    state.service.is_authenticated(user).await.unwrap_or_else(|e| {
        warn!(user_id = %user, error = %e, "Session lookup failed");
        false
    })
}

async fn logout(state: &AppState, user: UserKey, lang: Option<&str>) -> Screen {
    render(state.service.logout(user).await, lang, |had_session| {
        let key = if had_session { "logout-done" } else { "logout-not-logged-in" };
        Screen::new(format_notice("👋", key, lang), main_menu_keyboard(false, lang))
    })
}

/// Screen for an inline button press; `None` when nothing should change.
pub async fn route_callback(
    state: &AppState,
    user: UserKey,
    action: CallbackAction,
    lang: Option<&str>,
) -> Option<Screen> {
    debug!(user_id = %user, action = ?action, "Routing callback");

    let screen = match action {
        CallbackAction::MainMenu => main_menu(state, user, lang).await,
        CallbackAction::Login => Screen::new(format_login_prompt(lang), back_to_main_keyboard(lang)),
        CallbackAction::Register => Screen::new(
            format_section("📝", "register-title", "register-info", lang),
            back_to_main_keyboard(lang),
        ),
        CallbackAction::Logout => logout(state, user, lang).await,
        CallbackAction::DoctorsMenu => Screen::new(
            format_section("👨‍⚕️", "doctors-menu-title", "doctors-menu-choose", lang),
            specializations_keyboard(lang),
        ),
        CallbackAction::Doctors(specialization) => {
            render(state.service.find_doctors(user, specialization).await, lang, |doctors| {
                let text = if doctors.is_empty() {
                    format_no_doctors(specialization, lang)
                } else {
                    format_doctor_list(&doctors, specialization, lang)
                };
                Screen::new(text, doctors_result_keyboard(lang))
            })
        }
        CallbackAction::AppointmentsMenu => {
            if logged_in(state, user).await {
                Screen::new(
                    format_section("📋", "appointments-menu-title", "appointments-menu-choose", lang),
                    appointments_menu_keyboard(lang),
                )
            } else {
                error_screen(&ClinicError::Unauthenticated, lang)
            }
        }
        CallbackAction::ViewAppointments => render(state.service.appointments(user).await, lang, |appointments| {
            Screen::new(format_appointments(&appointments, lang), appointments_menu_keyboard(lang))
        }),
        CallbackAction::CancelAppointmentsMenu => {
            render(state.service.appointments(user).await, lang, |appointments| {
                if appointments.is_empty() {
                    Screen::new(format_appointments(&appointments, lang), appointments_menu_keyboard(lang))
                } else {
                    Screen::new(
                        format_notice("❌", "appointments-cancel-title", lang),
                        appointments_for_cancellation_keyboard(&appointments, lang),
                    )
                }
            })
        }
        CallbackAction::CancelAppointment(appointment_id) => render(
            state.service.cancel_appointment(user, &appointment_id).await,
            lang,
            |()| Screen::new(format_notice("✅", "appointment-cancelled", lang), appointments_menu_keyboard(lang)),
        ),
        CallbackAction::Statistics => render(state.service.statistics(user).await, lang, |stats| {
            Screen::new(format_statistics(&stats, lang), back_to_main_keyboard(lang))
        }),
        CallbackAction::Booking(event) => render(state.booking.handle(user, event).await, lang, |reply| {
            render_booking_reply(&reply, lang)
        }),
        CallbackAction::Noop => return None,
    };
    Some(screen)
}

/// Reply to a text message: bot commands, `email:password` logins, or a hint.
pub async fn route_text(
    state: &AppState,
    user: UserKey,
    text: &str,
    first_name: &str,
    lang: Option<&str>,
) -> TextReply {
    let text = text.trim();

    if let Some(command) = text.strip_prefix('/') {
        let command = command.split_whitespace().next().unwrap_or_default();
        // "/start@clinic_bot" in group chats
        let command = command.split('@').next().unwrap_or_default();
        debug!(user_id = %user, command = command, "Routing command");

        let screen = match command {
            "start" => {
                let logged_in = logged_in(state, user).await;
                Screen::new(format_welcome(first_name, lang), main_menu_keyboard(logged_in, lang))
            }
            "menu" => main_menu(state, user, lang).await,
            "logout" => logout(state, user, lang).await,
            _ => unknown_message(state, user, lang).await,
        };
        return TextReply::keep(screen);
    }

    if text.contains(':') {
        let result = match parse_credentials(text) {
            Ok(credentials) => state.service.login(user, credentials).await,
            Err(e) => Err(e),
        };
        let screen = match result {
            Ok(()) => Screen::new(
                format_section("✅", "login-success-title", "login-success", lang),
                main_menu_keyboard(true, lang),
            ),
            Err(e) => Screen::new(format_error(&e, lang), back_to_main_keyboard(lang)),
        };
        return TextReply {
            screen,
            delete_source: true,
        };
    }

    TextReply::keep(unknown_message(state, user, lang).await)
}

async fn unknown_message(state: &AppState, user: UserKey, lang: Option<&str>) -> Screen {
    let logged_in = logged_in(state, user).await;
    Screen::new(format_notice("❓", "unknown-message", lang), main_menu_keyboard(logged_in, lang))
}
