//! # Clinic Telegram Bot
//!
//! A Telegram front end for a clinic's REST backend. Patients log in, browse
//! doctors by specialization, book a visit through a guided multi-step flow,
//! review and cancel appointments, and see statistics about their visits.
//!
//! ## Layout
//!
//! - [`booking`]: the per-user booking state machine
//! - [`service`]: the remaining menu operations (login, search, history)
//! - [`gateway`]: the clinic REST API client, behind a [`breaker`]
//! - [`session`] and [`store`]: per-user state
//! - [`bot`]: Telegram handlers, keyboards and message formatting

pub mod booking;
pub mod bot;
pub mod breaker;
pub mod clock;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod localization;
pub mod models;
pub mod service;
pub mod session;
pub mod statistics;
pub mod store;
