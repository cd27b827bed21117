//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `callback_data`: Typed inline-button payloads
//! - `router`: Maps actions and text to screens, independent of Telegram I/O
//! - `message_handler`: Handles commands and login messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_data;
pub mod callback_handler;
pub mod message_handler;
pub mod router;
pub mod ui_builder;

use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::booking::{BookingDraft, BookingFlow};
use crate::clock::Clock;
use crate::gateway::ClinicGateway;
use crate::service::ClinicService;
use crate::session::{Session, SessionStore};
use crate::store::{InMemoryStore, UserStore};

pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// Everything the handlers need, shared across updates.
pub struct AppState {
    pub booking: BookingFlow,
    pub service: ClinicService,
}

impl AppState {
    pub fn new(booking: BookingFlow, service: ClinicService) -> Self {
        Self { booking, service }
    }

    /// Wire the flow and the service over process-local stores.
    pub fn in_memory(
        gateway: Arc<dyn ClinicGateway>,
        clock: Arc<dyn Clock>,
        session_ttl: Option<Duration>,
        draft_ttl: Option<Duration>,
    ) -> Self {
        let session_store: Arc<dyn UserStore<Session>> = Arc::new(InMemoryStore::<Session>::new());
        let drafts: Arc<dyn UserStore<BookingDraft>> = Arc::new(InMemoryStore::<BookingDraft>::new());
        let sessions = Arc::new(SessionStore::new(session_store, clock.clone(), session_ttl));

        let booking = BookingFlow::new(gateway.clone(), sessions.clone(), drafts.clone(), clock, draft_ttl);
        let service = ClinicService::new(gateway, sessions, drafts);
        Self::new(booking, service)
    }
}

/// Update routing: text messages and inline button presses.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}
