//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources: the session registry, the outbound delivery client,
//! and the loaded configuration.

use crate::{config::Config, whatsapp::WhatsAppClient};
use chatrelay_core::session::SessionRegistry;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub whatsapp: Arc<WhatsAppClient>,
    pub config: Arc<Config>,
}
