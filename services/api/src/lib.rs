//! Chatrelay API Library Crate
//!
//! This library contains all the logic for the relay web service: webhook
//! verification and ingestion, the outbound WhatsApp client, configuration,
//! and routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod whatsapp;
