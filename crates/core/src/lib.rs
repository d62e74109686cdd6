//! Chatrelay Core Library
//!
//! Domain logic for the WhatsApp-to-Gemini relay: the chat backend
//! abstraction and the per-user conversation session registry. The HTTP
//! surface lives in the `chatrelay-api` service crate and depends on this one.

pub mod backend;
pub mod session;
