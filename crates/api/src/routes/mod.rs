//! HTTP and websocket route handlers.

pub mod health;
pub mod signals;
pub mod ws;
