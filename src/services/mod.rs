//! Clients for remote services.

pub mod stt;
