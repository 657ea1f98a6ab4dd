//! Per-owner session ownership and history.

mod manager;

pub use manager::{SessionManager, StartReservation};
