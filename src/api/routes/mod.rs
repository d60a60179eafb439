//! API route modules.

pub mod capture;
pub mod session;
