//! Status API routes

pub mod control;
pub mod status;
