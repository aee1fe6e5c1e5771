//! Server-hosted bot seat.

pub mod agent;
pub mod strategy;
