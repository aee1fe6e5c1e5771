//! Library crate for tictactoe-back, exposing modules for binaries and tests.

pub mod bot;
pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
