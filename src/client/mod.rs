//! Client side of a room: seat admission and the mirrored session.

pub mod connector;
pub mod session;
