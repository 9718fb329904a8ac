//! Entity Module

pub mod group;
pub mod invite;
pub mod user;
