//! Value Object Module

pub mod email;
pub mod invite_status;
pub mod invite_token;
pub mod member_role;
pub mod return_path;
pub mod user_role;
