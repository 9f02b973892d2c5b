pub mod comment_service;
pub mod error;
pub mod notification_service;
pub mod permissions;
pub mod ticket_service;
pub mod user_service;

#[cfg(test)]
mod testutil;
