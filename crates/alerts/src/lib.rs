//! Persistence and notification backends for the shoutout bot.
//!
//! This crate provides:
//! - SQLite-based storage for tracked channel records
//! - Discord webhook delivery for shoutout messages

pub mod db;
pub mod discord;

pub use db::{DbError, StreamDb};
pub use discord::DiscordNotifier;
