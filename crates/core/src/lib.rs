//! Core data types for the shoutout bot.

pub mod criteria;
pub mod stream;

pub use criteria::*;
pub use stream::*;
