//! Chat with your files.
//!
//! Uploaded documents are turned into text, embedded, and stored in a vector
//! index; their text is then handed to a hosted model as context for each
//! chat turn.

pub mod config;
pub mod conversation;
pub mod files;
pub mod gateway;
pub mod notice;
pub mod providers;
pub mod session;
pub mod vector;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use notice::{Level, Notice};
