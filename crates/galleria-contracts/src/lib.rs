pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod models;
pub mod prompts;
