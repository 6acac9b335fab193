//! Recruiter Assist: a scripted WhatsApp pre-interview assistant.

pub mod channels;
pub mod classifier;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod outreach;
pub mod server;
pub mod session;
