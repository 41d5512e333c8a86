//! Vendor onboarding: resumable supplier signup workflow.

pub mod api;
pub mod config;
pub mod error;
pub mod onboarding;
