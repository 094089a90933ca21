//! Intake pipeline for website form submissions: contact messages, job applications
//! with a resume upload, and course enquiries.

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
