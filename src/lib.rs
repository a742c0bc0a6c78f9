//! Web service that trims uploaded audio files to a requested time range.
//!
//! A single form post drives the whole flow: the uploaded file is saved to
//! `uploads/`, decoded, sliced to the requested millisecond range, and the
//! clip is written to `extracted/`.

pub mod audio_processor;
pub mod error;
pub mod models;
pub mod routes;
