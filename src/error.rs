//! Error types for soundclip.

use std::path::PathBuf;

/// Errors raised while coercing the upload form fields.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// A required form field was absent from the request.
    #[error("missing field '{name}'")]
    MissingField {
        /// Name of the missing field.
        name: &'static str,
    },

    /// A numeric form field could not be parsed as an integer.
    #[error("field '{name}' is not a valid integer: {source}")]
    InvalidInteger {
        /// Name of the offending field.
        name: &'static str,
        /// Underlying parse error.
        source: std::num::ParseIntError,
    },
}

/// Errors raised while decoding or encoding audio.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// The input file could not be opened or probed as audio.
    #[error("failed to open audio file '{path}': {source}")]
    Open {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The container holds no decodable audio track.
    #[error("no audio track found in '{path}'")]
    NoAudioTrack {
        /// Path to the audio file.
        path: PathBuf,
    },

    /// Decoding failed partway through the file.
    #[error("failed to decode audio from '{path}': {source}")]
    Decode {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The requested output format has no encoder.
    #[error("unsupported output format '{format}'")]
    UnsupportedFormat {
        /// The requested format string.
        format: String,
    },

    /// The output directory could not be created.
    #[error("failed to create output directory '{path}': {source}")]
    CreateDir {
        /// Path to the directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Writing the output WAV file failed.
    #[error("failed to write WAV file '{path}': {source}")]
    WavWrite {
        /// Path to the output file.
        path: PathBuf,
        /// Underlying encoder error.
        source: hound::Error,
    },
}
