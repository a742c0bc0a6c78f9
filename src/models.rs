//! Request-scoped data extracted from the upload form.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::FormError;

/// File part received from the upload form.
#[derive(Debug)]
pub struct UploadedFile {
    /// Original filename as sent by the client, used verbatim as a path
    /// segment under the upload directory.
    pub filename: String,
    /// Raw file contents.
    pub data: Bytes,
}

/// Parameters describing which audio range to extract and how to name the
/// output. Lives for a single request.
#[derive(Debug)]
pub struct ClipRequest {
    pub start_min: i64,
    pub start_sec: i64,
    pub end_min: i64,
    pub end_sec: i64,
    /// Output format, trusted verbatim (e.g. "wav").
    pub output_format: String,
    /// Output base name, used verbatim as a path segment.
    pub output_name: String,
}

impl ClipRequest {
    /// Build a clip request from the collected text fields of the form.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] when a field is missing or a numeric field
    /// cannot be parsed as an integer. No range validation is performed.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, FormError> {
        Ok(Self {
            start_min: int_field(fields, "start_min")?,
            start_sec: int_field(fields, "start_sec")?,
            end_min: int_field(fields, "end_min")?,
            end_sec: int_field(fields, "end_sec")?,
            output_format: text_field(fields, "output_format")?,
            output_name: text_field(fields, "output_name")?,
        })
    }

    /// Start offset in milliseconds. Saturates instead of overflowing.
    pub fn start_ms(&self) -> i64 {
        to_millis(self.start_min, self.start_sec)
    }

    /// End offset in milliseconds. Saturates instead of overflowing.
    pub fn end_ms(&self) -> i64 {
        to_millis(self.end_min, self.end_sec)
    }
}

fn to_millis(minutes: i64, seconds: i64) -> i64 {
    minutes
        .saturating_mul(60)
        .saturating_add(seconds)
        .saturating_mul(1000)
}

fn int_field(fields: &HashMap<String, String>, name: &'static str) -> Result<i64, FormError> {
    let raw = fields.get(name).ok_or(FormError::MissingField { name })?;
    raw.trim()
        .parse()
        .map_err(|source| FormError::InvalidInteger { name, source })
}

fn text_field(fields: &HashMap<String, String>, name: &'static str) -> Result<String, FormError> {
    fields
        .get(name)
        .cloned()
        .ok_or(FormError::MissingField { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_form() -> HashMap<String, String> {
        form(&[
            ("start_min", "1"),
            ("start_sec", "30"),
            ("end_min", "2"),
            ("end_sec", "5"),
            ("output_format", "wav"),
            ("output_name", "clip"),
        ])
    }

    #[test]
    fn converts_minute_second_pairs_to_millis() {
        let request = ClipRequest::from_form(&valid_form()).unwrap();
        assert_eq!(request.start_ms(), 90_000);
        assert_eq!(request.end_ms(), 125_000);
    }

    #[test]
    fn negative_values_pass_through() {
        let mut fields = valid_form();
        fields.insert("start_min".into(), "-1".into());
        fields.insert("start_sec".into(), "0".into());
        let request = ClipRequest::from_form(&fields).unwrap();
        assert_eq!(request.start_ms(), -60_000);

        fields.insert("start_sec".into(), "30".into());
        let request = ClipRequest::from_form(&fields).unwrap();
        assert_eq!(request.start_ms(), -30_000);
    }

    #[test]
    fn huge_values_saturate_instead_of_panicking() {
        let mut fields = valid_form();
        fields.insert("end_min".into(), i64::MAX.to_string());
        let request = ClipRequest::from_form(&fields).unwrap();
        assert_eq!(request.end_ms(), i64::MAX);
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let mut fields = valid_form();
        fields.remove("end_sec");
        let err = ClipRequest::from_form(&fields).unwrap_err();
        assert!(err.to_string().contains("end_sec"));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let mut fields = valid_form();
        fields.insert("start_min".into(), "abc".into());
        let err = ClipRequest::from_form(&fields).unwrap_err();
        assert!(err.to_string().contains("start_min"));
    }
}
