//! Decoding of client-supplied todo fields.
//!
//! Reminders arrive as `DD/MM/YYYY HH:MM` strings and images as data-URLs
//! (`<metadata>,<base64 payload>`). Both are turned into their stored form here.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Format accepted for reminders on input.
pub const REMINDER_INPUT_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Format reminders are rendered with on output.
pub const REMINDER_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a reminder given as `DD/MM/YYYY HH:MM`. The value is taken as UTC.
pub fn parse_reminder(input: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(input.trim(), REMINDER_INPUT_FORMAT).map(|naive| naive.and_utc())
}

/// Parses a reminder that was stored as text rather than as a datetime.
pub fn parse_stored_reminder(stored: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(stored, REMINDER_OUTPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(stored, REMINDER_INPUT_FORMAT))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Formats a reminder for output.
pub fn format_reminder(reminder: &DateTime<Utc>) -> String {
    reminder.format(REMINDER_OUTPUT_FORMAT).to_string()
}

/// Turns a data-URL into the base64 text that gets stored.
///
/// Returns `Ok(None)` when the input has no comma separator or its payload
/// decodes to no bytes. The payload is the segment after the first comma.
pub fn decode_data_url(input: &str) -> Result<Option<String>, base64::DecodeError> {
    let Some(payload) = input.split(',').nth(1) else {
        return Ok(None);
    };

    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(encode_image(&bytes)))
}

/// Encodes raw image bytes as base64 text.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
