use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::aggregate::YearSummary;
use crate::app::{PollResult, ProgressEvent, ProgressSink};
use crate::domain::EmissionsSnapshot;
use crate::error::EmissionsError;

pub const SUCCESS_MESSAGE: &str = "Emissions per country retrieved successfully!";
pub const RATE_LIMITED_MESSAGE: &str = "Too Many Requests, please try again in a moment.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope<T: Serialize> {
    pub data: T,
    pub message: &'static str,
    pub generated_at: String,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: SUCCESS_MESSAGE,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub message: &'static str,
    pub error: String,
}

impl From<&EmissionsError> for ErrorEnvelope {
    fn from(err: &EmissionsError) -> Self {
        let status = err.status_code();
        let message = if status == 429 {
            RATE_LIMITED_MESSAGE
        } else {
            INTERNAL_ERROR_MESSAGE
        };
        Self {
            status,
            message,
            error: err.to_string(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_snapshot(snapshot: &EmissionsSnapshot) -> io::Result<()> {
        Self::print_json(&SuccessEnvelope::new(snapshot))
    }

    pub fn print_poll(result: &PollResult) -> io::Result<()> {
        Self::print_json(&SuccessEnvelope::new(result))
    }

    pub fn print_summary(summary: &[YearSummary]) -> io::Result<()> {
        Self::print_json(&SuccessEnvelope::new(summary))
    }

    pub fn print_error(err: &EmissionsError) -> io::Result<()> {
        Self::print_json(&ErrorEnvelope::from(err))
    }

    // The envelope is best effort; the caller still surfaces `err` itself.
    pub fn report_error<W: Write>(writer: &mut W, err: &EmissionsError) {
        if let Err(write_err) = Self::write_json(writer, &ErrorEnvelope::from(err)) {
            tracing::warn!(%write_err, %err, "failed to write error envelope");
        }
    }

    pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        Self::write_json(&mut io::stdout(), value)
    }

    pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => tracing::info!("{}", event.message),
        }
    }
}
