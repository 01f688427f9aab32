use chrono::DateTime;
use serde_json::{Map, Value};

use crate::error::{PollError, SchemaError};

/// Review status as reported by the homework API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "approved",
            HomeworkStatus::Reviewing => "reviewing",
            HomeworkStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "approved" => Some(HomeworkStatus::Approved),
            "reviewing" => Some(HomeworkStatus::Reviewing),
            "rejected" => Some(HomeworkStatus::Rejected),
            _ => None,
        }
    }

    /// Read the `status` key of a raw homework. Absent, non-string and
    /// undocumented values are all errors; there is no default.
    pub fn from_homework(raw: &Map<String, Value>) -> Result<Self, PollError> {
        match raw.get("status") {
            Some(Value::String(s)) => {
                Self::parse(s).ok_or_else(|| PollError::UnknownStatus(Some(s.clone())))
            }
            Some(other) => Err(PollError::UnknownStatus(Some(other.to_string()))),
            None => Err(PollError::UnknownStatus(None)),
        }
    }

    /// Human-readable verdict sent to the chat.
    pub fn verdict(&self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            HomeworkStatus::Reviewing => "Работа взята на проверку ревьюером.",
            HomeworkStatus::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

/// The most recent submission, snapshotted from one API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub name: String,
    pub status: HomeworkStatus,
    /// Unix time of the last review update, from `date_updated` when present.
    pub timestamp: Option<i64>,
}

impl SubmissionRecord {
    /// Extract a typed record from a raw homework mapping.
    ///
    /// The status is checked first so an undocumented status is always
    /// reported as such, even when other fields are also malformed.
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self, PollError> {
        let status = HomeworkStatus::from_homework(raw)?;
        let name = raw
            .get("homework_name")
            .and_then(Value::as_str)
            .ok_or(SchemaError::MissingHomeworkName)?
            .to_string();
        let timestamp = raw
            .get("date_updated")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp());
        Ok(Self {
            name,
            status,
            timestamp,
        })
    }

    pub fn message(&self) -> String {
        format!(
            "Changed review status of \"{}\". {}",
            self.name,
            self.status.verdict()
        )
    }
}

/// Mutable state of the polling loop. Lives for the process lifetime only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    pub last_seen_status: Option<HomeworkStatus>,
    pub last_seen_error: Option<String>,
    pub next_fetch_from: i64,
}

impl LoopState {
    /// Fresh state whose first fetch looks `lookback_secs` into the past.
    /// The bound never drops below 1, since 0 means "now" to the fetcher.
    pub fn starting_at(now: i64, lookback_secs: u64) -> Self {
        let lookback = i64::try_from(lookback_secs).unwrap_or(i64::MAX);
        Self {
            next_fetch_from: now.saturating_sub(lookback).max(1),
            ..Self::default()
        }
    }

    /// Move the fetch window forward when a new lower bound is known; keep the
    /// previous one otherwise.
    pub fn advance_window(&mut self, next: Option<i64>) {
        if let Some(ts) = next.filter(|ts| *ts > 0) {
            self.next_fetch_from = ts;
        }
    }

    /// Record an observed status. Returns `true` when it differs from the
    /// last one seen.
    pub fn observe_status(&mut self, status: HomeworkStatus) -> bool {
        if self.last_seen_status == Some(status) {
            return false;
        }
        self.last_seen_status = Some(status);
        true
    }

    /// Record a failure text. Returns `true` when it has not just been
    /// reported.
    pub fn observe_error(&mut self, text: &str) -> bool {
        if self.last_seen_error.as_deref() == Some(text) {
            return false;
        }
        self.last_seen_error = Some(text.to_string());
        true
    }
}
