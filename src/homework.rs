//! Response shape checks and message rendering for the homework API.
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PollError, SchemaError};
use crate::model::SubmissionRecord;

/// Check the response shape and return the first (most recent) homework.
///
/// The API lists homeworks newest first; no sorting is done here.
pub fn validate(response: Value) -> Result<Map<String, Value>, SchemaError> {
    let Value::Object(mut body) = response else {
        return Err(SchemaError::NotAMapping);
    };
    let homeworks = body
        .remove("homeworks")
        .ok_or(SchemaError::MissingHomeworks)?;
    let Value::Array(homeworks) = homeworks else {
        return Err(SchemaError::HomeworksNotAList);
    };
    match homeworks.into_iter().next() {
        None => Err(SchemaError::EmptyHomeworks),
        Some(Value::Object(homework)) => Ok(homework),
        Some(_) => Err(SchemaError::HomeworkNotAMapping),
    }
}

/// Render the chat message for a raw homework mapping.
pub fn render(homework: &Map<String, Value>) -> Result<String, PollError> {
    let record = SubmissionRecord::from_raw(homework)?;
    debug!(
        homework = %record.name,
        status = record.status.as_str(),
        updated_at = ?record.timestamp,
        "rendering status message"
    );
    Ok(record.message())
}
