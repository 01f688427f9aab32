//! The fetch → validate → diff → notify → sleep loop.
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::PollError;
use crate::homework;
use crate::model::{HomeworkStatus, LoopState};
use crate::practicum::StatusApi;
use crate::telegram::Notifier;

/// What one successful iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unchanged(HomeworkStatus),
    Changed {
        status: HomeworkStatus,
        delivered: bool,
    },
}

/// What one tick did, including contained failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    Polled(Outcome),
    Failed { reported: bool },
}

pub struct Poller<'a> {
    api: &'a dyn StatusApi,
    notifier: &'a dyn Notifier,
    retry_interval: Duration,
    state: LoopState,
}

impl<'a> Poller<'a> {
    pub fn new(
        api: &'a dyn StatusApi,
        notifier: &'a dyn Notifier,
        retry_interval: Duration,
        state: LoopState,
    ) -> Self {
        Self {
            api,
            notifier,
            retry_interval,
            state,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// One fetch/validate/diff/notify pass. Failures are returned, not
    /// reported.
    #[instrument(skip_all, fields(from_date = self.state.next_fetch_from))]
    pub async fn poll_once(&mut self) -> Result<Outcome, PollError> {
        let response = self
            .api
            .homework_statuses(self.state.next_fetch_from)
            .await?;
        let homework = homework::validate(response)?;
        let status = HomeworkStatus::from_homework(&homework)?;

        if !self.state.observe_status(status) {
            debug!(status = status.as_str(), "homework status unchanged");
            // Only an explicit lower bound moves the window.
            self.state
                .advance_window(homework.get("current_timestamp").and_then(Value::as_i64));
            return Ok(Outcome::Unchanged(status));
        }

        info!(status = status.as_str(), "homework status changed");
        let text = homework::render(&homework)?;
        let delivered = self.deliver(&text).await;
        Ok(Outcome::Changed { status, delivered })
    }

    /// Run one iteration and contain whatever it fails with.
    pub async fn tick(&mut self) -> TickReport {
        match self.poll_once().await {
            Ok(outcome) => TickReport::Polled(outcome),
            Err(err) => {
                let reported = self.report_failure(&err).await;
                TickReport::Failed { reported }
            }
        }
    }

    /// Poll forever, sleeping the retry interval after every tick.
    pub async fn run(&mut self) {
        info!(
            interval_secs = self.retry_interval.as_secs(),
            from_date = self.state.next_fetch_from,
            "polling started"
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.retry_interval).await;
        }
    }

    async fn report_failure(&mut self, err: &PollError) -> bool {
        match err {
            PollError::Transport(_) => error!(kind = err.kind(), %err, "status API unavailable"),
            PollError::Schema(_) | PollError::UnknownStatus(_) => {
                error!(kind = err.kind(), %err, "unusable status API response")
            }
        }

        let text = err.to_string();
        if !self.state.observe_error(&text) {
            debug!("failure already reported; not notifying again");
            return false;
        }
        self.deliver(&format!("Bot failure: {text}")).await
    }

    /// Send and swallow any [`crate::error::MessageError`]; a messaging
    /// outage must not stop the loop.
    async fn deliver(&self, text: &str) -> bool {
        match self.notifier.send(text).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to deliver message");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MessageError, SchemaError, TransportError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct Fixed(Value);

    #[async_trait]
    impl StatusApi for Fixed {
        async fn homework_statuses(&self, _from_date: i64) -> Result<Value, TransportError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Sink(Mutex<Vec<String>>);

    #[async_trait]
    impl Notifier for Sink {
        async fn send(&self, text: &str) -> Result<(), MessageError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn unchanged_status_keeps_window_without_explicit_bound() {
        let api = Fixed(json!({
            "homeworks": [{"homework_name": "a", "status": "reviewing"}],
            "current_date": 1_700_000_000,
        }));
        let sink = Sink::default();
        let mut poller = Poller::new(
            &api,
            &sink,
            Duration::from_secs(1),
            LoopState::starting_at(5_000, 1_000),
        );

        assert!(matches!(
            poller.poll_once().await.unwrap(),
            Outcome::Changed { delivered: true, .. }
        ));
        assert_eq!(
            poller.poll_once().await.unwrap(),
            Outcome::Unchanged(HomeworkStatus::Reviewing)
        );
        assert_eq!(poller.state().next_fetch_from, 4_000);
    }

    #[tokio::test]
    async fn unchanged_status_honours_explicit_bound() {
        let api = Fixed(json!({
            "homeworks": [{"homework_name": "a", "status": "reviewing", "current_timestamp": 4_500}],
        }));
        let sink = Sink::default();
        let mut poller = Poller::new(
            &api,
            &sink,
            Duration::from_secs(1),
            LoopState::starting_at(5_000, 1_000),
        );
        poller.poll_once().await.unwrap();
        assert_eq!(poller.state().next_fetch_from, 4_000);
        poller.poll_once().await.unwrap();
        assert_eq!(poller.state().next_fetch_from, 4_500);
    }

    #[tokio::test]
    async fn unchanged_status_does_not_need_a_name() {
        let api = Fixed(json!({"homeworks": [{"status": "reviewing"}]}));
        let sink = Sink::default();
        let state = LoopState {
            last_seen_status: Some(HomeworkStatus::Reviewing),
            ..LoopState::default()
        };
        let mut poller = Poller::new(&api, &sink, Duration::from_secs(1), state);
        assert_eq!(
            poller.tick().await,
            TickReport::Polled(Outcome::Unchanged(HomeworkStatus::Reviewing))
        );
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn changed_status_without_name_is_a_schema_failure() {
        let api = Fixed(json!({"homeworks": [{"status": "approved"}]}));
        let sink = Sink::default();
        let mut poller = Poller::new(&api, &sink, Duration::from_secs(1), LoopState::default());
        let err = poller.poll_once().await.unwrap_err();
        assert!(matches!(
            err,
            PollError::Schema(SchemaError::MissingHomeworkName)
        ));
        assert_eq!(
            poller.state().last_seen_status,
            Some(HomeworkStatus::Approved)
        );
    }

    #[tokio::test]
    async fn failure_notification_is_prefixed() {
        let api = Fixed(json!({"homeworks": []}));
        let sink = Sink::default();
        let mut poller = Poller::new(&api, &sink, Duration::from_secs(1), LoopState::default());
        assert_eq!(poller.tick().await, TickReport::Failed { reported: true });
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            ["Bot failure: unexpected API response: empty homeworks list"]
        );
    }
}
