//! Match lifecycle reporting to the external webhook.

use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::WebhookConfig,
    dto::webhook::{MATCH_ABORTED, MATCH_ENDED, MatchAbortData, MatchEndData, NO_WINNER, WebhookPayload},
    state::{context::MatchContext, room::Seat},
};

/// How a match left the Playing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A seat completed a line.
    Won(Seat),
    /// The board filled without a line.
    Draw,
    /// A seat left mid-match; the other one is credited with the win.
    Forfeit { remaining: Seat },
    /// A seat asked to close the match before it was decided.
    Closed,
}

/// One webhook call.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchReport {
    Ended(WebhookPayload<MatchEndData>),
    Aborted(WebhookPayload<MatchAbortData>),
}

impl MatchReport {
    /// Endpoint path segment, relative to the webhook base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            MatchReport::Ended(_) => MATCH_ENDED,
            MatchReport::Aborted(_) => MATCH_ABORTED,
        }
    }
}

/// Reports to send for `outcome`, in order.
pub fn reports_for(context: &MatchContext, outcome: MatchOutcome, at: SystemTime) -> Vec<MatchReport> {
    let ended = |winner: &str, scores: [u8; 2]| {
        MatchReport::Ended(WebhookPayload::match_ended(&context.token, winner, scores, at))
    };

    match outcome {
        MatchOutcome::Won(seat) => {
            let mut scores = [0, 0];
            scores[seat.index()] = 1;
            vec![ended(context.name_of(seat), scores)]
        }
        MatchOutcome::Draw => vec![ended(NO_WINNER, [0, 0])],
        // No line was completed, so the remaining seat is named without a point.
        MatchOutcome::Forfeit { remaining } => vec![
            MatchReport::Aborted(WebhookPayload::match_aborted(&context.token, at)),
            ended(context.name_of(remaining), [0, 0]),
        ],
        MatchOutcome::Closed => vec![MatchReport::Aborted(WebhookPayload::match_aborted(
            &context.token,
            at,
        ))],
    }
}

/// Failures while delivering a report.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Building the HTTP client failed.
    #[error("failed to build webhook client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or timed out.
    #[error("failed to send webhook request to `{url}`")]
    RequestSend {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The webhook answered with a non-success status.
    #[error("unexpected webhook response status {status} for `{url}`")]
    RequestStatus { url: String, status: StatusCode },
}

/// Destination of match lifecycle reports.
pub trait MatchNotifier: Send + Sync {
    /// Deliver one report.
    fn notify(&self, report: MatchReport) -> BoxFuture<'static, Result<(), NotifyError>>;
}

/// Send `reports` in order on a background task, logging failures.
pub fn dispatch(notifier: Arc<dyn MatchNotifier>, match_id: &str, reports: Vec<MatchReport>) {
    let match_id = match_id.to_string();
    tokio::spawn(async move {
        for report in reports {
            let endpoint = report.endpoint();
            match notifier.notify(report).await {
                Ok(()) => info!(match_id = %match_id, endpoint, "match report delivered"),
                Err(err) => warn!(match_id = %match_id, endpoint, error = %err, "match report failed"),
            }
        }
    });
}

/// Posts reports as JSON to `{base_url}/match_ended` and `{base_url}/match_aborted`.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    base_url: Arc<str>,
}

impl WebhookNotifier {
    /// Build a notifier from the webhook section, or `None` when no URL is configured.
    pub fn from_config(config: &WebhookConfig) -> Option<Result<Self, NotifyError>> {
        let base_url = config.base_url.as_deref()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| NotifyError::ClientBuilder { source });
        Some(client.map(|client| Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize>(&self, endpoint: &str, payload: &T) -> Result<(), NotifyError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|source| NotifyError::RequestSend {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::RequestStatus { url, status })
        }
    }
}

impl MatchNotifier for WebhookNotifier {
    fn notify(&self, report: MatchReport) -> BoxFuture<'static, Result<(), NotifyError>> {
        let notifier = self.clone();
        Box::pin(async move {
            let endpoint = report.endpoint();
            match &report {
                MatchReport::Ended(payload) => notifier.post(endpoint, payload).await,
                MatchReport::Aborted(payload) => notifier.post(endpoint, payload).await,
            }
        })
    }
}

/// Drops every report; used when no webhook is configured.
pub struct DisabledNotifier;

impl MatchNotifier for DisabledNotifier {
    fn notify(&self, report: MatchReport) -> BoxFuture<'static, Result<(), NotifyError>> {
        debug!(endpoint = report.endpoint(), "match reporting disabled; dropping report");
        Box::pin(async { Ok(()) })
    }
}
