use gloo_net::http::Request;
use leptos::logging::{error, log, warn};
use thiserror::Error;

use crate::reorder_core::OrderSubmission;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to serialize order: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Network(#[from] gloo_net::Error),
    #[error("server answered with status {code}")]
    Status { code: u16 },
    #[error("response is not valid JSON: {0}")]
    Decode(serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub submission: OrderSubmission,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    Stale,
}

/// Keeps at most one order request on the wire. A submission made while one
/// is in flight waits; a newer one replaces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionQueue {
    next_seq: u64,
    in_flight: Option<u64>,
    pending: Option<Ticket>,
}

impl Default for SubmissionQueue {
    fn default() -> Self {
        Self {
            next_seq: 1,
            in_flight: None,
            pending: None,
        }
    }
}

impl SubmissionQueue {
    /// Returns the ticket to send now, or `None` if it was parked.
    pub fn enqueue(&mut self, submission: OrderSubmission) -> Option<Ticket> {
        let ticket = Ticket {
            seq: self.next_seq,
            submission,
        };
        self.next_seq += 1;
        if self.in_flight.is_some() {
            self.pending = Some(ticket);
            return None;
        }
        self.in_flight = Some(ticket.seq);
        Some(ticket)
    }

    /// Marks `seq` as answered and hands out the parked ticket, if any.
    pub fn complete(&mut self, seq: u64) -> (Completion, Option<Ticket>) {
        if self.in_flight != Some(seq) {
            return (Completion::Stale, None);
        }
        self.in_flight = None;
        let next = self.pending.take();
        if let Some(ticket) = &next {
            self.in_flight = Some(ticket.seq);
        }
        (Completion::Accepted, next)
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }
}

pub fn encode_body(submission: &OrderSubmission) -> Result<String, SubmitError> {
    Ok(serde_json::to_string(submission)?)
}

pub async fn post_order(
    endpoint: &str,
    submission: &OrderSubmission,
) -> Result<serde_json::Value, SubmitError> {
    let body = encode_body(submission)?;
    let response = Request::post(endpoint)
        .header("Content-Type", "application/json")
        .body(body)?
        .send()
        .await?;
    if !response.ok() {
        return Err(SubmitError::Status {
            code: response.status(),
        });
    }
    decode_response(&response.text().await?)
}

pub fn decode_response(body: &str) -> Result<serde_json::Value, SubmitError> {
    serde_json::from_str(body).map_err(SubmitError::Decode)
}

/// Sends `ticket` and then whatever got parked behind it, one at a time.
/// `complete` must forward to [`SubmissionQueue::complete`].
pub async fn drain(
    endpoint: String,
    ticket: Ticket,
    mut complete: impl FnMut(u64) -> (Completion, Option<Ticket>),
) {
    let mut current = Some(ticket);
    while let Some(ticket) = current.take() {
        log!(
            "submitting order #{} ({} blocks) to {}",
            ticket.seq,
            ticket.submission.order.len(),
            endpoint
        );
        match post_order(&endpoint, &ticket.submission).await {
            Ok(data) => log!("order #{} saved: {}", ticket.seq, data),
            Err(err) => error!("order #{} failed: {}", ticket.seq, err),
        }
        let (completion, next) = complete(ticket.seq);
        if completion == Completion::Stale {
            warn!("ignoring stale completion of order #{}", ticket.seq);
        }
        current = next;
    }
}
