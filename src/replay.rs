//! Line-oriented front end for the limiter.
//!
//! Reads newline-delimited JSON requests of the form
//! `{"address": "10.0.0.1", "params": {"text": "..."}}`, runs each through an
//! [`AdmissionControl`] and writes one JSON decision per line.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ratelimit::{AdmissionControl, Decision, LimitKind, Params};

/// One incoming request.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayRequest {
    pub address: String,
    #[serde(default)]
    pub params: Params,
}

/// The decision for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResponse {
    pub address: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReplayResponse {
    fn new(address: String, decision: &Decision) -> Self {
        let denial = decision.denial();
        Self {
            address,
            allowed: decision.is_allowed(),
            limit: denial.map(|e| e.kind()),
            message: denial.map(|e| e.message().to_string()),
        }
    }
}

/// Counts of processed lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub allowed: u64,
    pub denied: u64,
    /// Lines that were not a valid request and were skipped
    pub malformed: u64,
}

/// Run every request read from `reader` through `control`, writing decisions
/// to `writer`.
///
/// Malformed lines are logged and skipped; blank lines are ignored. Returns
/// when the reader is exhausted.
pub async fn replay<A, R, W>(control: &A, reader: R, writer: W) -> Result<ReplayStats>
where
    A: AdmissionControl + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    replay_until(control, reader, writer, std::future::pending()).await
}

/// Like [`replay`], but also returns once `shutdown` completes, even while a
/// read is still pending. Decisions already written are flushed.
pub async fn replay_until<A, R, W, S>(
    control: &A,
    reader: R,
    mut writer: W,
    shutdown: S,
) -> Result<ReplayStats>
where
    A: AdmissionControl + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = reader.lines();
    let mut stats = ReplayStats::default();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping replay");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        if let Some(response) = process_line(control, &line, &mut stats) {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
        }
    }

    writer.flush().await?;
    Ok(stats)
}

/// Decide one input line. Returns `None` for blank or malformed lines.
fn process_line<A>(control: &A, line: &str, stats: &mut ReplayStats) -> Option<ReplayResponse>
where
    A: AdmissionControl + ?Sized,
{
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let request: ReplayRequest = match serde_json::from_str(trimmed) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Skipping malformed request line");
            stats.malformed += 1;
            return None;
        }
    };

    if request.address.is_empty() {
        warn!("Skipping request with empty address");
        stats.malformed += 1;
        return None;
    }

    let decision = control.check_access(&request.address, &request.params);
    if decision.is_allowed() {
        stats.allowed += 1;
    } else {
        stats.denied += 1;
    }

    let response = ReplayResponse::new(request.address, &decision);
    debug!(address = %response.address, allowed = response.allowed, "Processed request");
    Some(response)
}
