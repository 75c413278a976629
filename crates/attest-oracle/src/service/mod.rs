//! Line-oriented request/response exchange.
//!
//! One self-contained JSON request record per input line, one JSON response
//! record per output line, flushed after every record. End-of-input is the
//! shutdown signal: the loop drains, flushes and returns cleanly.

use crate::config::Config;
use crate::diff::DiffEntry;
use crate::error::OracleError;
use crate::key::{derive_key, RequestParts};
use crate::matcher::{self, Distance, MatchOutcome, Nearest};
use crate::store::CaseSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// One incoming request record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<Value>,
    /// Side-channel fields, including any configured extra key fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateRecord {
    case_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    distance: Distance,
    diffs: Vec<DiffEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MissRecord {
    nearest: Nearest,
    candidates: Vec<CandidateRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorRecord {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// Answer one request line with one response record.
///
/// On an exact match the full augmented case payload is returned with
/// `responseStatus` always present; a miss report carries the ranked
/// nearest candidates and never a `responseStatus`.
pub fn exchange(set: &CaseSet, config: &Config, line: &str) -> Value {
    let record: RequestRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            let err = OracleError::RequestFormat(e.to_string());
            warn!(%err, "rejecting request record");
            return error_record(&err);
        }
    };

    // Missing extra key fields degrade to null components, so derivation
    // never rejects a request.
    let key = derive_key(
        RequestParts {
            method: &record.method,
            url: &record.url,
            body: record.body.as_ref(),
            fields: &record.fields,
        },
        &config.key_spec(),
    );

    match matcher::match_request(set, &key) {
        MatchOutcome::Exact(case) => {
            let mut payload = case.payload.clone();
            let status = case.response_status.unwrap_or(config.default_response_status);
            payload.insert("responseStatus".to_string(), Value::from(status));
            Value::Object(payload)
        }
        MatchOutcome::Candidates {
            nearest,
            candidates,
        } => {
            let miss = MissRecord {
                nearest,
                candidates: candidates
                    .into_iter()
                    .map(|candidate| CandidateRecord {
                        case_id: candidate.case.fingerprint.clone(),
                        description: candidate.case.description.clone(),
                        distance: candidate.distance,
                        diffs: candidate.diffs,
                    })
                    .collect(),
            };
            serde_json::to_value(miss).unwrap_or(Value::Null)
        }
    }
}

fn error_record(err: &OracleError) -> Value {
    let record = ErrorRecord {
        error: ErrorBody {
            kind: "requestFormat",
            message: err.to_string(),
        },
    };
    serde_json::to_value(record).unwrap_or(Value::Null)
}

/// Serve request records from `input` until end-of-input.
pub async fn run<R, W>(set: &CaseSet, config: &Config, input: R, output: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut output = output;
    let mut served = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = exchange(set, config, &line);
        let mut rendered = reply.to_string();
        rendered.push('\n');
        output.write_all(rendered.as_bytes()).await?;
        output.flush().await?;
        served += 1;
        debug!(served, "answered request record");
    }

    output.flush().await?;
    info!(served, "end of input, shutting down");
    Ok(())
}
