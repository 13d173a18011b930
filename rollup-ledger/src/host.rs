//! Rollup host interface
//!
//! The host hands out inputs through `/finish` and accepts outputs through
//! `/notice`, `/report` and `/voucher`. Every call is one request/response
//! exchange; text payloads travel as `0x`-prefixed hex of their UTF-8 bytes and
//! voucher payloads as the hex of a 32-byte big-endian amount.

use crate::{
    codec,
    config::HostConfig,
    types::{Address, Balance, InputEnvelope, InputMetadata, RequestKind, Status},
    Error, Result,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Answer to a `/finish` call
#[derive(Debug, Clone)]
pub enum NextRequest {
    /// No input yet; poll again after the backoff
    Idle,
    /// Input to process
    Ready(InputEnvelope),
    /// Host handed out a request this process cannot read
    Invalid(String),
}

/// Host connector
#[async_trait]
pub trait RollupHost: Send + Sync {
    /// Report the previous status and wait for the next request
    async fn finish(&self, status: Status) -> Result<NextRequest>;

    /// Send a state-committing notice
    async fn notice(&self, text: &str) -> Result<()>;

    /// Send a diagnostic report
    async fn report(&self, text: &str) -> Result<()>;

    /// Send a payout instruction
    async fn voucher(&self, destination: Address, amount: Balance) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct FinishRequest {
    status: Status,
}

#[derive(Debug, Deserialize)]
struct RollupRequest {
    request_type: String,
    data: RequestData,
}

#[derive(Debug, Deserialize)]
struct RequestData {
    payload: String,
    #[serde(default)]
    metadata: Option<AdvanceMetadata>,
}

#[derive(Debug, Deserialize)]
struct AdvanceMetadata {
    msg_sender: String,
    #[serde(default)]
    input_index: Option<u64>,
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    timestamp: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PayloadRequest {
    payload: String,
}

#[derive(Debug, Serialize)]
struct VoucherRequest {
    destination: String,
    payload: String,
}

/// HTTP client for the rollup host API
#[derive(Debug, Clone)]
pub struct HttpRollupHost {
    base_url: String,
    client: Client,
}

impl HttpRollupHost {
    /// Build a client from host settings
    pub fn new(config: &HostConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_output<T: Serialize + ?Sized>(&self, route: &str, body: &T) -> Result<()> {
        let url = format!("{}/{}", self.base_url, route);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            error!("Failed to send {}: {}", route, e);
            Error::HostUnavailable(format!("{} request failed: {}", route, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::HostUnavailable(format!(
                "{} failed with status {}: {}",
                route, status, error_text
            )));
        }

        debug!(route, "Output accepted by host");
        Ok(())
    }
}

#[async_trait]
impl RollupHost for HttpRollupHost {
    async fn finish(&self, status: Status) -> Result<NextRequest> {
        let url = format!("{}/finish", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&FinishRequest { status })
            .send()
            .await
            .map_err(|e| Error::HostUnavailable(format!("finish request failed: {}", e)))?;

        match response.status() {
            StatusCode::ACCEPTED => Ok(NextRequest::Idle),
            StatusCode::OK => {
                // An unreadable 200 body still consumes the host's input
                let body = response.text().await.map_err(|e| {
                    Error::HostUnavailable(format!("finish response read failed: {}", e))
                })?;
                match serde_json::from_str::<RollupRequest>(&body) {
                    Ok(request) => Ok(parse_request(request)),
                    Err(e) => Ok(NextRequest::Invalid(format!(
                        "Malformed finish response: {}",
                        e
                    ))),
                }
            }
            other => {
                let error_text = response.text().await.unwrap_or_default();
                Err(Error::HostUnavailable(format!(
                    "finish failed with status {}: {}",
                    other, error_text
                )))
            }
        }
    }

    async fn notice(&self, text: &str) -> Result<()> {
        self.post_output(
            "notice",
            &PayloadRequest {
                payload: codec::to_hex(text),
            },
        )
        .await
    }

    async fn report(&self, text: &str) -> Result<()> {
        self.post_output(
            "report",
            &PayloadRequest {
                payload: codec::to_hex(text),
            },
        )
        .await
    }

    async fn voucher(&self, destination: Address, amount: Balance) -> Result<()> {
        self.post_output(
            "voucher",
            &VoucherRequest {
                destination: destination.to_string(),
                payload: codec::to_hex(codec::encode_amount(amount)),
            },
        )
        .await
    }
}

fn parse_request(request: RollupRequest) -> NextRequest {
    let kind = match request.request_type.as_str() {
        "advance_state" => RequestKind::Advance,
        "inspect_state" => RequestKind::Inspect,
        other => return NextRequest::Invalid(format!("Unknown request type: {}", other)),
    };

    let payload = match codec::from_hex(&request.data.payload) {
        Ok(bytes) => bytes,
        Err(e) => return NextRequest::Invalid(e.to_string()),
    };

    let (sender, metadata) = match request.data.metadata {
        Some(meta) if kind == RequestKind::Advance => match meta.msg_sender.parse::<Address>() {
            Ok(sender) => (
                Some(sender),
                InputMetadata {
                    input_index: meta.input_index,
                    block_number: meta.block_number,
                    timestamp: meta.timestamp,
                },
            ),
            Err(e) => return NextRequest::Invalid(format!("msg_sender: {}", e)),
        },
        _ => (None, InputMetadata::default()),
    };

    NextRequest::Ready(InputEnvelope {
        kind,
        sender,
        payload,
        metadata,
    })
}
