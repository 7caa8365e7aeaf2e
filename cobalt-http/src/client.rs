//! Discord REST client implementation.
//!
//! All outbound requests flow through the governor in [`crate::ratelimit`]:
//! the caller's future joins its bucket's FIFO queue, waits out the global
//! lockout and the bucket window, then goes to the wire. 429s and 5xx are
//! retried here transparently; everything else surfaces typed.

use crate::error::{ApiErrorBody, HttpError};
use crate::ratelimit::{BucketSnapshot, RateLimiter};
use crate::routes::{bucket_key, GatewayBot};

use cobalt_model::ApiVersion;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// User agent for requests.
const USER_AGENT_VALUE: &str = concat!(
    "DiscordBot (https://github.com/cobalt-rs/cobalt, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Per-attempt deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts for connection-layer failures and 5xx responses.
const MAX_ATTEMPTS: u32 = 5;

/// Transparent re-submits after 429 responses.
const MAX_RATE_LIMIT_RESUBMITS: u32 = 5;

/// A file to attach to a message or webhook execution.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// File name shown in the client.
    pub filename: String,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }
}

/// An outbound request, held in full so retries can replay it.
pub(crate) struct Request {
    method: Method,
    route: String,
    /// Serialized JSON body, cached across retries.
    body: Option<Vec<u8>>,
    reason: Option<String>,
    files: Vec<FileUpload>,
}

impl Request {
    pub(crate) fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            body: None,
            reason: None,
            files: Vec::new(),
        }
    }

    pub(crate) fn json<B: Serialize>(mut self, body: &B) -> Result<Self, HttpError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Attach an audit-log reason, validated as a header value up front.
    pub(crate) fn reason(mut self, reason: Option<&str>) -> Result<Self, HttpError> {
        if let Some(reason) = reason {
            HeaderValue::from_str(reason)?;
            self.reason = Some(reason.to_string());
        }
        Ok(self)
    }

    pub(crate) fn files(mut self, files: Vec<FileUpload>) -> Self {
        self.files = files;
        self
    }
}

/// Discord REST API client.
///
/// One instance holds one pooled HTTPS client, one bucket table, and one
/// global lockout; create one per bot. Cheap to share via `Arc`.
pub struct HttpClient {
    /// Inner HTTP client (connection pooling, keep-alive).
    client: Client,
    /// Bot token.
    token: String,
    /// REST base URL, fixed by the API version.
    base: &'static str,
    /// The rate-limit governor.
    limiter: Arc<RateLimiter>,
}

impl HttpClient {
    /// Create a new client with the given bot token, speaking the default
    /// API version.
    pub fn new(token: impl Into<String>) -> Result<Self, HttpError> {
        Self::with_api_version(token, ApiVersion::default())
    }

    /// Create a new client pinned to a specific API version.
    pub fn with_api_version(
        token: impl Into<String>,
        version: ApiVersion,
    ) -> Result<Self, HttpError> {
        let token = token.into();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bot {token}"))
                .map_err(|_| HttpError::Unauthorized)?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            token,
            base: version.rest_base(),
            limiter: Arc::new(RateLimiter::new()),
        })
    }

    /// The bot token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get gateway connection info for this bot: URL, recommended shard
    /// count, and identify concurrency.
    pub async fn get_gateway_bot(&self) -> Result<GatewayBot, HttpError> {
        self.get("/gateway/bot").await
    }

    // =========================================================================
    // Internal request methods
    // =========================================================================

    pub(crate) async fn get<T: DeserializeOwned>(&self, route: &str) -> Result<T, HttpError> {
        self.fire(Request::new(Method::GET, route)).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.fire(Request::new(Method::POST, route).json(body)?).await
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.fire(Request::new(Method::PATCH, route).json(body)?)
            .await
    }

    pub(crate) async fn patch_with_reason<T: DeserializeOwned, B: Serialize>(
        &self,
        route: &str,
        body: &B,
        reason: Option<&str>,
    ) -> Result<T, HttpError> {
        self.fire(
            Request::new(Method::PATCH, route)
                .json(body)?
                .reason(reason)?,
        )
        .await
    }

    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        route: &str,
        reason: Option<&str>,
    ) -> Result<T, HttpError> {
        self.fire(Request::new(Method::PUT, route).reason(reason)?)
            .await
    }

    pub(crate) async fn put_json<T: DeserializeOwned, B: Serialize>(
        &self,
        route: &str,
        body: &B,
        reason: Option<&str>,
    ) -> Result<T, HttpError> {
        self.fire(Request::new(Method::PUT, route).json(body)?.reason(reason)?)
            .await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        route: &str,
        reason: Option<&str>,
    ) -> Result<T, HttpError> {
        self.fire(Request::new(Method::DELETE, route).reason(reason)?)
            .await
    }

    pub(crate) async fn post_with_reason<T: DeserializeOwned, B: Serialize>(
        &self,
        route: &str,
        body: &B,
        reason: Option<&str>,
    ) -> Result<T, HttpError> {
        self.fire(Request::new(Method::POST, route).json(body)?.reason(reason)?)
            .await
    }

    pub(crate) async fn post_with_files<T: DeserializeOwned, B: Serialize>(
        &self,
        route: &str,
        body: &B,
        files: Vec<FileUpload>,
    ) -> Result<T, HttpError> {
        self.fire(Request::new(Method::POST, route).json(body)?.files(files))
            .await
    }

    /// Submit a request through the governor.
    pub(crate) async fn fire<T: DeserializeOwned>(&self, req: Request) -> Result<T, HttpError> {
        let key = bucket_key(&req.method, &req.route);
        let bucket = self.limiter.bucket(&key);

        // Hold the bucket permit for the whole round-trip, retries
        // included, so same-bucket requests keep submission order.
        let _permit = bucket.admit().await?;

        let mut resubmits = 0u32;
        let mut attempt = 0u32;

        loop {
            self.limiter.wait_until_ready(&bucket).await;

            debug!(method = %req.method, route = %req.route, "sending request");

            let response = match timeout(REQUEST_TIMEOUT, self.send_attempt(&req)).await {
                Err(_) => return Err(HttpError::Timeout),
                Ok(Err(e)) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(HttpError::Request(e));
                    }
                    let delay = retry_backoff(attempt - 1);
                    warn!(
                        route = %req.route,
                        error = %e,
                        delay_ms = delay.as_millis(),
                        "connection error, retrying"
                    );
                    sleep(delay).await;
                    continue;
                }
                Ok(Ok(response)) => response,
            };

            let status = response.status();
            self.limiter
                .record(&bucket, rate_limit_snapshot(response.headers()));

            if status == StatusCode::TOO_MANY_REQUESTS {
                let (retry_after, global) = parse_rate_limit_response(response).await;

                if global {
                    self.limiter.lock_global(retry_after);
                } else {
                    self.limiter.delay_bucket(&bucket, retry_after);
                }

                resubmits += 1;
                if resubmits > MAX_RATE_LIMIT_RESUBMITS {
                    return Err(HttpError::RateLimitExhausted { route: key });
                }
                warn!(
                    route = %req.route,
                    retry_after_ms = retry_after.as_millis(),
                    global,
                    resubmits,
                    "rate limited, re-submitting"
                );
                continue;
            }

            if status.is_server_error() {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(HttpError::ServerError(status.as_u16()));
                }
                let delay = retry_backoff(attempt - 1);
                warn!(
                    route = %req.route,
                    status = status.as_u16(),
                    delay_ms = delay.as_millis(),
                    "server error, retrying"
                );
                sleep(delay).await;
                continue;
            }

            return decode_response(status, response).await;
        }
    }

    /// Build and send one attempt. The multipart form is rebuilt per
    /// attempt from the cached bytes; JSON bodies are reused as-is.
    async fn send_attempt(&self, req: &Request) -> Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.base, req.route);
        let mut builder = self.client.request(req.method.clone(), &url);

        if let Some(reason) = &req.reason {
            builder = builder.header("X-Audit-Log-Reason", reason);
        }

        if req.files.is_empty() {
            if let Some(body) = &req.body {
                builder = builder
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone());
            }
        } else {
            let mut form = Form::new();
            if let Some(body) = &req.body {
                form = form.text("payload_json", String::from_utf8_lossy(body).into_owned());
            }
            for (index, file) in req.files.iter().enumerate() {
                form = form.part(
                    format!("files[{index}]"),
                    Part::bytes(file.data.clone()).file_name(file.filename.clone()),
                );
            }
            builder = builder.multipart(form);
        }

        builder.send().await
    }
}

/// Map a finished response to a typed result.
async fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    response: Response,
) -> Result<T, HttpError> {
    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                // 204 and friends; `T` is () or an Option here.
                Ok(serde_json::from_slice(b"null")?)
            } else {
                Ok(serde_json::from_slice(&bytes)?)
            }
        }
        StatusCode::UNAUTHORIZED => Err(HttpError::Unauthorized),
        StatusCode::FORBIDDEN => Err(HttpError::Forbidden),
        StatusCode::NOT_FOUND => Err(HttpError::NotFound),
        _ => {
            let bytes = response.bytes().await.unwrap_or_default();
            let body: ApiErrorBody = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                ApiErrorBody {
                    code: 0,
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                }
            });

            Err(HttpError::Api {
                status: status.as_u16(),
                code: body.code,
                message: body.message,
            })
        }
    }
}

/// Extract `X-RateLimit-*` values from response headers.
///
/// `X-RateLimit-Reset-After` is preferred; the wall-clock
/// `X-RateLimit-Reset` (epoch seconds) is the v6-era fallback.
fn rate_limit_snapshot(headers: &HeaderMap) -> BucketSnapshot {
    let text = |name: &str| headers.get(name).and_then(|h| h.to_str().ok());

    let limit = text("x-ratelimit-limit").and_then(|s| s.parse().ok());
    let remaining = text("x-ratelimit-remaining").and_then(|s| s.parse().ok());

    let reset_after = text("x-ratelimit-reset-after")
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .or_else(|| {
            let epoch = text("x-ratelimit-reset").and_then(|s| s.parse::<f64>().ok())?;
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()?
                .as_secs_f64();
            (epoch > now).then(|| Duration::from_secs_f64(epoch - now))
        });

    BucketSnapshot {
        limit,
        remaining,
        reset_after,
    }
}

/// Pull the retry-after delay and global marker out of a 429.
async fn parse_rate_limit_response(response: Response) -> (Duration, bool) {
    let header_secs = response
        .headers()
        .get("retry-after")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok());
    let global_header = response.headers().contains_key("x-ratelimit-global");

    let body: serde_json::Value = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
        Err(_) => serde_json::Value::Null,
    };

    let retry_after = header_secs
        .or_else(|| body.get("retry_after").and_then(|v| v.as_f64()))
        .filter(|secs| *secs >= 0.0)
        .unwrap_or(5.0);

    let global = global_header
        || body
            .get("global")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

    (Duration::from_secs_f64(retry_after), global)
}

/// Backoff for connection-layer failures and 5xx: 1s doubling, capped 30s.
fn retry_backoff(attempt: u32) -> Duration {
    let delay_ms = 1000u64.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(30_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        assert!(HttpClient::new("test_token").is_ok());
    }

    #[test]
    fn client_rejects_unprintable_token() {
        assert!(HttpClient::new("bad\ntoken").is_err());
    }

    #[test]
    fn legacy_version_changes_base() {
        let client = HttpClient::with_api_version("t", ApiVersion::V6).unwrap();
        assert_eq!(client.base, "https://discord.com/api/v6");
    }

    #[test]
    fn retry_backoff_schedule() {
        assert_eq!(retry_backoff(0), Duration::from_secs(1));
        assert_eq!(retry_backoff(1), Duration::from_secs(2));
        assert_eq!(retry_backoff(4), Duration::from_secs(16));
        assert_eq!(retry_backoff(10), Duration::from_secs(30));
    }

    #[test]
    fn snapshot_prefers_reset_after() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("2"));
        headers.insert("x-ratelimit-reset-after", HeaderValue::from_static("1.5"));

        let snapshot = rate_limit_snapshot(&headers);
        assert_eq!(snapshot.limit, Some(5));
        assert_eq!(snapshot.remaining, Some(2));
        assert_eq!(snapshot.reset_after, Some(Duration::from_secs_f64(1.5)));
    }

    #[test]
    fn snapshot_falls_back_to_wall_clock_reset() {
        let future = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs_f64()
            + 3.0;

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from_str(&format!("{future}")).unwrap(),
        );

        let snapshot = rate_limit_snapshot(&headers);
        let reset = snapshot.reset_after.unwrap();
        assert!(reset > Duration::from_secs(1) && reset < Duration::from_secs(5));
    }

    #[test]
    fn invalid_audit_reason_is_rejected_up_front() {
        let req = Request::new(Method::DELETE, "/channels/1").reason(Some("bad\nreason"));
        assert!(matches!(req, Err(HttpError::InvalidHeaderValue(_))));
    }
}
