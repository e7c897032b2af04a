use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{Result, WebDAVError};
use super::auth::{
    generate_digest_auth_header, parse_digest_auth, response_indicates_digest_auth, AuthType,
    DigestState,
};
use super::context::WebDAVClientContext;
use super::request::RequestDescriptor;

pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Raw server answer; status classification is left to the caller
pub struct DavResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body: ResponseStream,
}

impl fmt::Debug for DavResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DavResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}

impl DavResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            headers,
            body: Box::pin(futures::stream::once(async move { Ok::<_, WebDAVError>(body) })),
        }
    }

    pub fn from_stream(status: StatusCode, headers: HeaderMap, body: ResponseStream) -> Self {
        Self { status, headers, body }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub async fn bytes(self) -> Result<Bytes> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn into_stream(self) -> ResponseStream {
        self.body
    }
}

/// Sends one prepared request. Swappable so tests and embedders can route
/// requests without a real network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: RequestDescriptor) -> Result<DavResponse>;
}

/// Default transport on a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<DavResponse> {
        let RequestDescriptor { url, method, mut headers, body, .. } = request;
        let mut builder = self.client.request(method, &url);

        if let Some(body) = body {
            headers.extend_from(&body.content_headers());
            builder = builder.body(body.into_reqwest_body());
        }
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(WebDAVError::from));
        Ok(DavResponse::from_stream(status, headers, Box::pin(body)))
    }
}

/// Dispatches prepared requests for one context, running auth negotiation
/// and the single digest retry.
#[derive(Clone)]
pub struct WebDAVConnection {
    transport: Arc<dyn HttpTransport>,
    context: Arc<WebDAVClientContext>,
}

impl WebDAVConnection {
    pub fn new(transport: Arc<dyn HttpTransport>, context: Arc<WebDAVClientContext>) -> Self {
        Self { transport, context }
    }

    pub fn context(&self) -> &Arc<WebDAVClientContext> {
        &self.context
    }

    /// Sends `request`, aborting with `Cancelled` when its token fires
    pub async fn request(&self, request: RequestDescriptor) -> Result<DavResponse> {
        let cancel = request.cancel.clone();
        let label = format!("{} {}", request.method, request.url);
        let result = cancellable(cancel.as_ref(), self.dispatch(request)).await;
        if matches!(result, Err(WebDAVError::Cancelled)) {
            debug!("Request cancelled: {}", label);
        }
        result
    }

    async fn dispatch(&self, request: RequestDescriptor) -> Result<DavResponse> {
        match self.context.auth_type().await {
            AuthType::Auto => self.request_auto(request).await,
            AuthType::Digest => self.request_digest(request).await,
            _ => self.request_standard(request).await,
        }
    }

    async fn request_auto(&self, request: RequestDescriptor) -> Result<DavResponse> {
        let replay = request.try_clone();
        let response = self.request_standard(request).await?;

        if response.status.is_success() {
            self.context.commit_password().await;
            return Ok(response);
        }

        let challenge = response.header("www-authenticate").map(str::to_string);
        if response.status == StatusCode::UNAUTHORIZED
            && response_indicates_digest_auth(challenge.as_deref())
        {
            let mut guard = self.context.lock_digest().await;
            self.context.commit_digest(&mut guard).await?;
            let digest = guard.get_or_insert_with(|| DigestState::new(self.context.credentials()));
            digest.has_digest_auth = parse_digest_auth(challenge.as_deref(), digest);
            return self.retry_with_challenge(replay, digest, response).await;
        }

        Ok(response)
    }

    async fn request_digest(&self, mut request: RequestDescriptor) -> Result<DavResponse> {
        if request.body.as_ref().is_some_and(|body| body.is_stream()) {
            return self.request_digest_streamed(request).await;
        }
        let mut guard = self.context.lock_digest().await;
        let digest = guard.get_or_insert_with(|| DigestState::new(self.context.credentials()));

        if digest.has_digest_auth {
            let header = generate_digest_auth_header(request.method.as_str(), &request.url, digest);
            request.headers.set("Authorization", header);
        }
        let replay = request.try_clone();
        let response = self.request_standard(request).await?;

        if response.status != StatusCode::UNAUTHORIZED {
            digest.nc += 1;
            return Ok(response);
        }

        let challenge = response.header("www-authenticate").map(str::to_string);
        digest.has_digest_auth = parse_digest_auth(challenge.as_deref(), digest);
        self.retry_with_challenge(replay, digest, response).await
    }

    /// Stream bodies finish only when their producer does, so the digest
    /// state is locked just to sign the request (reserving its nonce count)
    /// and again to record a challenge. An open upload never holds the lock.
    async fn request_digest_streamed(&self, mut request: RequestDescriptor) -> Result<DavResponse> {
        let signed = {
            let mut guard = self.context.lock_digest().await;
            let digest = guard.get_or_insert_with(|| DigestState::new(self.context.credentials()));
            if digest.has_digest_auth {
                let header = generate_digest_auth_header(request.method.as_str(), &request.url, digest);
                request.headers.set("Authorization", header);
                digest.nc += 1;
            }
            digest.has_digest_auth
        };

        let response = self.request_standard(request).await?;

        let mut guard = self.context.lock_digest().await;
        let digest = guard.get_or_insert_with(|| DigestState::new(self.context.credentials()));
        if response.status != StatusCode::UNAUTHORIZED {
            if !signed {
                digest.nc += 1;
            }
            return Ok(response);
        }

        let challenge = response.header("www-authenticate").map(str::to_string);
        digest.has_digest_auth = parse_digest_auth(challenge.as_deref(), digest);
        warn!("Digest challenge received but the request body is a stream and cannot be resent");
        Ok(response)
    }

    /// The one authenticated retry after a 401 challenge
    async fn retry_with_challenge(
        &self,
        replay: Option<RequestDescriptor>,
        digest: &mut DigestState,
        unauthorized: DavResponse,
    ) -> Result<DavResponse> {
        if !digest.has_digest_auth {
            return Ok(unauthorized);
        }
        let Some(mut retry) = replay else {
            warn!("Digest challenge received but the request body is a stream and cannot be resent");
            return Ok(unauthorized);
        };

        let header = generate_digest_auth_header(retry.method.as_str(), &retry.url, digest);
        retry.headers.set("Authorization", header);
        let response = self.request_standard(retry).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            warn!("Digest authentication rejected after challenge retry");
            digest.has_digest_auth = false;
        } else {
            digest.nc += 1;
        }
        Ok(response)
    }

    async fn request_standard(&self, request: RequestDescriptor) -> Result<DavResponse> {
        debug!("{} {}", request.method, request.url);
        self.transport.send(request).await
    }
}

/// Runs `fut` unless `cancel` fires first
pub async fn cancellable<T, F>(cancel: Option<&CancellationToken>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(WebDAVError::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}

/// Turns any status >= 400 into a status error
pub fn handle_response_code(response: DavResponse) -> Result<DavResponse> {
    if response.status.as_u16() >= 400 {
        return Err(WebDAVError::from_status(response.status));
    }
    Ok(response)
}
