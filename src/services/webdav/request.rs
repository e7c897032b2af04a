use bytes::Bytes;
use futures::Stream;
use reqwest::Method;
use serde::Serialize;
use std::fmt;
use std::io;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::errors::{ErrorCode, Result, WebDAVError};

/// Upload body source, e.g. `tokio_util::io::ReaderStream` over a file
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Ordered header set with case-insensitive keys
///
/// Setting an existing key replaces its value but keeps the casing it was
/// first inserted with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend_from(&mut self, other: &Headers) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (key, value) in iter {
            headers.set(key, value);
        }
        headers
    }
}

/// Merges header sets left to right, later sets win
pub fn merge_headers(payloads: &[&Headers]) -> Headers {
    let mut output = Headers::new();
    for headers in payloads {
        output.extend_from(headers);
    }
    output
}

/// Request payload
pub enum RequestBody {
    Text(String),
    Bytes(Bytes),
    /// Pre-serialized JSON, sent with `content-type: application/json`
    Json(String),
    /// Consumed on send, cannot be replayed for an auth retry
    Stream(BodyStream),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_string(value).map(RequestBody::Json).map_err(|e| {
            WebDAVError::local(
                ErrorCode::DataType,
                format!("Unable to convert request body: {}", e),
            )
        })
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        RequestBody::Stream(Box::pin(stream))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, RequestBody::Stream(_))
    }

    /// Copy for a second send. `None` for streams.
    pub fn try_clone(&self) -> Option<Self> {
        match self {
            RequestBody::Text(s) => Some(RequestBody::Text(s.clone())),
            RequestBody::Bytes(b) => Some(RequestBody::Bytes(b.clone())),
            RequestBody::Json(s) => Some(RequestBody::Json(s.clone())),
            RequestBody::Stream(_) => None,
        }
    }

    /// Headers implied by the body encoding
    pub fn content_headers(&self) -> Headers {
        match self {
            RequestBody::Json(_) => Headers::new().with("content-type", "application/json"),
            _ => Headers::new(),
        }
    }

    pub fn into_reqwest_body(self) -> reqwest::Body {
        match self {
            RequestBody::Text(s) => reqwest::Body::from(s),
            RequestBody::Bytes(b) => reqwest::Body::from(b),
            RequestBody::Json(s) => reqwest::Body::from(s),
            RequestBody::Stream(s) => reqwest::Body::wrap_stream(s),
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Text(s) => f.debug_tuple("Text").field(&s.len()).finish(),
            RequestBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            RequestBody::Json(s) => f.debug_tuple("Json").field(&s.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        RequestBody::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        RequestBody::Text(value.to_string())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for RequestBody {
    fn from(value: &[u8]) -> Self {
        RequestBody::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<Bytes> for RequestBody {
    fn from(value: Bytes) -> Self {
        RequestBody::Bytes(value)
    }
}

/// Byte length of a text or binary body
pub fn calculate_data_length(data: &RequestBody) -> Result<u64> {
    match data {
        RequestBody::Text(s) | RequestBody::Json(s) => Ok(s.len() as u64),
        RequestBody::Bytes(b) => Ok(b.len() as u64),
        RequestBody::Stream(_) => Err(WebDAVError::local(
            ErrorCode::DataTypeNoLength,
            "Cannot calculate data length: Invalid type",
        )),
    }
}

/// How `Content-Length` is chosen for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentLength {
    #[default]
    Auto,
    Disabled,
    Exact(u64),
}

impl ContentLength {
    /// Header value for `data`. Streams never get a computed length.
    pub fn header_value(&self, data: &RequestBody) -> Result<Option<String>> {
        if data.is_stream() {
            return Ok(None);
        }
        match self {
            ContentLength::Disabled => Ok(None),
            ContentLength::Exact(len) => Ok(Some(len.to_string())),
            ContentLength::Auto => calculate_data_length(data).map(|len| Some(len.to_string())),
        }
    }
}

/// Per-call options every operation accepts
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Headers,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            headers: Headers::new(),
            cancel: Some(cancel),
        }
    }
}

#[derive(Debug)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub cancel: Option<CancellationToken>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Headers::new(),
            body: None,
            cancel: None,
        }
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Copy for a second send, `None` when the body is a stream
    pub fn try_clone(&self) -> Option<Self> {
        let body = match &self.body {
            Some(body) => Some(body.try_clone()?),
            None => None,
        };
        Some(Self {
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            body,
            cancel: self.cancel.clone(),
        })
    }
}

/// Final descriptor for dispatch: headers merged context, then operation
/// defaults, then caller overrides; caller cancellation attached.
pub fn prepare_request_options(
    base: RequestDescriptor,
    context_headers: &Headers,
    options: &RequestOptions,
) -> RequestDescriptor {
    let headers = merge_headers(&[context_headers, &base.headers, &options.headers]);
    RequestDescriptor {
        headers,
        cancel: options.cancel.clone().or(base.cancel),
        ..base
    }
}

/// Extension verbs (`PROPFIND`, `MKCOL`, ...) are not predefined on `Method`
pub fn webdav_method(name: &str) -> Result<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|_| WebDAVError::InvalidMethod(name.to_string()))
}
