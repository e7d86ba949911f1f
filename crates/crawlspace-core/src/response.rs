use std::borrow::Cow;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::request::{Meta, Request};
use crate::traits::RawResponse;

/// The fetched result of a [`Request`].
///
/// Keeps a read-only copy of the originating request. The metadata bag starts
/// as a copy of the request's and can be extended by response middleware.
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    meta: Meta,
}

impl Response {
    pub fn new(request: Request, raw: RawResponse) -> Self {
        let meta = request.meta().clone();
        Self {
            request,
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            meta,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn url(&self) -> &Url {
        self.request.url()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn get_meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.meta.insert(key.into(), value);
    }
}
