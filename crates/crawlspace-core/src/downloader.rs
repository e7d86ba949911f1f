use std::sync::Arc;

use crate::events::{CrawlEvent, EventBus};
use crate::middleware::{DownloaderMiddleware, MiddlewareAction};
use crate::request::Request;
use crate::response::Response;
use crate::traits::{FetchOptions, Transport};

/// Result of [`Downloader::download`].
#[derive(Debug)]
pub enum Outcome {
    Completed(Response),
    Dropped(String),
}

/// Runs one request through the middleware chain, the fetch and the response
/// chain.
///
/// Emits `RequestSending` first, then exactly one of `ResponseReceived` or
/// `RequestDropped`.
pub struct Downloader {
    transport: Arc<dyn Transport>,
    events: EventBus,
    middleware: Vec<Box<dyn DownloaderMiddleware>>,
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus) -> Self {
        Self {
            transport,
            events,
            middleware: Vec::new(),
        }
    }

    /// Replace the middleware chain. Order is execution order.
    pub fn set_middleware(&mut self, middleware: Vec<Box<dyn DownloaderMiddleware>>) {
        self.middleware = middleware;
    }

    pub fn clear_middleware(&mut self) {
        self.middleware.clear();
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    pub async fn download(&self, request: Request) -> Outcome {
        self.events
            .publish(CrawlEvent::RequestSending { request: &request });

        let request = match self.run_request_chain(request).await {
            MiddlewareAction::Continue(request) => request,
            MiddlewareAction::Drop { dropped, reason } => return self.drop_request(&dropped, reason),
        };

        let options = FetchOptions::with_headers(request.headers().clone());
        let raw = match self.transport.fetch(request.url(), &options).await {
            Ok(raw) => raw,
            Err(e) => return self.drop_request(&request, format!("fetch-error: {e}")),
        };

        match self.run_response_chain(Response::new(request, raw)).await {
            MiddlewareAction::Continue(response) => {
                self.events
                    .publish(CrawlEvent::ResponseReceived { response: &response });
                Outcome::Completed(response)
            }
            MiddlewareAction::Drop { dropped, reason } => {
                self.drop_request(dropped.request(), reason)
            }
        }
    }

    async fn run_request_chain(&self, mut request: Request) -> MiddlewareAction<Request> {
        for middleware in &self.middleware {
            match middleware
                .handle_request(request, self.transport.as_ref())
                .await
            {
                MiddlewareAction::Continue(next) => request = next,
                MiddlewareAction::Drop { dropped, reason } => {
                    tracing::debug!(
                        middleware = middleware.name(),
                        url = %dropped.url(),
                        %reason,
                        "Request dropped by middleware"
                    );
                    return MiddlewareAction::Drop { dropped, reason };
                }
            }
        }
        MiddlewareAction::Continue(request)
    }

    async fn run_response_chain(&self, mut response: Response) -> MiddlewareAction<Response> {
        for middleware in &self.middleware {
            match middleware.handle_response(response).await {
                MiddlewareAction::Continue(next) => response = next,
                MiddlewareAction::Drop { dropped, reason } => {
                    tracing::debug!(
                        middleware = middleware.name(),
                        url = %dropped.url(),
                        %reason,
                        "Response dropped by middleware"
                    );
                    return MiddlewareAction::Drop { dropped, reason };
                }
            }
        }
        MiddlewareAction::Continue(response)
    }

    fn drop_request(&self, request: &Request, reason: String) -> Outcome {
        self.events.publish(CrawlEvent::RequestDropped {
            request,
            reason: &reason,
        });
        Outcome::Dropped(reason)
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("middleware", &self.middleware_names())
            .finish_non_exhaustive()
    }
}
