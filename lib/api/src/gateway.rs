//! Authenticated request gateway.
//!
//! Every request passes through two stages. On the way out the gateway asks
//! the token source for the current access token and attaches it as a bearer
//! header. On the way back a `401 Unauthorized` triggers exactly one retry
//! with a freshly acquired token.

use async_trait::async_trait;
use kcloft_core::{RequestId, Result};
use kcloft_identity::{AccessToken, TokenProvider};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Maximum number of times one request is resubmitted after a `401`.
pub const MAX_RETRIES: u8 = 1;

const AUTHORIZATION: &str = "Authorization";

/// Source of access tokens for outbound requests.
#[async_trait(?Send)]
pub trait TokenSource: Send + Sync {
    /// Returns the current access token, or `None` if there is none.
    async fn access_token(&self) -> Option<AccessToken>;
}

#[async_trait(?Send)]
impl TokenSource for TokenProvider {
    async fn access_token(&self) -> Option<AccessToken> {
        TokenProvider::access_token(self).await
    }
}

/// One outbound request and how many times it has been retried.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: RequestId,
    request: ApiRequest,
    retries: u8,
}

impl RequestContext {
    /// Wraps a request that has not been sent yet.
    #[must_use]
    pub fn new(request: ApiRequest) -> Self {
        Self {
            id: RequestId::new(),
            request,
            retries: 0,
        }
    }

    /// Returns the ID used to correlate log events for this request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the request as it will be sent.
    #[must_use]
    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    /// Returns how many times the request has been resubmitted.
    #[must_use]
    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Returns true if the request may still be retried.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.retries < MAX_RETRIES
    }

    fn attach(&mut self, token: &AccessToken) {
        self.request
            .set_header(AUTHORIZATION, token.bearer_header());
    }
}

/// HTTP client wrapper that authenticates every request.
#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenSource>,
}

impl RequestGateway {
    /// Creates a gateway that sends through `transport` with tokens from `tokens`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenSource>) -> Self {
        Self { transport, tokens }
    }

    /// Sends a request and returns its successful response.
    ///
    /// A `401` is retried once with a newly acquired token; the outcome of the
    /// retry is returned as is. Without a token the request is still sent,
    /// unauthenticated.
    ///
    /// # Errors
    ///
    /// `Status` for non-2xx responses and `Transport` when no response arrived.
    #[instrument(skip(self, request), fields(method = request.method().as_str(), path = request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut context = RequestContext::new(request);
        debug!(request_id = %context.id(), "sending request");

        match self.tokens.access_token().await {
            Some(token) => {
                context.attach(&token);
                debug!(request_id = %context.id(), "attached bearer token");
            }
            None => {
                warn!(request_id = %context.id(), "no access token, sending unauthenticated request");
            }
        }

        let response = self.transport.send(context.request()).await?;
        if response.status != 401 || !context.can_retry() {
            return Ok(response.error_for_status()?);
        }

        context.retries += 1;
        let Some(token) = self.tokens.access_token().await else {
            warn!(request_id = %context.id(), "401 and no token to retry with");
            return Ok(response.error_for_status()?);
        };

        context.attach(&token);
        info!(request_id = %context.id(), retries = context.retries(), "retrying after 401");
        let retried = self.transport.send(context.request()).await?;
        Ok(retried.error_for_status()?)
    }

    /// Sends a `GET` and decodes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        Ok(self.send(request).await?.json()?)
    }

    /// Sends `body` as JSON and decodes the JSON response.
    pub async fn post_json<B, T>(&self, request: ApiRequest, body: &B) -> Result<T, ApiError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = request.with_json_body(body)?;
        Ok(self.send(request).await?.json()?)
    }
}
