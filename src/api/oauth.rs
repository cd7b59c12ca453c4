//! OAuth bearer-token transport over `reqwest`

use super::config::TOKEN_ENDPOINT;
use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::config::OAuthCredentials;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Connect timeout for every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Total timeout for API calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest silence tolerated between reads; bounds stalled downloads
const READ_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Transport authenticating with an OAuth access token.
///
/// A `401` triggers one refresh-token exchange followed by a single resend.
/// Refreshes hold the token write lock and are skipped when another caller
/// already replaced the token the failed request carried.
pub struct OAuthTransport {
    http: Client,
    credentials: OAuthCredentials,
    access_token: RwLock<String>,
    token_url: String,
}

impl OAuthTransport {
    /// Create a transport for `credentials`
    pub fn new(credentials: OAuthCredentials) -> Result<Self, TransportError> {
        let http = http_client(READ_TIMEOUT)?;

        Ok(Self {
            http,
            access_token: RwLock::new(credentials.access_token.clone()),
            credentials,
            token_url: TOKEN_ENDPOINT.to_string(),
        })
    }

    /// Override the token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Override the read timeout
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Result<Self, TransportError> {
        self.http = http_client(read_timeout)?;
        Ok(self)
    }

    /// Access token currently in use
    pub async fn access_token(&self) -> String {
        self.access_token.read().await.clone()
    }

    async fn dispatch(
        &self,
        request: &HttpRequest,
        token: &str,
    ) -> Result<Response, TransportError> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .bearer_auth(token)
            .timeout(REQUEST_TIMEOUT);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    async fn start_download(&self, url: &str, token: &str) -> Result<Response, TransportError> {
        Ok(self.http.get(url).bearer_auth(token).send().await?)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// `stale` is the token the rejected request carried; nothing is
    /// exchanged when it has already been replaced. Returns the token
    /// endpoint's response when the exchange is refused.
    async fn refresh(&self, stale: &str) -> Result<Option<HttpResponse>, TransportError> {
        let mut token = self.access_token.write().await;
        if *token != stale {
            debug!("Access token already refreshed");
            return Ok(None);
        }
        debug!("Refreshing access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.app_key.as_str()),
                ("client_secret", self.credentials.app_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let response = into_http_response(response).await?;
        if !response.is_success() {
            return Ok(Some(response));
        }

        let parsed: TokenResponse = response
            .json_body()
            .map_err(|e| TransportError::Request(format!("invalid token response: {e}")))?;
        *token = parsed.access_token;
        info!("Access token refreshed");
        Ok(None)
    }
}

fn http_client(read_timeout: Duration) -> Result<Client, TransportError> {
    Ok(Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(read_timeout)
        .user_agent(concat!("bigquery-extractor/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

async fn into_http_response(response: Response) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    Ok(HttpResponse { status, body })
}

#[async_trait]
impl Transport for OAuthTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let token = self.access_token().await;
        let response = self.dispatch(request, &token).await?;
        if response.status().as_u16() != 401 {
            return into_http_response(response).await;
        }

        if let Some(refused) = self.refresh(&token).await? {
            return Ok(refused);
        }
        let token = self.access_token().await;
        into_http_response(self.dispatch(request, &token).await?).await
    }

    async fn download(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<HttpResponse, TransportError> {
        let token = self.access_token().await;
        let mut response = self.start_download(url, &token).await?;
        if response.status().as_u16() == 401 {
            if let Some(refused) = self.refresh(&token).await? {
                return Ok(refused);
            }
            let token = self.access_token().await;
            response = self.start_download(url, &token).await?;
        }

        if !response.status().is_success() {
            return into_http_response(response).await;
        }

        let status = response.status().as_u16();
        let mut file = tokio::fs::File::create(destination).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(HttpResponse::new(status, Bytes::new()))
    }
}
