use async_trait::async_trait;
use futures::{ StreamExt, TryStreamExt };
use log::{ debug, info };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE } };
use url::Url;

use super::{ ChatCompletionRequest, ChatUpstream, UpstreamResponse };
use crate::llm::BoxError;

/// HTTP client for the hosted chat-completions gateway.
pub struct GatewayClient {
    http: HttpClient,
    url: Url,
}

impl GatewayClient {
    pub fn new(url: Url) -> Result<Self, BoxError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as BoxError)?;

        Ok(Self { http, url })
    }
}

#[async_trait]
impl ChatUpstream for GatewayClient {
    async fn stream_chat(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest
    ) -> Result<UpstreamResponse, BoxError> {
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| format!("Invalid API key format: {}", e))?;

        info!(
            "Calling upstream {} (model {}, {} messages)",
            self.url,
            request.model,
            request.messages.len()
        );

        let resp = self.http
            .post(self.url.clone())
            .header(AUTHORIZATION, auth)
            .json(request)
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(UpstreamResponse::Rejected { status: status.as_u16(), body });
        }

        debug!("Upstream accepted with status {}", status);
        let stream = resp.bytes_stream().map_err(|e| Box::new(e) as BoxError);
        Ok(UpstreamResponse::Stream(stream.boxed()))
    }
}
