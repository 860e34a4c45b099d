//! HTTP implementation of the backend contract.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use ragdesk_core::backend::{
    ChatBackend, ChatReply, ChatRequest, DocumentList, StatusQuery, UploadFile, UploadReceipt,
};
use ragdesk_core::config::ClientConfig;
use ragdesk_core::error::{RagDeskError, Result};
use ragdesk_core::upload::UploadStatusInfo;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Talks to the question-answering service over its versioned REST API.
///
/// Chat requests are not subject to the request timeout since answers stream
/// for as long as generation runs; every other call is.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct IngestResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    detail: serde_json::Value,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| RagDeskError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.api_base_url.trim(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends with the request timeout and rejects non-success statuses.
    async fn send_checked(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body));
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| RagDeskError::Serialization {
            format: "JSON".to_string(),
            message: format!("Unexpected response body: {}", e),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let response = self
            .client
            .post(self.url("/chat/"))
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.bytes().await.map_err(map_transport_error)?;
            return Ok(ChatReply::buffered(status, body));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_transport_error))
            .boxed();
        Ok(ChatReply::streaming(status, body))
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadReceipt> {
        tracing::info!("Uploading {} ({} bytes)", file.file_name, file.bytes.len());
        let part = Part::bytes(file.bytes).file_name(file.file_name);
        let form = Form::new().part("file", part);
        let response = self
            .send_checked(self.client.post(self.url("/upload/")).multipart(form))
            .await?;
        Self::read_json(response).await
    }

    async fn upload_status(&self, task_id: &str) -> Result<StatusQuery> {
        let url = self.url(&format!("/upload/status/{}", task_id));
        match self.send_checked(self.client.get(url)).await {
            Ok(response) => Ok(StatusQuery::Found(Self::read_json(response).await?)),
            Err(e) if e.is_http_not_found() => Ok(StatusQuery::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn list_upload_tasks(&self) -> Result<HashMap<String, UploadStatusInfo>> {
        let response = self
            .send_checked(self.client.get(self.url("/upload/tasks")))
            .await?;
        Self::read_json(response).await
    }

    async fn list_documents(&self) -> Result<Vec<String>> {
        let response = self
            .send_checked(self.client.get(self.url("/documents/")))
            .await?;
        let list: DocumentList = Self::read_json(response).await?;
        Ok(list.documents)
    }

    async fn delete_document(&self, filename: &str) -> Result<()> {
        self.send_checked(
            self.client
                .delete(self.url("/documents/"))
                .query(&[("filename", filename)]),
        )
        .await?;
        Ok(())
    }

    async fn trigger_ingest(&self) -> Result<String> {
        let response = self
            .send_checked(self.client.post(self.url("/documents/ingest")))
            .await?;
        let body: IngestResponse = Self::read_json(response).await?;
        Ok(body.message)
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn map_transport_error(err: reqwest::Error) -> RagDeskError {
    if err.is_decode() {
        return RagDeskError::Serialization {
            format: "HTTP body".to_string(),
            message: err.to_string(),
        };
    }
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    RagDeskError::network(format!("{}: {}", kind, err))
}

fn map_http_error(status: StatusCode, body: String) -> RagDeskError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| match wrapper.detail {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        })
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.clone()
            }
        });
    RagDeskError::http(status.as_u16(), message)
}
