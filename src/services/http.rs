//! HTTP client service seam backing `Request` (spec.md §4.D Source-read family).

use std::collections::HashMap;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

#[async_trait::async_trait]
pub trait HttpClientService: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<String>,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse>;
}

pub struct ReqwestHttpClientService {
    client: reqwest::Client,
}

impl ReqwestHttpClientService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestHttpClientService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HttpClientService for ReqwestHttpClientService {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<String>,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse> {
        let mut builder = self.client.request(method.as_reqwest(), url);
        for (k, v) in headers {
            builder = builder.header(k, v);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response.text().await?;
        Ok(HttpResponse { status, body, headers })
    }
}
