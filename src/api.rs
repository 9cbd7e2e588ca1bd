// ABOUTME: Blocking HTTP client for the Memos v1 REST API
// ABOUTME: Handles auth headers, endpoint resolution, pagination and typed errors

use crate::{Error, Result, UserRecord};
use reqwest::blocking::Client;
use reqwest::{Method, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(host: &str, token: String, timeout: Duration) -> Result<Self> {
        let base_url = parse_host(host)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("memos-export/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ApiClient {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint)
            .map_err(|e| Error::Validation(format!("cannot resolve {}: {}", endpoint, e)))
    }

    fn file_url(&self, attachment_name: &str, filename: &str) -> Result<Url> {
        let mut url = self.url("/file")?;
        url.path_segments_mut()
            .map_err(|_| Error::Validation(format!("cannot build file URL on {}", self.base_url)))?
            .extend(attachment_name.split('/'))
            .push(filename);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    /// Sends one request and decodes the JSON body. A 2xx body that is not
    /// JSON, including an empty one, is a decode error.
    pub fn call(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        self.call_url(method, self.url(endpoint)?, body)
    }

    fn call_url(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value> {
        let endpoint = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let endpoint = endpoint.as_str();
        debug!(%method, endpoint, "api call");

        let mut request = self.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(Error::Http {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                message: truncate_str(&message, 100),
            });
        }

        let text = response.text()?;
        serde_json::from_str(&text).map_err(|source| {
            debug!(endpoint, body = %truncate_str(&text, 500), "undecodable response");
            Error::Decode {
                endpoint: endpoint.into(),
                source,
            }
        })
    }

    fn get(&self, endpoint: &str) -> Result<Value> {
        self.call(Method::GET, endpoint, None)
    }

    pub fn current_user(&self) -> Result<UserRecord> {
        let session = self.get("/api/v1/auth/sessions/current")?;
        Ok(UserRecord::from_session(&session))
    }

    /// Walks every page of the memo list. Any failed page aborts the listing.
    pub fn list_memos(&self, page_size: u32) -> Result<Vec<Value>> {
        let mut all = Vec::new();
        let mut page_token = String::new();

        loop {
            let url = self.memos_page_url(page_size, &page_token)?;
            let mut page = self.call_url(Method::GET, url, None)?;
            match page.get_mut("memos").map(Value::take) {
                Some(Value::Array(memos)) => {
                    info!(fetched = memos.len(), total = all.len() + memos.len(), "fetched memo page");
                    all.extend(memos);
                }
                None => {
                    info!(fetched = 0, total = all.len(), "fetched memo page");
                }
                Some(other) => {
                    return Err(Error::Malformed(format!(
                        "memos page should hold a list, got {}",
                        crate::model::type_name(&other)
                    )));
                }
            }

            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if page_token.is_empty() {
                break;
            }
        }

        Ok(all)
    }

    fn memos_page_url(&self, page_size: u32, page_token: &str) -> Result<Url> {
        let mut url = self.url("/api/v1/memos")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &page_size.to_string());
            if !page_token.is_empty() {
                query.append_pair("pageToken", page_token);
            }
        }
        Ok(url)
    }

    pub fn get_memo(&self, memo_name: &str) -> Result<Value> {
        let mut response = self.get(&format!("/api/v1/{}", memo_name))?;
        if let Some(memo) = response.get_mut("memo") {
            return Ok(memo.take());
        }
        Ok(response)
    }

    /// Returns the raw `attachments` value; shape checks are left to the caller.
    pub fn list_attachments(&self, memo_name: &str) -> Result<Value> {
        let mut response = self.get(&format!("/api/v1/{}/attachments", memo_name))?;
        Ok(response
            .get_mut("attachments")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Downloads an attachment body in one buffer.
    pub fn download(&self, attachment_name: &str, filename: &str) -> Result<Vec<u8>> {
        let url = self.file_url(attachment_name, filename)?;
        let endpoint = url.path().to_string();
        let response = self.request(Method::GET, url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                endpoint,
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().into(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}

/// Checks the scheme and parses the host into a join base.
pub fn parse_host(host: &str) -> Result<Url> {
    if !(host.starts_with("http://") || host.starts_with("https://")) {
        return Err(Error::Validation(
            "host must start with http:// or https://".into(),
        ));
    }
    Url::parse(host).map_err(|e| Error::Validation(format!("invalid host {}: {}", host, e)))
}
