//! Blocking JSON-over-HTTP plumbing shared by the host clients.

use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

const TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("git-mirror/", env!("CARGO_PKG_VERSION"));

/// How a host advertises the next page of a listing.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Pagination {
    /// RFC 8288 `Link: <...>; rel="next"` (GitHub).
    LinkHeader,
    /// `x-next-page: <n>` (GitLab).
    NextPageHeader,
}

pub(crate) struct ApiClient {
    client: Client,
    base: Url,
    host: &'static str,
}

impl ApiClient {
    pub(crate) fn new(host: &'static str, base: &str, headers: HeaderMap) -> Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| Error::host(host, e.to_string()))?;
        Ok(Self { client, base, host })
    }

    pub(crate) fn host(&self) -> &'static str {
        self.host
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.client.get(self.url(path)?).query(query);
        self.send(request)?
            .json()
            .map_err(|e| Error::host(self.host, e.to_string()))
    }

    /// Follow pagination until the host stops advertising a next page.
    pub(crate) fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        pagination: Pagination,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut request = self.client.get(self.url(path)?).query(query);
        loop {
            let response = self.send(request)?;
            let next = next_page(response.headers(), pagination);
            let page: Vec<T> = response
                .json()
                .map_err(|e| Error::host(self.host, e.to_string()))?;
            items.extend(page);
            request = match next {
                Some(NextPage::Url(url)) => self.client.get(url),
                Some(NextPage::Number(page)) => self
                    .client
                    .get(self.url(path)?)
                    .query(query)
                    .query(&[("page", page)]),
                None => return Ok(items),
            };
        }
    }

    pub(crate) fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.client.post(self.url(path)?).json(body);
        self.send(request)?
            .json()
            .map_err(|e| Error::host(self.host, e.to_string()))
    }

    pub(crate) fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.client.put(self.url(path)?).json(body);
        self.send(request).map(drop)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .map_err(|e| Error::host(self.host, e.to_string()))?;
        let status = response.status();
        debug!("{} {} -> {}", self.host, response.url(), status);
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().clone();
        let body = response.text().unwrap_or_default();
        Err(Error::host(
            self.host,
            format!("{} for {}: {}", status, url, truncate(&body, 200)),
        ))
    }
}

enum NextPage {
    Url(String),
    Number(String),
}

fn next_page(headers: &HeaderMap, pagination: Pagination) -> Option<NextPage> {
    match pagination {
        Pagination::LinkHeader => headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link)
            .map(NextPage::Url),
        Pagination::NextPageHeader => headers
            .get("x-next-page")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| NextPage::Number(v.to_string())),
    }
}

/// Extract the `rel="next"` target from a `Link` header.
pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().replace(' ', "") == "rel=\"next\"");
        is_next.then(|| {
            target
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    })
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
