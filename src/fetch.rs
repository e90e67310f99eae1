use std::cell::RefCell;
use std::rc::Rc;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub body: Option<String>,
    pub referrer: Option<Url>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: HttpMethod::Get,
            body: None,
            referrer: None,
        }
    }

    pub fn post(url: Url, body: &str) -> Self {
        Self {
            url,
            method: HttpMethod::Post,
            body: Some(body.to_string()),
            referrer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL of the response; the document is attached under this URL.
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FetchResponse {
    pub fn html(url: Url, body: &str) -> Self {
        Self {
            url,
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// First header with that name, compared ASCII case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("unknown host: {0}")]
    UnknownHost(String),
}

/// Network collaborator: turns a request into response bytes and headers.
pub trait Fetcher {
    fn fetch(&mut self, request: &FetchRequest) -> std::result::Result<FetchResponse, FetchError>;
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, FetchResponse>,
    failures: HashMap<String, FetchError>,
    calls: Vec<FetchRequest>,
}

/// In-memory [`Fetcher`] serving registered pages.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// [`BrowserContext`] and keep registering pages or inspecting calls.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    state: Rc<RefCell<MockState>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an HTML page answered with status 200.
    pub fn set_page(&self, url: &str, html: &str) -> Result<()> {
        let url = parse_absolute_url(url)?;
        self.set_response(FetchResponse::html(url, html));
        Ok(())
    }

    pub fn set_response(&self, response: FetchResponse) {
        let key = mock_key(&response.url);
        let mut state = self.state.borrow_mut();
        state.failures.remove(&key);
        state.responses.insert(key, response);
    }

    pub fn set_failure(&self, url: &str, error: FetchError) -> Result<()> {
        let key = mock_key(&parse_absolute_url(url)?);
        let mut state = self.state.borrow_mut();
        state.responses.remove(&key);
        state.failures.insert(key, error);
        Ok(())
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.responses.clear();
        state.failures.clear();
    }

    pub fn take_calls(&self) -> Vec<FetchRequest> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    /// Fetched URLs in request order, without draining the call log.
    pub fn requested_urls(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .map(|call| call.url.to_string())
            .collect()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&mut self, request: &FetchRequest) -> std::result::Result<FetchResponse, FetchError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(request.clone());
        if !matches!(request.url.scheme(), "http" | "https" | "file") {
            return Err(FetchError::UnsupportedScheme(request.url.scheme().to_string()));
        }
        let key = mock_key(&request.url);
        if let Some(error) = state.failures.get(&key) {
            return Err(error.clone());
        }
        if let Some(response) = state.responses.get(&key) {
            let mut response = response.clone();
            if response.url.fragment().is_none() && request.url.fragment().is_some() {
                response.url.set_fragment(request.url.fragment());
            }
            return Ok(response);
        }
        Ok(FetchResponse {
            url: request.url.clone(),
            status: 404,
            headers: Vec::new(),
            body: String::new(),
        })
    }
}

fn mock_key(url: &Url) -> String {
    without_fragment(url).to_string()
}
