use super::*;

use std::sync::LazyLock;

static ABOUT_BLANK: LazyLock<Url> =
    LazyLock::new(|| Url::parse("about:blank").expect("about:blank is a valid url"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Vacuous document of `about:blank`, frames without `src` and frames that
    /// were not allowed to load.
    Blank,
    Html,
    /// Placeholder attached when the fetch or the parse failed.
    Error,
}

/// A `<frame>` or `<iframe>` declared by a document, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDeclaration {
    pub name: String,
    pub src: Option<String>,
    pub srcdoc: Option<String>,
}

impl FrameDeclaration {
    pub fn new(name: &str, src: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            src: src.map(str::to_string),
            srcdoc: None,
        }
    }

    /// `src` when it names something to fetch; empty and missing values load
    /// a blank document.
    pub fn effective_src(&self) -> Option<&str> {
        self.src
            .as_deref()
            .map(str::trim)
            .filter(|src| !src.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    url: Url,
    base_url: Url,
    kind: DocumentKind,
    status: Option<u16>,
    title: String,
    frames: Vec<FrameDeclaration>,
    meta_refresh: Vec<String>,
    header_refresh: Option<String>,
    error: Option<String>,
}

impl Document {
    pub fn new(url: Url) -> Self {
        Self {
            base_url: url.clone(),
            url,
            kind: DocumentKind::Html,
            status: None,
            title: String::new(),
            frames: Vec::new(),
            meta_refresh: Vec::new(),
            header_refresh: None,
            error: None,
        }
    }

    pub fn blank(url: Url) -> Self {
        Self {
            kind: DocumentKind::Blank,
            ..Self::new(url)
        }
    }

    pub fn error(url: Url, message: &str) -> Self {
        Self {
            kind: DocumentKind::Error,
            error: Some(message.to_string()),
            ..Self::new(url)
        }
    }

    pub fn about_blank_url() -> Url {
        ABOUT_BLANK.clone()
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_frame(mut self, frame: FrameDeclaration) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn with_meta_refresh(mut self, content: &str) -> Self {
        self.meta_refresh.push(content.to_string());
        self
    }

    pub fn with_header_refresh(mut self, value: &str) -> Self {
        self.header_refresh = Some(value.to_string());
        self
    }

    pub(crate) fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    pub(crate) fn set_header_refresh(&mut self, value: Option<String>) {
        self.header_refresh = value;
    }

    pub(crate) fn set_fragment(&mut self, fragment: Option<&str>) {
        self.url.set_fragment(fragment);
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Base for resolving relative references: `<base href>` when present,
    /// otherwise the document URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn frame_declarations(&self) -> &[FrameDeclaration] {
        &self.frames
    }

    /// Every refresh directive carried by the document: the HTTP `Refresh`
    /// header first, then `<meta http-equiv=refresh>` values in document order.
    pub fn refresh_directives(&self) -> Vec<&str> {
        self.header_refresh
            .iter()
            .chain(self.meta_refresh.iter())
            .map(String::as_str)
            .collect()
    }

    /// The directive that gets scheduled. A `Refresh` header shadows every
    /// meta tag; otherwise the first meta tag wins.
    pub fn effective_refresh(&self) -> Option<&str> {
        self.header_refresh
            .as_deref()
            .or_else(|| self.meta_refresh.first().map(String::as_str))
    }
}
