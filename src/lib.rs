//! Deterministic window/frame lifecycle and navigation engine.
//!
//! A [`BrowserContext`] owns every live browsing context (top-level windows,
//! frames and iframes), loads documents into them through a [`Fetcher`] and a
//! [`Parser`], serializes `load` notifications across frame trees, and runs
//! meta-refresh / HTTP `Refresh` redirects on a logical clock.
//!
//! ```no_run
//! use frame_nav::{BrowserContext, MockFetcher, WindowEvent};
//!
//! # fn main() -> frame_nav::Result<()> {
//! let web = MockFetcher::new();
//! web.set_page(
//!     "http://x/first",
//!     "<frameset><frame name='second' src='second'><frame name='third' src='third'></frameset>",
//! )?;
//! web.set_page("http://x/second", "<p>second</p>")?;
//! web.set_page("http://x/third", "<p>third</p>")?;
//!
//! let mut browser = BrowserContext::new(web);
//! let top = browser.open_window("http://x/first")?;
//! assert_eq!(browser.window_count(), 3);
//! let loads = browser
//!     .take_window_events()
//!     .into_iter()
//!     .filter_map(|event| match event {
//!         WindowEvent::Loaded(load) => Some(load.name),
//!         _ => None,
//!     })
//!     .collect::<Vec<_>>();
//! assert_eq!(loads, vec!["second", "third", ""]);
//! # let _ = top;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use url::Url;

mod browser;
mod config;
mod document;
mod events;
mod fetch;
mod html;
mod navigation;
mod refresh;
mod target;
mod trace;
mod window;

pub use browser::BrowserContext;
pub use config::{EngineConfig, TraceConfig};
pub use document::{Document, DocumentKind, FrameDeclaration};
pub use events::{LoadEvent, ScriptActions, WindowEvent};
pub use fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, HttpMethod, MockFetcher};
pub use html::{HtmlParser, Parser};
pub use navigation::NavigationKind;
pub use refresh::{PendingRefresh, RefreshDirective, RefreshPolicy};
pub use target::TargetResolution;
pub use window::{WindowId, WindowNode, WindowRegistry};

use events::{EventOrderCoordinator, ScriptRequest};
use navigation::{NavigationRequest, WorkItem};
use refresh::RefreshScheduler;
use trace::TraceState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid url {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("{0} is closed")]
    WindowClosed(WindowId),
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error(
        "run exceeded max steps (possible refresh loop): limit={limit}, queued_work={queued_work}, pending_refreshes={pending_refreshes}"
    )]
    StepLimitExceeded {
        limit: usize,
        queued_work: usize,
        pending_refreshes: usize,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Strips the fragment so two URLs can be compared as the same resource.
fn without_fragment(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_fragment(None);
    stripped
}

fn parse_absolute_url(input: &str) -> Result<Url> {
    Url::parse(input.trim()).map_err(|err| Error::InvalidUrl {
        input: input.to_string(),
        reason: err.to_string(),
    })
}

fn resolve_url(base: &Url, input: &str) -> Result<Url> {
    base.join(input.trim()).map_err(|err| Error::InvalidUrl {
        input: input.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests;
