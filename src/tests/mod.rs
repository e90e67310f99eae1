use super::*;

use std::cell::RefCell;
use std::rc::Rc;

mod navigation_and_history;
mod target_resolution;

fn mock_web(pages: &[(&str, &str)]) -> Result<MockFetcher> {
    let web = MockFetcher::new();
    for (url, html) in pages {
        web.set_page(url, html)?;
    }
    Ok(web)
}

fn browser_with(pages: &[(&str, &str)]) -> Result<(BrowserContext, MockFetcher)> {
    let web = mock_web(pages)?;
    Ok((BrowserContext::new(web.clone()), web))
}

/// Names of the windows whose `load` fired, in firing order.
fn loaded_names(events: &[WindowEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            WindowEvent::Loaded(load) => Some(load.name.clone()),
            _ => None,
        })
        .collect()
}

fn closed_windows(events: &[WindowEvent]) -> Vec<WindowId> {
    events
        .iter()
        .filter_map(|event| match event {
            WindowEvent::Closed { window } => Some(*window),
            _ => None,
        })
        .collect()
}

fn child_named(browser: &BrowserContext, parent: WindowId, name: &str) -> WindowId {
    let node = browser.window(parent).expect("parent window is open");
    node.children()
        .iter()
        .copied()
        .find(|child| browser.window(*child).is_some_and(|node| node.name() == name))
        .unwrap_or_else(|| panic!("no child named {name:?} under {parent}"))
}

fn url_of(browser: &BrowserContext, window: WindowId) -> String {
    browser
        .window(window)
        .map(|node| node.url().to_string())
        .unwrap_or_default()
}
