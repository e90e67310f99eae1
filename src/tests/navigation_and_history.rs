use super::*;

fn frameset_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "http://x/first",
            "<frameset><frame name='second' src='second'><frame name='third' src='third'></frameset>",
        ),
        (
            "http://x/second",
            "<frameset><frame name='inner' src='inner'></frameset>",
        ),
        ("http://x/third", "<p>third</p>"),
        ("http://x/inner", "<p>inner</p>"),
        ("http://x/plain", "<p>plain</p>"),
    ]
}

#[test]
fn navigating_top_level_window_cascades_frame_teardown() -> Result<()> {
    let (mut browser, _web) = browser_with(&frameset_pages())?;
    let top = browser.open_window("http://x/first")?;
    assert_eq!(browser.window_count(), 4);
    let second = child_named(&browser, top, "second");
    let inner = child_named(&browser, second, "inner");
    let third = child_named(&browser, top, "third");
    browser.take_window_events();

    browser.navigate(top, "http://x/plain")?;
    assert_eq!(browser.top_level_windows(), &[top]);
    assert_eq!(browser.window_count(), 1);
    assert_eq!(url_of(&browser, top), "http://x/plain");

    let events = browser.take_window_events();
    assert_eq!(closed_windows(&events), vec![inner, second, third]);
    assert_eq!(loaded_names(&events), vec![""]);
    Ok(())
}

#[test]
fn navigating_a_frame_replaces_only_its_subtree() -> Result<()> {
    let (mut browser, _web) = browser_with(&frameset_pages())?;
    let top = browser.open_window("http://x/first")?;
    let second = child_named(&browser, top, "second");
    browser.take_window_events();

    browser.navigate(second, "plain")?;
    assert_eq!(browser.window_count(), 3);
    assert_eq!(url_of(&browser, second), "http://x/plain");
    assert_eq!(
        browser.window(top).map(|node| node.children().to_vec()),
        Some(vec![second, child_named(&browser, top, "third")])
    );
    assert_eq!(loaded_names(&browser.take_window_events()), vec!["second"]);
    Ok(())
}

#[test]
fn relative_urls_resolve_against_base_href() -> Result<()> {
    let (mut browser, web) = browser_with(&[
        (
            "http://x/dir/page",
            "<head><base href='http://y/assets/'></head><iframe name='f' src='frame'></iframe>",
        ),
        ("http://y/assets/frame", "<p>frame</p>"),
        ("http://y/assets/next", "<p>next</p>"),
    ])?;

    let top = browser.open_window("http://x/dir/page")?;
    let frame = child_named(&browser, top, "f");
    assert_eq!(url_of(&browser, frame), "http://y/assets/frame");

    browser.navigate(top, "next")?;
    assert_eq!(url_of(&browser, top), "http://y/assets/next");
    assert_eq!(
        web.requested_urls(),
        vec!["http://x/dir/page", "http://y/assets/frame", "http://y/assets/next"]
    );
    Ok(())
}

#[test]
fn post_navigation_sends_body_and_referrer() -> Result<()> {
    let (mut browser, web) = browser_with(&[
        ("http://x/form", "<form></form>"),
        ("http://x/submit", "<p>thanks</p>"),
    ])?;

    let top = browser.open_window("http://x/form")?;
    web.take_calls();
    browser.navigate_with_post(top, "submit", "q=1")?;

    let calls = web.take_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, HttpMethod::Post);
    assert_eq!(calls[0].body.as_deref(), Some("q=1"));
    assert_eq!(
        calls[0].referrer.as_ref().map(Url::as_str),
        Some("http://x/form")
    );
    Ok(())
}

#[test]
fn fragment_navigation_does_not_fetch_or_fire_load() -> Result<()> {
    let (mut browser, web) = browser_with(&frameset_pages())?;
    let top = browser.open_window("http://x/first")?;
    web.take_calls();
    browser.take_window_events();

    browser.navigate(top, "#section")?;
    assert_eq!(url_of(&browser, top), "http://x/first#section");
    assert!(web.take_calls().is_empty());
    assert!(browser.take_window_events().is_empty());
    assert_eq!(browser.window_count(), 4);
    assert_eq!(browser.history_len(top)?, 2);
    Ok(())
}

#[test]
fn reload_refetches_and_rebuilds_frames() -> Result<()> {
    let (mut browser, web) = browser_with(&frameset_pages())?;
    let top = browser.open_window("http://x/first")?;
    let old_second = child_named(&browser, top, "second");
    web.take_calls();

    browser.reload(top)?;
    assert_eq!(
        web.requested_urls(),
        vec![
            "http://x/first",
            "http://x/second",
            "http://x/inner",
            "http://x/third"
        ]
    );
    assert!(!browser.is_open(old_second));
    assert_eq!(browser.window_count(), 4);
    assert_eq!(browser.history_len(top)?, 1);
    Ok(())
}

#[test]
fn session_history_traverses_back_and_forward() -> Result<()> {
    let (mut browser, _web) = browser_with(&[
        ("http://x/a", "<p>a</p>"),
        ("http://x/b", "<p>b</p>"),
        ("http://x/c", "<p>c</p>"),
    ])?;

    let top = browser.open_window("http://x/a")?;
    assert_eq!(browser.history_len(top)?, 1);
    browser.navigate(top, "b")?;
    browser.navigate(top, "c")?;
    assert_eq!(browser.history_len(top)?, 3);

    assert!(browser.go_back(top)?);
    assert_eq!(url_of(&browser, top), "http://x/b");
    assert!(browser.go_back(top)?);
    assert_eq!(url_of(&browser, top), "http://x/a");
    assert!(!browser.go_back(top)?);
    assert_eq!(browser.history_index(top)?, 0);

    assert!(browser.go_forward(top)?);
    assert_eq!(url_of(&browser, top), "http://x/b");

    browser.navigate(top, "a")?;
    assert_eq!(browser.history_len(top)?, 3);
    assert!(!browser.go_forward(top)?);
    Ok(())
}

#[test]
fn srcdoc_iframe_parses_inline_markup_without_fetch() -> Result<()> {
    let (mut browser, web) = browser_with(&[
        (
            "http://x/host",
            "<iframe name='inline' src='ignored' srcdoc=\"&lt;title&gt;inline&lt;/title&gt;&lt;iframe name='deep' src='deep'&gt;&lt;/iframe&gt;\"></iframe>",
        ),
        ("http://x/deep", "<p>deep</p>"),
    ])?;

    let top = browser.open_window("http://x/host")?;
    let inline = child_named(&browser, top, "inline");
    let document = browser.document(inline)?;
    assert_eq!(document.url().as_str(), "about:srcdoc");
    assert_eq!(document.base_url().as_str(), "http://x/host");
    assert_eq!(document.title(), "inline");

    let deep = child_named(&browser, inline, "deep");
    assert_eq!(url_of(&browser, deep), "http://x/deep");
    assert_eq!(web.requested_urls(), vec!["http://x/host", "http://x/deep"]);
    assert_eq!(
        loaded_names(&browser.take_window_events()),
        vec!["deep", "inline", ""]
    );
    Ok(())
}

#[test]
fn recursive_frame_src_gets_blank_document() -> Result<()> {
    let (mut browser, web) = browser_with(&[
        (
            "http://x/self",
            "<iframe name='again' src='self#frag'></iframe><iframe name='other' src='other'></iframe>",
        ),
        ("http://x/other", "<iframe name='back' src='self'></iframe>"),
    ])?;

    let top = browser.open_window("http://x/self")?;
    let again = child_named(&browser, top, "again");
    assert_eq!(browser.document(again)?.kind(), DocumentKind::Blank);
    let other = child_named(&browser, top, "other");
    let back = child_named(&browser, other, "back");
    assert_eq!(browser.document(back)?.kind(), DocumentKind::Blank);
    assert_eq!(web.requested_urls(), vec!["http://x/self", "http://x/other"]);
    Ok(())
}

#[test]
fn frames_deeper_than_max_depth_are_not_fetched() -> Result<()> {
    let (mut browser, web) = browser_with(&[
        ("http://x/a", "<iframe name='b' src='b'></iframe>"),
        ("http://x/b", "<iframe name='c' src='c'></iframe>"),
        ("http://x/c", "<p>c</p>"),
    ])?;
    browser.set_max_frame_depth(1);

    let top = browser.open_window("http://x/a")?;
    let b = child_named(&browser, top, "b");
    let c = child_named(&browser, b, "c");
    assert_eq!(browser.document(c)?.kind(), DocumentKind::Blank);
    assert_eq!(web.requested_urls(), vec!["http://x/a", "http://x/b"]);
    Ok(())
}

#[test]
fn javascript_frame_src_is_blank_without_fetch() -> Result<()> {
    let (mut browser, web) = browser_with(&[(
        "http://x/a",
        "<iframe name='js' src='javascript:void(0)'></iframe>",
    )])?;

    let top = browser.open_window("http://x/a")?;
    let js = child_named(&browser, top, "js");
    assert_eq!(url_of(&browser, js), "about:blank");
    assert_eq!(web.requested_urls(), vec!["http://x/a"]);
    Ok(())
}

#[test]
fn unparseable_markup_becomes_error_document() -> Result<()> {
    let (mut browser, _web) = browser_with(&[("http://x/broken", "<p>text<!-- never closed")])?;
    let top = browser.open_window("http://x/broken")?;
    let document = browser.document(top)?;
    assert_eq!(document.kind(), DocumentKind::Error);
    assert!(
        document
            .error_message()
            .is_some_and(|msg| msg.contains("unclosed HTML comment"))
    );
    assert_eq!(loaded_names(&browser.take_window_events()), vec![""]);
    Ok(())
}

#[test]
fn invalid_url_is_reported_to_the_caller() -> Result<()> {
    let (mut browser, _web) = browser_with(&[("http://x/a", "<p>a</p>")])?;
    assert!(matches!(
        browser.open_window("not a url"),
        Err(Error::InvalidUrl { .. })
    ));
    assert_eq!(browser.window_count(), 0);

    let top = browser.open_window("http://x/a")?;
    assert!(matches!(
        browser.navigate(top, "http://[bad"),
        Err(Error::InvalidUrl { .. })
    ));
    Ok(())
}

#[test]
fn closing_is_idempotent_and_cascades() -> Result<()> {
    let (mut browser, _web) = browser_with(&frameset_pages())?;
    let top = browser.open_window("http://x/first")?;
    let second = child_named(&browser, top, "second");

    assert_eq!(browser.close(second), 2);
    let after_first_close = browser.registry().windows();
    assert_eq!(browser.close(second), 0);
    assert_eq!(browser.registry().windows(), after_first_close);
    assert_eq!(browser.window_count(), 2);

    assert_eq!(browser.current_window(), Some(top));
    assert_eq!(browser.close(top), 2);
    assert_eq!(browser.current_window(), None);
    assert!(browser.top_level_windows().is_empty());
    assert!(matches!(browser.navigate(top, "plain"), Err(Error::WindowClosed(id)) if id == top));
    Ok(())
}

#[test]
fn close_client_leaves_no_windows() -> Result<()> {
    let (mut browser, _web) = browser_with(&frameset_pages())?;
    browser.open_window("http://x/first")?;
    browser.open_window("http://x/plain")?;
    assert_eq!(browser.window_count(), 5);

    assert_eq!(browser.close_client(), 5);
    assert_eq!(browser.window_count(), 0);
    assert!(browser.top_level_windows().is_empty());
    assert_eq!(browser.current_window(), None);
    assert!(browser.pending_refreshes().is_empty());
    Ok(())
}

#[test]
fn newly_opened_window_becomes_current() -> Result<()> {
    let (mut browser, _web) = browser_with(&[("http://x/a", "<p>a</p>"), ("http://x/b", "<p>b</p>")])?;
    let a = browser.open_window("http://x/a")?;
    let b = browser.open_window("http://x/b")?;
    assert_eq!(browser.current_window(), Some(b));

    browser.set_current_window(a)?;
    assert_eq!(browser.current_window(), Some(a));
    browser.close(b);
    assert_eq!(browser.current_window(), Some(a));
    assert!(matches!(browser.set_current_window(b), Err(Error::WindowClosed(_))));
    Ok(())
}

#[test]
fn data_urls_load_as_unsupported_scheme_errors() -> Result<()> {
    let (mut browser, web) = browser_with(&[])?;
    let top = browser.open_window("data:text/html,<p>inline</p>")?;

    let document = browser.document(top)?;
    assert_eq!(document.kind(), DocumentKind::Error);
    assert!(document.error_message().is_some_and(|message| message.contains("data")));
    assert_eq!(web.requested_urls().len(), 1);

    let mut fetcher = web.clone();
    let url = Url::parse("data:text/plain,x").expect("url");
    assert!(matches!(
        fetcher.fetch(&FetchRequest::get(url)),
        Err(FetchError::UnsupportedScheme(scheme)) if scheme == "data"
    ));
    Ok(())
}
