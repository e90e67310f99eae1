use super::*;

fn left_right_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "http://x/top",
            "<frameset><frame name='left' src='left'><frame name='right' src='right'></frameset>",
        ),
        (
            "http://x/left",
            "<frameset><frame name='right' src='inner'></frameset>",
        ),
        ("http://x/right", "<p>right</p>"),
        ("http://x/inner", "<p>inner</p>"),
        ("http://x/target", "<p>target</p>"),
    ]
}

#[test]
fn link_inside_left_targets_its_own_nested_right() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    let left = child_named(&browser, top, "left");
    let inner_right = child_named(&browser, left, "right");
    let sibling_right = child_named(&browser, top, "right");

    let navigated = browser.follow_link(left, "target", "right")?;
    assert_eq!(navigated, inner_right);
    assert_eq!(url_of(&browser, inner_right), "http://x/target");
    assert_eq!(url_of(&browser, sibling_right), "http://x/right");
    Ok(())
}

#[test]
fn link_from_sibling_subtree_finds_name_through_ancestor() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    let sibling_right = child_named(&browser, top, "right");
    let left = child_named(&browser, top, "left");

    assert_eq!(
        browser.resolve_target(sibling_right, "left")?,
        TargetResolution::Existing(left)
    );
    assert_eq!(browser.lookup_by_name(sibling_right, "right"), Some(sibling_right));
    Ok(())
}

#[test]
fn keyword_targets_resolve_relative_to_source() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    let left = child_named(&browser, top, "left");
    let inner = child_named(&browser, left, "right");

    assert_eq!(browser.resolve_target(inner, "")?, TargetResolution::Existing(inner));
    assert_eq!(browser.resolve_target(inner, "_self")?, TargetResolution::Existing(inner));
    assert_eq!(browser.resolve_target(inner, "_PARENT")?, TargetResolution::Existing(left));
    assert_eq!(browser.resolve_target(inner, "_top")?, TargetResolution::Existing(top));
    assert_eq!(browser.resolve_target(top, "_parent")?, TargetResolution::Existing(top));
    assert_eq!(
        browser.resolve_target(inner, "_Blank")?,
        TargetResolution::NewWindow {
            name: String::new()
        }
    );
    assert_eq!(
        browser.resolve_target(inner, "nowhere")?,
        TargetResolution::NewWindow {
            name: "nowhere".into()
        }
    );
    Ok(())
}

#[test]
fn following_link_to_top_replaces_whole_tree() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    let left = child_named(&browser, top, "left");
    let inner = child_named(&browser, left, "right");

    assert_eq!(browser.follow_link(inner, "target", "_top")?, top);
    assert_eq!(browser.window_count(), 1);
    assert_eq!(url_of(&browser, top), "http://x/target");
    Ok(())
}

#[test]
fn unknown_target_opens_named_top_level_window_with_opener() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    let left = child_named(&browser, top, "left");

    let popup = browser.follow_link(left, "target", "popup")?;
    assert_eq!(browser.top_level_windows(), &[top, popup]);
    let node = browser.window(popup).expect("popup is open");
    assert_eq!(node.name(), "popup");
    assert_eq!(node.opener(), Some(left));
    assert_eq!(node.url().as_str(), "http://x/target");
    assert_eq!(browser.current_window(), Some(popup));

    assert_eq!(browser.follow_link(left, "right", "popup")?, popup);
    assert_eq!(browser.top_level_windows().len(), 2);
    assert_eq!(url_of(&browser, popup), "http://x/right");

    browser.close(top);
    assert_eq!(browser.window(popup).and_then(WindowNode::opener), None);
    Ok(())
}

#[test]
fn blank_target_always_opens_a_fresh_window() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;

    let first = browser.follow_link(top, "target", "_blank")?;
    let second = browser.follow_link(top, "target", "_blank")?;
    assert_ne!(first, second);
    assert_eq!(browser.top_level_windows(), &[top, first, second]);
    assert_eq!(browser.window(first).map(WindowNode::name), Some(""));
    Ok(())
}

#[test]
fn open_named_reuses_existing_window_by_name() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    let left = child_named(&browser, top, "left");
    let sibling_right = child_named(&browser, top, "right");

    assert_eq!(browser.open_named(sibling_right, "left", "target")?, left);
    assert_eq!(url_of(&browser, left), "http://x/target");

    let popup = browser.open_named(top, "popup", "http://x/right")?;
    assert_eq!(browser.window(popup).and_then(WindowNode::opener), Some(top));
    assert_eq!(browser.open_window_named("popup", "http://x/target")?, popup);
    assert_eq!(url_of(&browser, popup), "http://x/target");

    let fresh = browser.open_window_named("elsewhere", "http://x/right")?;
    assert_eq!(browser.window(fresh).and_then(WindowNode::opener), None);
    assert_eq!(browser.window(fresh).map(WindowNode::name), Some("elsewhere"));
    Ok(())
}

#[test]
fn renamed_window_is_found_under_its_new_name() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    let sibling_right = child_named(&browser, top, "right");

    browser.set_window_name(sibling_right, "renamed")?;
    assert_eq!(browser.lookup_by_name(top, "renamed"), Some(sibling_right));
    Ok(())
}

#[test]
fn resolving_from_closed_window_is_an_error() -> Result<()> {
    let (mut browser, _web) = browser_with(&left_right_pages())?;
    let top = browser.open_window("http://x/top")?;
    browser.close(top);
    assert!(matches!(
        browser.resolve_target(top, "_self"),
        Err(Error::WindowClosed(id)) if id == top
    ));
    assert!(browser.follow_link(top, "target", "").is_err());
    Ok(())
}
