use super::*;

/// Outcome of resolving a link/form `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    Existing(WindowId),
    /// Nothing matched; a new top-level window with this name should be
    /// opened (`""` for `_blank`).
    NewWindow { name: String },
}

impl BrowserContext {
    /// Resolves `target` as written on a link or form inside `source`.
    ///
    /// `""` and `_self` are the source itself, `_parent` its parent (or itself
    /// at the top), `_top` the top-level window and `_blank` always a new
    /// window. Keywords compare ASCII case-insensitively; anything else is a
    /// browsing-context name looked up from `source`.
    pub fn resolve_target(&self, source: WindowId, target: &str) -> Result<TargetResolution> {
        let node = self.registry.get(source).ok_or(Error::WindowClosed(source))?;
        let target = target.trim();

        if target.is_empty() || target.eq_ignore_ascii_case("_self") {
            return Ok(TargetResolution::Existing(source));
        }
        if target.eq_ignore_ascii_case("_parent") {
            return Ok(TargetResolution::Existing(node.parent.unwrap_or(source)));
        }
        if target.eq_ignore_ascii_case("_top") {
            let top = self.registry.top_of(source).unwrap_or(source);
            return Ok(TargetResolution::Existing(top));
        }
        if target.eq_ignore_ascii_case("_blank") {
            return Ok(TargetResolution::NewWindow {
                name: String::new(),
            });
        }

        Ok(match self.registry.lookup_by_name(source, target) {
            Some(found) => TargetResolution::Existing(found),
            None => TargetResolution::NewWindow {
                name: target.to_string(),
            },
        })
    }

    pub fn lookup_by_name(&self, scope: WindowId, name: &str) -> Option<WindowId> {
        self.registry.lookup_by_name(scope, name)
    }

    /// Follows a link in `source`: `href` resolves against the source
    /// document's base URL, `target` picks the window. Returns the window that
    /// ends up navigating.
    pub fn follow_link(&mut self, source: WindowId, href: &str, target: &str) -> Result<WindowId> {
        let request = self.follow_link_request(source, href, target)?;
        self.run_request(request)
    }

    /// Opens `url` in the window named `name` as seen from `scope`, or in a new
    /// top-level window with that name when none exists. `url` resolves
    /// against the scope's document.
    pub fn open_named(&mut self, scope: WindowId, name: &str, url: &str) -> Result<WindowId> {
        let request = self.open_named_request(Some(scope), name, url)?;
        self.run_request(request)
    }

    /// [`Self::open_named`] without a scope: the name is looked up across every
    /// top-level tree.
    pub fn open_window_named(&mut self, name: &str, url: &str) -> Result<WindowId> {
        let request = self.open_named_request(None, name, url)?;
        self.run_request(request)
    }

    fn run_request(&mut self, request: NavigationRequest) -> Result<WindowId> {
        let window = request.window;
        self.enqueue(WorkItem::Navigate(request));
        self.run_until_idle()?;
        Ok(window)
    }

    pub(crate) fn follow_link_request(
        &mut self,
        source: WindowId,
        href: &str,
        target: &str,
    ) -> Result<NavigationRequest> {
        let url = self.resolve_for_window(source, href)?;
        let resolution = self.resolve_target(source, target)?;
        self.trace_navigation_line(format!(
            "[nav] link source={} href={:?} target={:?} resolved={:?}",
            source, href, target, resolution
        ));
        let window = match resolution {
            TargetResolution::Existing(window) => window,
            TargetResolution::NewWindow { name } => self.create_top_level(&name, Some(source)),
        };
        Ok(NavigationRequest {
            window,
            url,
            post_data: None,
            kind: NavigationKind::Assign,
        })
    }

    pub(crate) fn open_named_request(
        &mut self,
        scope: Option<WindowId>,
        name: &str,
        url: &str,
    ) -> Result<NavigationRequest> {
        let url = match scope {
            Some(scope) => self.resolve_for_window(scope, url)?,
            None => parse_absolute_url(url)?,
        };
        let resolution = match scope {
            Some(scope) => self.resolve_target(scope, name)?,
            None => match self.registry.lookup_globally(name) {
                Some(found) => TargetResolution::Existing(found),
                None if name.eq_ignore_ascii_case("_blank") => TargetResolution::NewWindow {
                    name: String::new(),
                },
                None => TargetResolution::NewWindow {
                    name: name.to_string(),
                },
            },
        };
        let window = match resolution {
            TargetResolution::Existing(window) => window,
            TargetResolution::NewWindow { name } => self.create_top_level(&name, scope),
        };
        Ok(NavigationRequest {
            window,
            url,
            post_data: None,
            kind: NavigationKind::Assign,
        })
    }
}
