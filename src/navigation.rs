use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Ordinary navigation; pushes a history entry.
    Assign,
    Replace,
    Reload,
    /// Fired meta-refresh / `Refresh` header; replaces the current entry.
    Refresh,
    /// Back/forward; the history index has already moved.
    Traverse,
    /// Initial load of a frame declared by its parent's document.
    Frame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NavigationRequest {
    pub(crate) window: WindowId,
    pub(crate) url: Url,
    pub(crate) post_data: Option<String>,
    pub(crate) kind: NavigationKind,
}

#[derive(Debug)]
pub(crate) enum WorkItem {
    Navigate(NavigationRequest),
    Script(ScriptRequest),
}

enum DocumentSource {
    Fetch {
        url: Url,
        post_data: Option<String>,
    },
    Ready(Document),
}

#[derive(Debug, Clone)]
pub(crate) struct SessionHistory {
    entries: Vec<Url>,
    index: usize,
    /// The entry is the initial `about:blank`, which the first navigation
    /// replaces instead of pushing after.
    initial: bool,
}

impl SessionHistory {
    pub(crate) fn new(url: &Url) -> Self {
        Self {
            entries: vec![url.clone()],
            index: 0,
            initial: true,
        }
    }

    fn push(&mut self, url: &Url) {
        if self.initial {
            self.replace(url);
            return;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(url.clone());
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, url: &Url) {
        self.initial = false;
        if let Some(entry) = self.entries.get_mut(self.index) {
            *entry = url.clone();
        }
    }

    fn go(&mut self, delta: isize) -> Option<Url> {
        let target = self.index.checked_add_signed(delta)?;
        let url = self.entries.get(target)?.clone();
        self.index = target;
        Some(url)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

impl BrowserContext {
    /// Loads `url` into `window`; relative URLs resolve against the window's
    /// current document. Returns once the engine is idle again.
    pub fn navigate(&mut self, window: WindowId, url: &str) -> Result<()> {
        let url = self.resolve_for_window(window, url)?;
        self.enqueue_navigation(window, url, None, NavigationKind::Assign);
        self.run_until_idle()
    }

    /// Like [`Self::navigate`], submitting `post_data` as a POST body.
    pub fn navigate_with_post(&mut self, window: WindowId, url: &str, post_data: &str) -> Result<()> {
        let url = self.resolve_for_window(window, url)?;
        self.enqueue_navigation(
            window,
            url,
            Some(post_data.to_string()),
            NavigationKind::Assign,
        );
        self.run_until_idle()
    }

    pub fn reload(&mut self, window: WindowId) -> Result<()> {
        let node = self.registry.get(window).ok_or(Error::WindowClosed(window))?;
        let url = node.document.url().clone();
        self.enqueue_navigation(window, url, None, NavigationKind::Reload);
        self.run_until_idle()
    }

    pub fn go_back(&mut self, window: WindowId) -> Result<bool> {
        self.traverse_history(window, -1)
    }

    pub fn go_forward(&mut self, window: WindowId) -> Result<bool> {
        self.traverse_history(window, 1)
    }

    pub fn history_len(&self, window: WindowId) -> Result<usize> {
        let node = self.registry.get(window).ok_or(Error::WindowClosed(window))?;
        Ok(node.history.len())
    }

    pub fn history_index(&self, window: WindowId) -> Result<usize> {
        let node = self.registry.get(window).ok_or(Error::WindowClosed(window))?;
        Ok(node.history.index())
    }

    fn traverse_history(&mut self, window: WindowId, delta: isize) -> Result<bool> {
        let node = self
            .registry
            .get_mut(window)
            .ok_or(Error::WindowClosed(window))?;
        let Some(url) = node.history.go(delta) else {
            return Ok(false);
        };
        self.enqueue_navigation(window, url, None, NavigationKind::Traverse);
        self.run_until_idle()?;
        Ok(true)
    }

    pub(crate) fn resolve_for_window(&self, window: WindowId, input: &str) -> Result<Url> {
        let node = self.registry.get(window).ok_or(Error::WindowClosed(window))?;
        resolve_url(node.document.base_url(), input)
    }

    pub(crate) fn enqueue_navigation(
        &mut self,
        window: WindowId,
        url: Url,
        post_data: Option<String>,
        kind: NavigationKind,
    ) {
        self.enqueue(WorkItem::Navigate(NavigationRequest {
            window,
            url,
            post_data,
            kind,
        }));
    }

    pub(crate) fn enqueue(&mut self, item: WorkItem) {
        self.work_queue.push_back(item);
    }

    /// Drains the work queue, releasing `load` notifications whenever no work
    /// is queued, until nothing is left to do.
    pub(crate) fn run_until_idle(&mut self) -> Result<()> {
        let mut steps = 0usize;
        loop {
            if let Some(item) = self.work_queue.pop_front() {
                steps += 1;
                if steps > self.config.step_limit {
                    self.work_queue.push_front(item);
                    return Err(self.step_limit_error());
                }
                self.perform(item);
                continue;
            }

            if let Some(window) = self.coordinator.next_releasable(&self.registry) {
                steps += 1;
                if steps > self.config.step_limit {
                    return Err(self.step_limit_error());
                }
                self.release_load(window);
                continue;
            }

            if self.config.refresh_policy == RefreshPolicy::Immediate
                && self.fire_next_immediate_refresh()
            {
                steps += 1;
                if steps > self.config.step_limit {
                    return Err(self.step_limit_error());
                }
                continue;
            }

            return Ok(());
        }
    }

    pub(crate) fn step_limit_error(&self) -> Error {
        Error::StepLimitExceeded {
            limit: self.config.step_limit,
            queued_work: self.work_queue.len(),
            pending_refreshes: self.scheduler.len(),
        }
    }

    fn perform(&mut self, item: WorkItem) {
        match item {
            WorkItem::Navigate(request) => self.perform_navigation(request),
            WorkItem::Script(request) => {
                let summary = format!("{request:?}");
                if let Err(err) = self.perform_script_request(request) {
                    tracing::debug!(target: "frame_nav", error = %err, "script request failed");
                    self.trace_navigation_line(format!(
                        "[nav] script-request-failed request={} error={}",
                        summary, err
                    ));
                }
            }
        }
    }

    fn perform_script_request(&mut self, request: ScriptRequest) -> Result<()> {
        match request {
            ScriptRequest::Navigate { window, url } => {
                let url = self.resolve_for_window(window, &url)?;
                self.perform_navigation(NavigationRequest {
                    window,
                    url,
                    post_data: None,
                    kind: NavigationKind::Assign,
                });
            }
            ScriptRequest::Close { window } => {
                self.destroy_subtree(window);
            }
            ScriptRequest::OpenNamed { scope, name, url } => {
                let request = self.open_named_request(Some(scope), &name, &url)?;
                self.perform_navigation(request);
            }
            ScriptRequest::FollowLink {
                source,
                href,
                target,
            } => {
                let request = self.follow_link_request(source, &href, &target)?;
                self.perform_navigation(request);
            }
        }
        Ok(())
    }

    fn perform_navigation(&mut self, request: NavigationRequest) {
        let NavigationRequest {
            window,
            url,
            post_data,
            kind,
        } = request;
        self.load_into_window(window, DocumentSource::Fetch { url, post_data }, kind);
    }

    /// Steps of a navigation: cancel the pending refresh, fetch and parse,
    /// tear down the old frame subtree, attach, load declared frames
    /// depth-first, then arm the new document's refresh. The `load` itself is
    /// released later by the idle loop. Fragment-only navigations stop right
    /// after the refresh is cancelled.
    fn load_into_window(&mut self, window: WindowId, source: DocumentSource, kind: NavigationKind) {
        let Some(node) = self.registry.get(window) else {
            self.trace_navigation_line(format!("[nav] dropped window={} reason=closed", window));
            return;
        };
        let from = node.document.url().clone();

        let document = match source {
            DocumentSource::Fetch { url, post_data } => {
                self.trace_navigation_line(format!(
                    "[nav] start window={} kind={:?} from={} to={}",
                    window, kind, from, url
                ));
                self.cancel_refresh(window);
                if post_data.is_none() && self.navigate_to_fragment(window, &from, &url, kind) {
                    return;
                }
                self.load_document(&url, post_data.as_deref(), Some(from))
            }
            DocumentSource::Ready(document) => {
                self.cancel_refresh(window);
                document
            }
        };

        self.teardown_children(window);

        let coalesced = !self.coordinator.mark_pending(window);
        let Some(node) = self.registry.get_mut(window) else {
            return;
        };
        match kind {
            NavigationKind::Assign | NavigationKind::Frame => node.history.push(document.url()),
            NavigationKind::Replace | NavigationKind::Refresh | NavigationKind::Reload => {
                node.history.replace(document.url())
            }
            NavigationKind::Traverse => {}
        }
        node.document = document;
        let attached_url = node.document.url().clone();
        let frame_count = node.document.frame_declarations().len();
        self.trace_navigation_line(format!(
            "[nav] attach window={} url={} frames={} coalesced={}",
            window, attached_url, frame_count, coalesced
        ));
        tracing::debug!(target: "frame_nav", %window, url = %attached_url, frames = frame_count, "document attached");

        self.spawn_frames(window);
        self.arm_document_refresh(window);
    }

    /// Same-document navigation: only the fragment changes, nothing is
    /// fetched and no `load` fires.
    fn navigate_to_fragment(
        &mut self,
        window: WindowId,
        from: &Url,
        to: &Url,
        kind: NavigationKind,
    ) -> bool {
        let same_document_kind = matches!(
            kind,
            NavigationKind::Assign | NavigationKind::Replace | NavigationKind::Traverse
        );
        if !same_document_kind
            || to.fragment().is_none()
            || from.scheme() == "about"
            || without_fragment(from) != without_fragment(to)
        {
            return false;
        }
        let Some(node) = self.registry.get_mut(window) else {
            return false;
        };
        node.document.set_fragment(to.fragment());
        match kind {
            NavigationKind::Assign => node.history.push(to),
            NavigationKind::Replace => node.history.replace(to),
            _ => {}
        }
        self.trace_navigation_line(format!("[nav] fragment window={} to={}", window, to));
        true
    }

    fn load_document(&mut self, url: &Url, post_data: Option<&str>, referrer: Option<Url>) -> Document {
        match url.scheme() {
            "about" => return Document::blank(url.clone()),
            "javascript" => return Document::blank(Document::about_blank_url()),
            _ => {}
        }

        let mut request = match post_data {
            Some(body) => FetchRequest::post(url.clone(), body),
            None => FetchRequest::get(url.clone()),
        };
        request.referrer = referrer;

        match self.fetcher.fetch(&request) {
            Ok(response) => {
                let mut document = match self.parser.parse(&response.body, &response.url) {
                    Ok(document) => document,
                    Err(err) => {
                        tracing::warn!(target: "frame_nav", url = %response.url, error = %err, "parse failed");
                        self.trace_navigation_line(format!(
                            "[nav] parse-failed url={} error={}",
                            response.url, err
                        ));
                        Document::error(response.url.clone(), &err.to_string())
                    }
                };
                document.set_status(response.status);
                document.set_header_refresh(response.header("Refresh").map(str::to_string));
                document
            }
            Err(err) => {
                tracing::warn!(target: "frame_nav", %url, error = %err, "fetch failed");
                self.trace_navigation_line(format!("[nav] fetch-failed url={} error={}", url, err));
                Document::error(url.clone(), &err.to_string())
            }
        }
    }

    fn spawn_frames(&mut self, window: WindowId) {
        let Some(node) = self.registry.get(window) else {
            return;
        };
        let declarations = node.document.frame_declarations().to_vec();
        let base_url = node.document.base_url().clone();
        let depth = self.registry.depth(window) + 1;

        for declaration in declarations {
            let child = self.create_frame(window, &declaration.name);
            let source = self.frame_source(window, &base_url, &declaration, depth);
            stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || {
                self.load_into_window(child, source, NavigationKind::Frame)
            });
        }
    }

    fn frame_source(
        &mut self,
        parent: WindowId,
        base_url: &Url,
        declaration: &FrameDeclaration,
        depth: usize,
    ) -> DocumentSource {
        if let Some(srcdoc) = &declaration.srcdoc {
            let srcdoc_url = Url::parse("about:srcdoc").unwrap_or_else(|_| Document::about_blank_url());
            let document = match self.parser.parse(srcdoc, &srcdoc_url) {
                Ok(document) => document.with_base_url(base_url.clone()),
                Err(err) => Document::error(srcdoc_url, &err.to_string()),
            };
            return DocumentSource::Ready(document);
        }

        let Some(src) = declaration.effective_src() else {
            return DocumentSource::Ready(Document::blank(Document::about_blank_url()));
        };

        let url = match resolve_url(base_url, src) {
            Ok(url) => url,
            Err(err) => {
                self.trace_navigation_line(format!(
                    "[nav] frame-src-invalid parent={} src={:?} error={}",
                    parent, src, err
                ));
                return DocumentSource::Ready(Document::error(
                    Document::about_blank_url(),
                    &err.to_string(),
                ));
            }
        };

        if depth > self.config.max_frame_depth {
            self.trace_navigation_line(format!(
                "[nav] frame-too-deep parent={} depth={} url={}",
                parent, depth, url
            ));
            return DocumentSource::Ready(Document::blank(Document::about_blank_url()));
        }

        let target = without_fragment(&url);
        let recursive = std::iter::once(parent)
            .chain(self.registry.ancestors(parent))
            .filter_map(|ancestor| self.registry.get(ancestor))
            .any(|ancestor| without_fragment(ancestor.document.url()) == target);
        if recursive {
            self.trace_navigation_line(format!(
                "[nav] frame-recursive parent={} url={}",
                parent, url
            ));
            return DocumentSource::Ready(Document::blank(Document::about_blank_url()));
        }

        DocumentSource::Fetch {
            url,
            post_data: None,
        }
    }

    fn teardown_children(&mut self, window: WindowId) {
        let children = self
            .registry
            .get(window)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for child in children {
            self.destroy_subtree(child);
        }
    }

    /// Unregisters `root` and its descendants, deepest first. Returns the
    /// closed ids in closing order; closing an absent window closes nothing.
    pub(crate) fn destroy_subtree(&mut self, root: WindowId) -> Vec<WindowId> {
        let doomed = self.registry.post_order(root);
        let mut closed = Vec::with_capacity(doomed.len());
        for id in doomed {
            let Some(node) = self.registry.unregister(id) else {
                continue;
            };
            self.forget_refresh(id, node.pending_refresh);
            self.coordinator.forget(id);
            self.coordinator.record(WindowEvent::Closed { window: id });
            if self.current_window == Some(id) {
                self.current_window = None;
            }
            self.trace_window_line(format!("[window] close id={} name={:?}", id, node.name));
            closed.push(id);
        }
        closed
    }

    pub(crate) fn create_top_level(&mut self, name: &str, opener: Option<WindowId>) -> WindowId {
        let id = self.registry.allocate_id();
        let mut node = WindowNode::new(id, name, None);
        node.opener = opener;
        self.registry.register(node);
        self.coordinator.record(WindowEvent::Opened {
            window: id,
            parent: None,
            name: name.to_string(),
        });
        self.trace_window_line(format!("[window] open id={} parent=none name={:?}", id, name));
        self.current_window = Some(id);
        id
    }

    fn create_frame(&mut self, parent: WindowId, name: &str) -> WindowId {
        let id = self.registry.allocate_id();
        self.registry.register(WindowNode::new(id, name, Some(parent)));
        self.coordinator.record(WindowEvent::Opened {
            window: id,
            parent: Some(parent),
            name: name.to_string(),
        });
        self.trace_window_line(format!(
            "[window] open id={} parent={} name={:?}",
            id, parent, name
        ));
        id
    }
}
