use super::*;

/// Owns every live window of one browsing session along with the fetcher,
/// parser, refresh clock and load coordinator that drive them.
pub struct BrowserContext {
    pub(crate) registry: WindowRegistry,
    pub(crate) fetcher: Box<dyn Fetcher>,
    pub(crate) parser: Box<dyn Parser>,
    pub(crate) scheduler: RefreshScheduler,
    pub(crate) coordinator: EventOrderCoordinator,
    pub(crate) work_queue: VecDeque<WorkItem>,
    pub(crate) current_window: Option<WindowId>,
    pub(crate) trace_state: TraceState,
    pub(crate) config: EngineConfig,
}

impl fmt::Debug for BrowserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserContext")
            .field("registry", &self.registry)
            .field("scheduler", &self.scheduler)
            .field("coordinator", &self.coordinator)
            .field("work_queue", &self.work_queue)
            .field("current_window", &self.current_window)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BrowserContext {
    pub fn new(fetcher: impl Fetcher + 'static) -> Self {
        let config = EngineConfig::default();
        Self {
            registry: WindowRegistry::new(),
            fetcher: Box::new(fetcher),
            parser: Box::new(HtmlParser::new()),
            scheduler: RefreshScheduler::default(),
            coordinator: EventOrderCoordinator::default(),
            work_queue: VecDeque::new(),
            current_window: None,
            trace_state: TraceState::from_config(&config.trace),
            config,
        }
    }

    pub fn with_config(fetcher: impl Fetcher + 'static, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut context = Self::new(fetcher);
        context.trace_state = TraceState::from_config(&config.trace);
        context.config = config;
        Ok(context)
    }

    /// Replaces the HTML parser used for every later load.
    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Opens a new unnamed top-level window on `url` and runs until idle.
    /// The new window becomes the current window.
    pub fn open_window(&mut self, url: &str) -> Result<WindowId> {
        self.open_window_with_name("", url)
    }

    pub fn open_window_with_name(&mut self, name: &str, url: &str) -> Result<WindowId> {
        let url = parse_absolute_url(url)?;
        let window = self.create_top_level(name, None);
        self.enqueue_navigation(window, url, None, NavigationKind::Assign);
        self.run_until_idle()?;
        Ok(window)
    }

    /// Closes `window` and its whole subtree, deepest first. Closing a window
    /// that is already gone does nothing. Returns how many windows closed.
    pub fn close(&mut self, window: WindowId) -> usize {
        self.destroy_subtree(window).len()
    }

    /// Closes every window and drops all queued work and armed refreshes.
    /// Global load listeners survive.
    pub fn close_client(&mut self) -> usize {
        let mut closed = 0;
        for top in self.registry.top_level_windows().to_vec() {
            closed += self.destroy_subtree(top).len();
        }
        let dropped_work = self.work_queue.len();
        self.work_queue.clear();
        let dropped_refreshes = self.clear_all_refreshes();
        self.coordinator.clear();
        self.current_window = None;
        self.trace_window_line(format!(
            "[window] close_client closed={} dropped_work={} dropped_refreshes={}",
            closed, dropped_work, dropped_refreshes
        ));
        tracing::debug!(target: "frame_nav", closed, "client closed");
        closed
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn window(&self, window: WindowId) -> Option<&WindowNode> {
        self.registry.get(window)
    }

    pub fn document(&self, window: WindowId) -> Result<&Document> {
        self.registry
            .get(window)
            .map(WindowNode::document)
            .ok_or(Error::WindowClosed(window))
    }

    pub fn is_open(&self, window: WindowId) -> bool {
        self.registry.contains(window)
    }

    pub fn top_level_windows(&self) -> &[WindowId] {
        self.registry.top_level_windows()
    }

    pub fn window_count(&self) -> usize {
        self.registry.len()
    }

    pub fn current_window(&self) -> Option<WindowId> {
        self.current_window
    }

    pub fn set_current_window(&mut self, window: WindowId) -> Result<()> {
        if !self.registry.contains(window) {
            return Err(Error::WindowClosed(window));
        }
        self.current_window = Some(window);
        Ok(())
    }

    /// Renames `window`; later name lookups see the new name.
    pub fn set_window_name(&mut self, window: WindowId, name: &str) -> Result<()> {
        let node = self
            .registry
            .get_mut(window)
            .ok_or(Error::WindowClosed(window))?;
        node.name = name.to_string();
        Ok(())
    }

    /// Whether `window` has an attached document whose `load` has not fired.
    pub fn is_load_pending(&self, window: WindowId) -> bool {
        self.coordinator.is_pending(window)
    }

    pub fn has_pending_loads(&self) -> bool {
        self.coordinator.has_pending()
    }
}
