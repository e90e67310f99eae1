use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub window: WindowId,
    /// Window name at the time `load` fired.
    pub name: String,
    pub url: Url,
    /// Position of this notification among every load fired by the context.
    pub sequence: u64,
}

/// Lifecycle record, in the order things happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    Opened {
        window: WindowId,
        parent: Option<WindowId>,
        name: String,
    },
    Loaded(LoadEvent),
    Closed {
        window: WindowId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptRequest {
    Navigate { window: WindowId, url: String },
    Close { window: WindowId },
    OpenNamed { scope: WindowId, name: String, url: String },
    FollowLink { source: WindowId, href: String, target: String },
}

/// Requests a `load` listener makes of the engine.
///
/// Nothing runs while the listener is on the stack: every request is appended
/// to the context's work queue and processed once the current step finishes.
#[derive(Debug, Default)]
pub struct ScriptActions {
    pub(crate) requests: Vec<ScriptRequest>,
}

impl ScriptActions {
    /// `window.location = url`; relative URLs resolve against the target
    /// window's document.
    pub fn navigate(&mut self, window: WindowId, url: &str) {
        self.requests.push(ScriptRequest::Navigate {
            window,
            url: url.to_string(),
        });
    }

    pub fn close(&mut self, window: WindowId) {
        self.requests.push(ScriptRequest::Close { window });
    }

    pub fn open_named(&mut self, scope: WindowId, name: &str, url: &str) {
        self.requests.push(ScriptRequest::OpenNamed {
            scope,
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    pub fn follow_link(&mut self, source: WindowId, href: &str, target: &str) {
        self.requests.push(ScriptRequest::FollowLink {
            source,
            href: href.to_string(),
            target: target.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

pub(crate) type LoadListener = Box<dyn FnMut(&LoadEvent, &mut ScriptActions)>;

/// Serializes `load` notifications across frame trees.
///
/// Attaching a document marks its window pending. A pending window is released
/// only once no descendant is pending; among releasable windows the first in
/// post-order (children before parents, siblings in declaration order) goes
/// first.
#[derive(Default)]
pub(crate) struct EventOrderCoordinator {
    pending: BTreeSet<WindowId>,
    listeners: HashMap<WindowId, Vec<LoadListener>>,
    global_listeners: Vec<LoadListener>,
    log: Vec<WindowEvent>,
    next_sequence: u64,
}

impl fmt::Debug for EventOrderCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOrderCoordinator")
            .field("pending", &self.pending)
            .field("listener_windows", &self.listeners.keys().collect::<Vec<_>>())
            .field("global_listeners", &self.global_listeners.len())
            .field("log", &self.log)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}

impl EventOrderCoordinator {
    /// Returns `false` when the window already has an unreleased load, in
    /// which case the new attachment shares that single notification.
    pub(crate) fn mark_pending(&mut self, window: WindowId) -> bool {
        self.pending.insert(window)
    }

    pub(crate) fn is_pending(&self, window: WindowId) -> bool {
        self.pending.contains(&window)
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops everything tied to a closed window.
    pub(crate) fn forget(&mut self, window: WindowId) {
        self.pending.remove(&window);
        self.listeners.remove(&window);
    }

    pub(crate) fn next_releasable(&self, registry: &WindowRegistry) -> Option<WindowId> {
        if self.pending.is_empty() {
            return None;
        }
        registry
            .top_level_windows()
            .iter()
            .flat_map(|top| registry.post_order(*top))
            .find(|window| self.pending.contains(window))
    }

    pub(crate) fn add_listener(&mut self, window: WindowId, listener: LoadListener) {
        self.listeners.entry(window).or_default().push(listener);
    }

    pub(crate) fn add_global_listener(&mut self, listener: LoadListener) {
        self.global_listeners.push(listener);
    }

    pub(crate) fn record(&mut self, event: WindowEvent) {
        self.log.push(event);
    }

    pub(crate) fn take_log(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.log)
    }

    /// Releases `window`'s load: logs it and runs its listeners, then the
    /// global ones. Returns the event and whatever the listeners requested.
    pub(crate) fn release(&mut self, window: WindowId, node: &WindowNode) -> (LoadEvent, ScriptActions) {
        self.pending.remove(&window);
        let event = LoadEvent {
            window,
            name: node.name.clone(),
            url: node.document.url().clone(),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.log.push(WindowEvent::Loaded(event.clone()));

        let mut actions = ScriptActions::default();
        if let Some(listeners) = self.listeners.get_mut(&window) {
            for listener in listeners.iter_mut() {
                listener(&event, &mut actions);
            }
        }
        for listener in self.global_listeners.iter_mut() {
            listener(&event, &mut actions);
        }
        (event, actions)
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.listeners.clear();
    }
}

impl BrowserContext {
    /// Registers a `load` listener for `window`. It stays attached across
    /// navigations of that window and is dropped when the window closes.
    pub fn on_load(
        &mut self,
        window: WindowId,
        listener: impl FnMut(&LoadEvent, &mut ScriptActions) + 'static,
    ) -> Result<()> {
        if !self.registry.contains(window) {
            return Err(Error::WindowClosed(window));
        }
        self.coordinator.add_listener(window, Box::new(listener));
        Ok(())
    }

    /// Registers a listener that sees every `load` fired by this context.
    pub fn on_any_load(&mut self, listener: impl FnMut(&LoadEvent, &mut ScriptActions) + 'static) {
        self.coordinator.add_global_listener(Box::new(listener));
    }

    pub fn take_window_events(&mut self) -> Vec<WindowEvent> {
        self.coordinator.take_log()
    }

    pub(crate) fn release_load(&mut self, window: WindowId) {
        let Some(node) = self.registry.get(window) else {
            self.coordinator.forget(window);
            return;
        };
        let (event, actions) = self.coordinator.release(window, node);
        self.trace_event_line(format!(
            "[event] load window={} name={:?} url={} seq={}",
            event.window, event.name, event.url, event.sequence
        ));
        for request in actions.requests {
            self.enqueue(WorkItem::Script(request));
        }
    }
}
