use super::*;

#[derive(Debug)]
pub(crate) struct TraceState {
    enabled: bool,
    windows: bool,
    navigation: bool,
    refresh: bool,
    events: bool,
    forward: bool,
    logs: VecDeque<String>,
    log_limit: usize,
}

impl TraceState {
    pub(crate) fn from_config(config: &TraceConfig) -> Self {
        Self {
            enabled: config.enabled,
            windows: config.windows,
            navigation: config.navigation,
            refresh: config.refresh,
            events: config.events,
            forward: config.forward,
            logs: VecDeque::new(),
            log_limit: config.log_limit.max(1),
        }
    }

    fn push(&mut self, line: String) {
        if !self.enabled {
            return;
        }
        if self.forward {
            tracing::debug!(target: "frame_nav", "{line}");
        }
        while self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }
}

impl BrowserContext {
    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub fn set_trace_forwarding(&mut self, enabled: bool) {
        self.trace_state.forward = enabled;
    }

    pub fn set_trace_windows(&mut self, enabled: bool) {
        self.trace_state.windows = enabled;
    }

    pub fn set_trace_navigation(&mut self, enabled: bool) {
        self.trace_state.navigation = enabled;
    }

    pub fn set_trace_refresh(&mut self, enabled: bool) {
        self.trace_state.refresh = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_state.events = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Config(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn trace_window_line(&mut self, line: String) {
        if self.trace_state.windows {
            self.trace_state.push(line);
        }
    }

    pub(crate) fn trace_navigation_line(&mut self, line: String) {
        if self.trace_state.navigation {
            self.trace_state.push(line);
        }
    }

    pub(crate) fn trace_refresh_line(&mut self, line: String) {
        if self.trace_state.refresh {
            self.trace_state.push(line);
        }
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace_state.events {
            self.trace_state.push(line);
        }
    }
}
