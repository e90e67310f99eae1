use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    pub enabled: bool,
    pub windows: bool,
    pub navigation: bool,
    pub refresh: bool,
    pub events: bool,
    /// Mirror every trace line to `tracing` at debug level.
    pub forward: bool,
    pub log_limit: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            windows: true,
            navigation: true,
            refresh: true,
            events: true,
            forward: true,
            log_limit: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub refresh_policy: RefreshPolicy,
    /// Upper bound on work items, load releases and refresh firings handled by
    /// one call into the context.
    pub step_limit: usize,
    /// Frames nested deeper than this get a blank document instead of a fetch.
    pub max_frame_depth: usize,
    pub trace: TraceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_policy: RefreshPolicy::Scheduled,
            step_limit: 10_000,
            max_frame_depth: 16,
            trace: TraceConfig::default(),
        }
    }
}

impl EngineConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.step_limit == 0 {
            return Err(Error::Config("step_limit requires at least 1 step".into()));
        }
        if self.trace.log_limit == 0 {
            return Err(Error::Config(
                "trace log_limit requires at least 1 entry".into(),
            ));
        }
        Ok(())
    }
}

impl BrowserContext {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_refresh_policy(&mut self, policy: RefreshPolicy) {
        self.config.refresh_policy = policy;
    }

    pub fn set_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Config(
                "set_step_limit requires at least 1 step".into(),
            ));
        }
        self.config.step_limit = max_steps;
        Ok(())
    }

    pub fn set_max_frame_depth(&mut self, depth: usize) {
        self.config.max_frame_depth = depth;
    }
}
