use super::*;

/// Parsed meta-refresh / HTTP `Refresh` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshDirective {
    delay_ms: u64,
    target: Option<String>,
    raw: String,
}

impl RefreshDirective {
    /// Parses a directive the same way for meta content and header values.
    ///
    /// Returns `None` when no refresh should happen at all: no leading delay,
    /// or a delay followed by something other than `;`, `,` or whitespace
    /// (`"0Url=..."`). A label other than `url` is not recognized and becomes
    /// part of the relative target (`"0 abcd=x"` targets `abcd=x`).
    pub fn parse(raw: &str) -> Option<Self> {
        let input = raw;
        let mut pos = skip_refresh_ws(input, 0);

        let int_end = scan_digits(input, pos);
        let integer = &input[pos..int_end];
        if integer.is_empty() && !input[int_end..].starts_with('.') {
            return None;
        }
        pos = int_end;

        let mut fraction = "";
        if input[pos..].starts_with('.') {
            let fraction_end = scan_digits(input, pos + 1);
            fraction = &input[pos + 1..fraction_end];
            pos = fraction_end;
        }
        // Trailing digit and dot runs ("1.2.5") belong to the delay token.
        while let Some(ch) = input[pos..].chars().next() {
            if ch.is_ascii_digit() || ch == '.' {
                pos += 1;
            } else {
                break;
            }
        }
        let delay_ms = delay_millis(integer, fraction);

        let mut target = None;
        if pos < input.len() {
            let separator = input[pos..].chars().next()?;
            if !matches!(separator, ';' | ',') && !is_refresh_ws(separator) {
                return None;
            }
            pos = skip_refresh_ws(input, pos);
            if input[pos..].starts_with([';', ',']) {
                pos += 1;
            }
            pos = skip_refresh_ws(input, pos);
            target = parse_target(&input[pos..]);
        }

        Some(Self {
            delay_ms,
            target,
            raw: raw.to_string(),
        })
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn delay_seconds(&self) -> f64 {
        self.delay_ms as f64 / 1000.0
    }

    /// Unresolved target text; `None` reloads the current document.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Absolute refresh destination: the target joined against `base_url`,
    /// or `document_url` itself when there is no target.
    pub fn resolve(&self, document_url: &Url, base_url: &Url) -> Result<Url> {
        match &self.target {
            Some(target) => resolve_url(base_url, target),
            None => Ok(document_url.clone()),
        }
    }
}

fn parse_target(rest: &str) -> Option<String> {
    let mut text = rest;
    if text
        .get(..3)
        .is_some_and(|label| label.eq_ignore_ascii_case("url"))
    {
        let after_label = text[3..].trim_start_matches(is_refresh_ws);
        if let Some(value) = after_label.strip_prefix('=') {
            text = value.trim_start_matches(is_refresh_ws);
        } else if after_label.is_empty() || text[3..].starts_with(is_refresh_ws) {
            text = after_label;
        }
    }

    if let Some(quote) = text.chars().next().filter(|ch| matches!(ch, '"' | '\'')) {
        text = &text[1..];
        if let Some(end) = text.find(quote) {
            text = &text[..end];
        }
    }

    let text = text.trim_matches(is_refresh_ws);
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn delay_millis(integer: &str, fraction: &str) -> u64 {
    let seconds = integer
        .bytes()
        .fold(0u64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(u64::from(digit - b'0'))
        });
    let mut millis = 0u64;
    let mut scale = 100u64;
    for digit in fraction.bytes().take(3) {
        millis += u64::from(digit - b'0') * scale;
        scale /= 10;
    }
    seconds.saturating_mul(1000).saturating_add(millis)
}

fn is_refresh_ws(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn skip_refresh_ws(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, ch)| !is_refresh_ws(*ch))
        .map(|(offset, _)| from + offset)
        .unwrap_or(input.len())
}

fn scan_digits(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(offset, _)| from + offset)
        .unwrap_or(input.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Refreshes wait on the logical clock (`advance_time`, `flush_refreshes`).
    #[default]
    Scheduled,
    /// Refreshes fire as soon as the engine is idle, whatever their delay.
    Immediate,
    /// Refresh directives are parsed but never armed.
    Ignore,
    /// Like `Scheduled`, but directives with a longer delay are dropped.
    MaxDelay(u64),
}

/// Read-only view of an armed refresh, ordered the way it would fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRefresh {
    pub id: i64,
    pub window: WindowId,
    pub due_at: i64,
    pub order: i64,
    pub url: Url,
}

#[derive(Debug, Clone)]
struct ScheduledRefresh {
    id: i64,
    window: WindowId,
    due_at: i64,
    order: i64,
    url: Url,
    raw: String,
}

#[derive(Debug)]
pub(crate) struct RefreshScheduler {
    tasks: Vec<ScheduledRefresh>,
    now_ms: i64,
    next_timer_id: i64,
    next_task_order: i64,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            now_ms: 0,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }
}

impl RefreshScheduler {
    fn allocate_timer_id(&mut self) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    fn allocate_task_order(&mut self) -> i64 {
        let order = self.next_task_order;
        self.next_task_order += 1;
        order
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the timer id and its due time.
    fn arm(&mut self, window: WindowId, url: Url, delay_ms: u64, raw: &str) -> (i64, i64) {
        let id = self.allocate_timer_id();
        let order = self.allocate_task_order();
        let delay = i64::try_from(delay_ms).unwrap_or(i64::MAX);
        let due_at = self.now_ms.saturating_add(delay);
        self.tasks.push(ScheduledRefresh {
            id,
            window,
            due_at,
            order,
            url,
            raw: raw.to_string(),
        });
        (id, due_at)
    }

    fn cancel(&mut self, id: i64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    pub(crate) fn pending(&self) -> Vec<PendingRefresh> {
        let mut pending = self
            .tasks
            .iter()
            .map(|task| PendingRefresh {
                id: task.id,
                window: task.window,
                due_at: task.due_at,
                order: task.order,
                url: task.url.clone(),
            })
            .collect::<Vec<_>>();
        pending.sort_by_key(|refresh| (refresh.due_at, refresh.order));
        pending
    }
}

impl BrowserContext {
    /// Arms the refresh carried by the document just attached to `window`.
    pub(crate) fn arm_document_refresh(&mut self, window: WindowId) {
        let Some(node) = self.registry.get(window) else {
            return;
        };
        let Some(raw) = node.document.effective_refresh().map(str::to_string) else {
            return;
        };
        match RefreshDirective::parse(&raw) {
            Some(directive) => {
                if let Err(err) = self.schedule_refresh(window, &directive) {
                    tracing::warn!(target: "frame_nav", %window, error = %err, "refresh target does not resolve");
                    self.trace_refresh_line(format!(
                        "[refresh] unresolved window={} raw={:?} error={}",
                        window, raw, err
                    ));
                }
            }
            None => {
                self.trace_refresh_line(format!(
                    "[refresh] ignored window={} raw={:?} reason=no-separator",
                    window, raw
                ));
            }
        }
    }

    /// Schedules `directive` for `window`, replacing any refresh already
    /// pending there without firing it. Returns the timer id, or `None` when
    /// the refresh policy drops the directive; the old refresh is cancelled
    /// either way.
    pub fn schedule_refresh(
        &mut self,
        window: WindowId,
        directive: &RefreshDirective,
    ) -> Result<Option<i64>> {
        let node = self.registry.get(window).ok_or(Error::WindowClosed(window))?;
        let url = directive.resolve(node.document.url(), node.document.base_url())?;
        self.cancel_refresh(window);

        let delay_ms = match self.config.refresh_policy {
            RefreshPolicy::Ignore => {
                self.trace_refresh_line(format!(
                    "[refresh] ignored window={} raw={:?} reason=policy",
                    window,
                    directive.raw()
                ));
                return Ok(None);
            }
            RefreshPolicy::MaxDelay(max_ms) if directive.delay_ms() > max_ms => {
                self.trace_refresh_line(format!(
                    "[refresh] ignored window={} raw={:?} reason=delay>{}",
                    window,
                    directive.raw(),
                    max_ms
                ));
                return Ok(None);
            }
            RefreshPolicy::Immediate => 0,
            RefreshPolicy::Scheduled | RefreshPolicy::MaxDelay(_) => directive.delay_ms(),
        };

        let (id, due_at) = self
            .scheduler
            .arm(window, url.clone(), delay_ms, directive.raw());
        if let Some(node) = self.registry.get_mut(window) {
            node.pending_refresh = Some(id);
        }
        self.trace_refresh_line(format!(
            "[refresh] schedule id={} window={} due_at={} url={}",
            id, window, due_at, url
        ));
        Ok(Some(id))
    }

    /// Drops the pending refresh of `window`. Returns whether one existed.
    pub fn cancel_refresh(&mut self, window: WindowId) -> bool {
        let Some(id) = self
            .registry
            .get_mut(window)
            .and_then(|node| node.pending_refresh.take())
        else {
            return false;
        };
        let existed = self.scheduler.cancel(id);
        if existed {
            self.trace_refresh_line(format!("[refresh] cancel id={} window={}", id, window));
        }
        existed
    }

    pub fn pending_refreshes(&self) -> Vec<PendingRefresh> {
        self.scheduler.pending()
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Config(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = self.scheduler.now_ms.saturating_add(delta_ms);
        let ran = self.run_refresh_queue(Some(self.scheduler.now_ms), false)?;
        self.trace_refresh_line(format!(
            "[refresh] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.scheduler.now_ms {
            return Err(Error::Config(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.scheduler.now_ms
            )));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = target_ms;
        let ran = self.run_refresh_queue(Some(target_ms), false)?;
        self.trace_refresh_line(format!(
            "[refresh] advance_to from={} to={} ran_due={}",
            from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    /// Fires every refresh that is due at the current logical time.
    pub fn run_due_refreshes(&mut self) -> Result<usize> {
        let ran = self.run_refresh_queue(Some(self.scheduler.now_ms), false)?;
        self.trace_refresh_line(format!(
            "[refresh] run_due now_ms={} ran={}",
            self.scheduler.now_ms, ran
        ));
        Ok(ran)
    }

    /// Fires the earliest pending refresh, moving the clock forward to it.
    pub fn run_next_refresh(&mut self) -> Result<bool> {
        let Some(next_idx) = self.scheduler.next_task_index(None) else {
            self.trace_refresh_line("[refresh] run_next none".into());
            return Ok(false);
        };
        let task = self.scheduler.tasks.remove(next_idx);
        if task.due_at > self.scheduler.now_ms {
            self.scheduler.now_ms = task.due_at;
        }
        self.fire_refresh(task);
        self.run_until_idle()?;
        Ok(true)
    }

    /// Runs refreshes until none is pending, advancing the clock as needed.
    pub fn flush_refreshes(&mut self) -> Result<usize> {
        let from = self.scheduler.now_ms;
        let ran = self.run_refresh_queue(None, true)?;
        self.trace_refresh_line(format!(
            "[refresh] flush from={} to={} ran={}",
            from, self.scheduler.now_ms, ran
        ));
        Ok(ran)
    }

    fn run_refresh_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.scheduler.next_task_index(due_limit) {
            steps += 1;
            if steps > self.config.step_limit {
                return Err(self.step_limit_error());
            }
            let task = self.scheduler.tasks.remove(next_idx);
            if advance_clock && task.due_at > self.scheduler.now_ms {
                self.scheduler.now_ms = task.due_at;
            }
            self.fire_refresh(task);
            self.run_until_idle()?;
        }
        Ok(steps)
    }

    /// Fires the earliest refresh regardless of its due time. Used by the
    /// idle loop under [`RefreshPolicy::Immediate`].
    pub(crate) fn fire_next_immediate_refresh(&mut self) -> bool {
        let Some(next_idx) = self.scheduler.next_task_index(None) else {
            return false;
        };
        let task = self.scheduler.tasks.remove(next_idx);
        self.fire_refresh(task);
        true
    }

    fn fire_refresh(&mut self, task: ScheduledRefresh) {
        if let Some(node) = self.registry.get_mut(task.window) {
            if node.pending_refresh == Some(task.id) {
                node.pending_refresh = None;
            }
        }
        self.trace_refresh_line(format!(
            "[refresh] fire id={} window={} now_ms={} raw={:?} url={}",
            task.id, task.window, self.scheduler.now_ms, task.raw, task.url
        ));
        self.enqueue(WorkItem::Navigate(NavigationRequest {
            window: task.window,
            url: task.url,
            post_data: None,
            kind: NavigationKind::Refresh,
        }));
    }

    /// Drops the refresh timers of windows that are going away.
    pub(crate) fn forget_refresh(&mut self, window: WindowId, id: Option<i64>) {
        if let Some(id) = id {
            if self.scheduler.cancel(id) {
                self.trace_refresh_line(format!("[refresh] cancel id={} window={}", id, window));
            }
        }
    }

    pub(crate) fn clear_all_refreshes(&mut self) -> usize {
        let cleared = self.scheduler.tasks.len();
        self.scheduler.tasks.clear();
        cleared
    }
}
