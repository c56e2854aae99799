/// Per-service log panels fed by streaming reads
///
/// Each panel owns at most one read task. Hiding a panel aborts its task and
/// a list reload drops every panel, so no read loop outlives the panel it
/// writes to. Events from an aborted task that are still queued are ignored
/// by generation number.

use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::registry::RegistryApi;
use crate::utils::{strip_ansi_codes, truncate_front, LOGS_LOADING, LOGS_STREAM_FAILED, MAX_LOG_BYTES};

/// Incremental UTF-8 decoder. Sequences split across chunks are carried
/// over; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        let mut input = self.pending.as_slice();

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = input.to_vec();
        out
    }

    /// Flush whatever is left once the stream has ended
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[derive(Debug)]
enum LogEventKind {
    Chunk(String),
    Ended,
    Failed(String),
}

#[derive(Debug)]
struct LogEvent {
    service: String,
    generation: u64,
    kind: LogEventKind,
}

#[derive(Debug)]
pub struct LogPanel {
    visible: bool,
    content: String,
    received_any: bool,
    finished: bool,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl LogPanel {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// The stream has completed (or failed)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_streaming(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn append(&mut self, text: &str) {
        if !self.received_any {
            self.content.clear();
            self.received_any = true;
        }
        self.content.push_str(&strip_ansi_codes(text));
        truncate_front(&mut self.content, MAX_LOG_BYTES);
    }
}

impl Drop for LogPanel {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleResult {
    Shown,
    Hidden,
    Disabled,
}

pub struct LogPanels {
    enabled: bool,
    panels: HashMap<String, LogPanel>,
    next_generation: u64,
    events_tx: UnboundedSender<LogEvent>,
    events_rx: UnboundedReceiver<LogEvent>,
}

impl LogPanels {
    pub fn new(enabled: bool) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            enabled,
            panels: HashMap::new(),
            next_generation: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn panel(&self, service: &str) -> Option<&LogPanel> {
        self.panels.get(service)
    }

    pub fn is_visible(&self, service: &str) -> bool {
        self.panel(service).map_or(false, LogPanel::is_visible)
    }

    /// Visible panels, sorted by service name
    pub fn visible(&self) -> Vec<(&str, &LogPanel)> {
        let mut visible: Vec<_> = self
            .panels
            .iter()
            .filter(|(_, panel)| panel.visible)
            .map(|(name, panel)| (name.as_str(), panel))
            .collect();
        visible.sort_by(|a, b| a.0.cmp(b.0));
        visible
    }

    /// Number of read loops still running
    pub fn active_streams(&self) -> usize {
        self.panels.values().filter(|panel| panel.is_streaming()).count()
    }

    /// Show or hide a service's panel. Showing starts a fresh read loop,
    /// hiding cancels it. Must be called inside a tokio runtime.
    pub fn toggle(&mut self, api: Arc<dyn RegistryApi>, service: &str) -> ToggleResult {
        if !self.enabled {
            return ToggleResult::Disabled;
        }

        if let Some(panel) = self.panels.get_mut(service) {
            if panel.visible {
                panel.visible = false;
                panel.cancel();
                debug!(service, "log panel hidden, stream cancelled");
                return ToggleResult::Hidden;
            }
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let task = spawn_reader(api, service.to_string(), generation, self.events_tx.clone());

        // Replacing an existing panel drops it, which aborts any leftover task
        self.panels.insert(
            service.to_string(),
            LogPanel {
                visible: true,
                content: LOGS_LOADING.to_string(),
                received_any: false,
                finished: false,
                generation,
                task: Some(task),
            },
        );
        debug!(service, generation, "log panel shown, stream started");
        ToggleResult::Shown
    }

    /// Apply queued stream events. Returns true if any panel changed.
    pub fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            let Some(panel) = self.panels.get_mut(&event.service) else {
                continue;
            };
            if panel.generation != event.generation {
                continue;
            }

            match event.kind {
                LogEventKind::Chunk(text) => panel.append(&text),
                LogEventKind::Ended => {
                    if !panel.received_any {
                        panel.content.clear();
                        panel.received_any = true;
                    }
                    panel.finished = true;
                }
                LogEventKind::Failed(reason) => {
                    panel.append(&format!("\n{}: {}\n", LOGS_STREAM_FAILED, reason));
                    panel.finished = true;
                }
            }
            changed = true;
        }
        changed
    }

    /// Drop all panels and cancel their streams (the list they belong to was replaced)
    pub fn reset(&mut self) {
        self.panels.clear();
    }
}

fn spawn_reader(
    api: Arc<dyn RegistryApi>,
    service: String,
    generation: u64,
    tx: UnboundedSender<LogEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let send = |kind: LogEventKind| {
            tx.send(LogEvent {
                service: service.clone(),
                generation,
                kind,
            })
            .is_ok()
        };

        let mut stream = match api.stream_logs(&service).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(service = %service, error = %e, "failed to open log stream");
                send(LogEventKind::Failed(e.to_string()));
                return;
            }
        };

        let mut decoder = Utf8Decoder::default();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() && !send(LogEventKind::Chunk(text)) {
                        return;
                    }
                }
                Err(e) => {
                    warn!(service = %service, error = %e, "log stream interrupted");
                    send(LogEventKind::Failed(e.to_string()));
                    return;
                }
            }
        }

        let rest = decoder.finish();
        if !rest.is_empty() {
            send(LogEventKind::Chunk(rest));
        }
        send(LogEventKind::Ended);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::{LogStream, MockRegistryApi, RegistryError};
    use bytes::Bytes;
    use std::time::Duration;

    fn chunks(parts: &[&'static [u8]]) -> LogStream {
        let items: Vec<Result<Bytes, RegistryError>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        futures::stream::iter(items).boxed()
    }

    async fn settle(panels: &mut LogPanels) {
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            panels.drain_events();
            if panels.active_streams() == 0 {
                break;
            }
        }
        panels.drain_events();
    }

    #[test]
    fn test_decoder_handles_split_sequences() {
        let mut decoder = Utf8Decoder::default();
        let bytes = "läuft".as_bytes();
        // split inside the two-byte "ä"
        assert_eq!(decoder.decode(&bytes[..2]), "l");
        assert_eq!(decoder.decode(&bytes[2..]), "äuft");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.decode(b"\xc3"), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn test_first_show_streams_once() {
        let mut api = MockRegistryApi::new();
        api.expect_stream_logs()
            .times(1)
            .returning(|_| Ok(chunks(&[b"line 1\n", b"line 2\n"])));
        let api: Arc<dyn RegistryApi> = Arc::new(api);

        let mut panels = LogPanels::new(true);
        assert_eq!(panels.toggle(api, "orders"), ToggleResult::Shown);
        assert_eq!(panels.panel("orders").unwrap().content(), LOGS_LOADING);

        settle(&mut panels).await;
        let panel = panels.panel("orders").unwrap();
        assert_eq!(panel.content(), "line 1\nline 2\n");
        assert!(panel.is_finished());
    }

    #[tokio::test]
    async fn test_toggle_never_runs_two_streams() {
        let mut api = MockRegistryApi::new();
        api.expect_stream_logs()
            .returning(|_| Ok(futures::stream::pending().boxed()));
        let api: Arc<dyn RegistryApi> = Arc::new(api);

        let mut panels = LogPanels::new(true);
        assert_eq!(panels.toggle(api.clone(), "orders"), ToggleResult::Shown);
        tokio::task::yield_now().await;
        assert_eq!(panels.active_streams(), 1);

        assert_eq!(panels.toggle(api.clone(), "orders"), ToggleResult::Hidden);
        assert!(!panels.is_visible("orders"));
        assert_eq!(panels.active_streams(), 0);

        assert_eq!(panels.toggle(api, "orders"), ToggleResult::Shown);
        tokio::task::yield_now().await;
        assert_eq!(panels.active_streams(), 1);
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let mut api = MockRegistryApi::new();
        api.expect_stream_logs()
            .returning(|_| Ok(chunks(&[b"old\n"])));
        let api: Arc<dyn RegistryApi> = Arc::new(api);

        let mut panels = LogPanels::new(true);
        panels.toggle(api.clone(), "orders");
        // Let the first stream run to completion without draining its events
        tokio::time::sleep(Duration::from_millis(50)).await;

        panels.toggle(api.clone(), "orders"); // hide
        panels.reset();
        panels.drain_events();
        assert!(panels.panel("orders").is_none());
    }

    #[tokio::test]
    async fn test_reset_cancels_streams() {
        let mut api = MockRegistryApi::new();
        api.expect_stream_logs()
            .returning(|_| Ok(futures::stream::pending().boxed()));
        let api: Arc<dyn RegistryApi> = Arc::new(api);

        let mut panels = LogPanels::new(true);
        panels.toggle(api.clone(), "orders");
        panels.toggle(api, "billing");
        assert_eq!(panels.visible().len(), 2);

        panels.reset();
        assert!(panels.visible().is_empty());
        assert_eq!(panels.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_stream_error_is_shown() {
        let mut api = MockRegistryApi::new();
        api.expect_stream_logs()
            .returning(|_| Err(RegistryError::Network("offline".into())));
        let api: Arc<dyn RegistryApi> = Arc::new(api);

        let mut panels = LogPanels::new(true);
        panels.toggle(api, "orders");
        settle(&mut panels).await;

        let panel = panels.panel("orders").unwrap();
        assert!(panel.content().contains(LOGS_STREAM_FAILED));
        assert!(panel.is_finished());
    }

    #[tokio::test]
    async fn test_disabled_panels_do_nothing() {
        let api: Arc<dyn RegistryApi> = Arc::new(MockRegistryApi::new());
        let mut panels = LogPanels::new(false);
        assert_eq!(panels.toggle(api, "orders"), ToggleResult::Disabled);
        assert!(panels.panel("orders").is_none());
    }
}
