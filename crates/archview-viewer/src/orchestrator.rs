//! Layout strategy and the size/completion handshake with the render engine.
//!
//! The engine cannot lay out or fit into a zero-sized surface, and
//! algorithmic layouts finish asynchronously. Every wait here is bounded:
//! when a ceiling is hit we log and carry on rather than fail the render.

use archview_core::{Graph, LayoutMap, NodeType};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout, Instant};

use crate::backend::{ElementSet, LayoutAlgorithm, RenderBackend, RenderEvent, SessionId, SurfaceSize};
use crate::settings::ViewerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Reuse stored positions; no layout algorithm runs.
    Preset,
    Algorithmic(LayoutAlgorithm),
}

/// Preset when a layout map exists and covers at least one node of `graph`;
/// otherwise the engine named by `engine`, defaulting to the layered layout.
pub fn choose_mode(graph: &Graph, layout: Option<&LayoutMap>, engine: Option<&str>) -> LayoutMode {
    if let Some(layout) = layout {
        let positioned = graph
            .nodes()
            .iter()
            .any(|n| n.position.is_some() || layout.contains_key(&n.id));
        if positioned {
            return LayoutMode::Preset;
        }
    }
    let algorithm = match engine {
        Some(name) => LayoutAlgorithm::from_setting(name).unwrap_or_else(|| {
            tracing::debug!(engine = name, "unrecognized layout engine, using layered");
            LayoutAlgorithm::Layered
        }),
        None => LayoutAlgorithm::Layered,
    };
    LayoutMode::Algorithmic(algorithm)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub session: SessionId,
    pub mode: LayoutMode,
    /// Surface had a non-zero size before mounting.
    pub surface_ready: bool,
    /// Positions are in place (always true for preset).
    pub layout_completed: bool,
    pub fitted: bool,
    /// Events for this session that arrived while waiting on the layout.
    pub deferred: Vec<RenderEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    settings: ViewerSettings,
}

impl Orchestrator {
    pub fn new(settings: ViewerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    /// Mount `graph` for `session` and lay it out according to `mode`.
    pub async fn render(
        &self,
        backend: &mut dyn RenderBackend,
        events: &mut mpsc::UnboundedReceiver<RenderEvent>,
        session: SessionId,
        graph: &Graph,
        mode: LayoutMode,
    ) -> RenderOutcome {
        let surface_ready = self.wait_for_surface(backend).await;
        self.mount(backend, session, graph, mode);
        self.settle(backend, events, session, mode, surface_ready).await
    }

    /// Hand the elements to the engine. Positions are only passed in preset mode.
    pub fn mount(&self, backend: &mut dyn RenderBackend, session: SessionId, graph: &Graph, mode: LayoutMode) {
        let elements = ElementSet::from_graph(graph, mode == LayoutMode::Preset);
        backend.mount(session, &elements, NodeType::shape);
        tracing::info!(
            session = session.0,
            nodes = elements.nodes.len(),
            edges = elements.edges.len(),
            mode = ?mode,
            "mounted graph"
        );
    }

    /// Run the layout for an already mounted graph, then fit.
    pub async fn settle(
        &self,
        backend: &mut dyn RenderBackend,
        events: &mut mpsc::UnboundedReceiver<RenderEvent>,
        session: SessionId,
        mode: LayoutMode,
        surface_ready: bool,
    ) -> RenderOutcome {
        let mut deferred = Vec::new();
        let layout_completed = match mode {
            LayoutMode::Preset => true,
            LayoutMode::Algorithmic(algorithm) => {
                backend.run_layout(session, algorithm);
                self.await_layout(events, session, &mut deferred).await
            }
        };

        // Fitting before the layout has landed would frame stale positions.
        let fitted = layout_completed && self.fit_with_retry(backend).await;

        RenderOutcome {
            session,
            mode,
            surface_ready,
            layout_completed,
            fitted,
            deferred,
        }
    }

    /// Wait until the surface has a non-zero size, up to the configured ceiling.
    pub async fn wait_for_surface(&self, backend: &mut dyn RenderBackend) -> bool {
        if !backend.surface_size().is_zero() {
            return true;
        }
        let ceiling = self.settings.surface_wait();
        let deadline = Instant::now() + ceiling;

        if let Some(mut rx) = backend.resize_notifications() {
            if let Ok(true) = timeout(ceiling, wait_for_resize(&mut rx)).await {
                return true;
            }
        }

        // No notifier, or it went away early: poll whatever time is left.
        loop {
            if !backend.surface_size().is_zero() {
                return true;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    waited_ms = self.settings.surface_wait_ms,
                    "drawing surface still zero-sized, rendering anyway"
                );
                return false;
            }
            sleep(self.settings.surface_poll()).await;
        }
    }

    /// Fit the view to its content, retrying while the surface is zero-sized.
    pub async fn fit_with_retry(&self, backend: &mut dyn RenderBackend) -> bool {
        let retries = self.settings.fit_retries;
        for attempt in 0..=retries {
            if !backend.surface_size().is_zero() {
                backend.fit(self.settings.fit_padding);
                return true;
            }
            if attempt < retries {
                sleep(self.settings.fit_retry_delay()).await;
            }
        }
        tracing::warn!(attempts = retries + 1, "surface never sized, skipping fit");
        false
    }

    async fn await_layout(
        &self,
        events: &mut mpsc::UnboundedReceiver<RenderEvent>,
        session: SessionId,
        deferred: &mut Vec<RenderEvent>,
    ) -> bool {
        match timeout(
            self.settings.layout_timeout(),
            wait_for_layout_stop(events, session, deferred),
        )
        .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(session = session.0, "render event channel closed before layout finished");
                false
            }
            Err(_) => {
                tracing::warn!(
                    session = session.0,
                    timeout_ms = self.settings.layout_timeout_ms,
                    "layout did not report completion"
                );
                false
            }
        }
    }
}

async fn wait_for_resize(rx: &mut watch::Receiver<SurfaceSize>) -> bool {
    loop {
        if !rx.borrow_and_update().is_zero() {
            return true;
        }
        if rx.changed().await.is_err() {
            return false;
        }
    }
}

async fn wait_for_layout_stop(
    events: &mut mpsc::UnboundedReceiver<RenderEvent>,
    session: SessionId,
    deferred: &mut Vec<RenderEvent>,
) -> bool {
    while let Some(event) = events.recv().await {
        match event {
            RenderEvent::LayoutStop { session: s } if s == session => return true,
            other if other.session() == session => deferred.push(other),
            stale => {
                tracing::debug!(session = stale.session().0, current = session.0, "ignoring stale render event");
            }
        }
    }
    false
}
