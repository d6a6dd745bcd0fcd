//! One interactive diagram session bound to a render backend.
//!
//! The viewer owns the full unscoped model built from the loaded document.
//! Whatever is on screen (the full hierarchy or one C4 projection of it) is
//! recomputed from that model on every render, and edits, drags and saves
//! all go through the model.

use archview_core::{
    build_with_layout, project_graph, serialize, ArchitectureDocument, Edge, Graph, LayoutMap,
    Node, NodeType, Rect, Scope, Serialized,
};
use tokio::sync::mpsc;

use crate::backend::{RenderBackend, RenderEvent, SessionId};
use crate::controller::{FocusScope, ViewController};
use crate::error::{Result, ViewerError};
use crate::orchestrator::{choose_mode, Orchestrator, RenderOutcome};
use crate::settings::ViewerSettings;

pub struct Viewer {
    backend: Box<dyn RenderBackend>,
    events: mpsc::UnboundedReceiver<RenderEvent>,
    container: String,
    orchestrator: Orchestrator,
    session: SessionId,
    mounted: bool,
    document: Option<ArchitectureDocument>,
    /// Full build of the document, carrying positions.
    model: Graph,
    /// Positions known so far, keyed by node id.
    layout: LayoutMap,
    /// `None` renders the whole hierarchy.
    scope: Option<Scope>,
    view: Graph,
    controller: ViewController,
    selected: Option<String>,
}

impl Viewer {
    /// Bind to `container`. Fails when the backend has no such mount point.
    pub fn init(
        backend: Box<dyn RenderBackend>,
        events: mpsc::UnboundedReceiver<RenderEvent>,
        container: impl Into<String>,
        settings: ViewerSettings,
    ) -> Result<Self> {
        let container = container.into();
        if !backend.container_exists(&container) {
            return Err(ViewerError::MissingContainer { container });
        }
        tracing::debug!(container = %container, "viewer initialized");
        Ok(Self {
            backend,
            events,
            container,
            orchestrator: Orchestrator::new(settings),
            session: SessionId::default(),
            mounted: false,
            document: None,
            model: Graph::default(),
            layout: LayoutMap::new(),
            scope: None,
            view: Graph::default(),
            controller: ViewController::default(),
            selected: None,
        })
    }

    /// Replace the current document and render its full hierarchy.
    pub async fn load(&mut self, document: ArchitectureDocument) -> Result<RenderOutcome> {
        self.ensure_container()?;
        self.layout = document.metadata.layout.clone().unwrap_or_default();
        self.model = build_with_layout(&document.architecture, document.metadata.layout.as_ref());
        tracing::info!(
            name = document.metadata.name.as_deref().unwrap_or("unnamed"),
            nodes = self.model.nodes().len(),
            edges = self.model.edges().len(),
            "loaded architecture"
        );
        self.document = Some(document);
        self.scope = None;
        self.controller = ViewController::default();
        self.selected = None;
        self.render().await
    }

    /// Switch to a C4 projection, or back to the full hierarchy with `None`.
    pub async fn set_scope(&mut self, scope: Option<Scope>) -> Result<RenderOutcome> {
        self.scope = scope;
        self.render().await
    }

    /// Re-render the current scope from the model.
    pub async fn refresh(&mut self) -> Result<RenderOutcome> {
        self.render().await
    }

    async fn render(&mut self) -> Result<RenderOutcome> {
        self.ensure_container()?;
        self.teardown();
        self.session = self.session.next();

        let view = match &self.scope {
            Some(scope) => project_graph(&self.model, scope),
            None => self.model.clone(),
        };
        let mut controller = ViewController::new(&view, self.orchestrator.settings().dim_opacity);
        controller.carry_over(&self.controller);

        let engine = self
            .document
            .as_ref()
            .and_then(|d| d.metadata.layout_engine.as_deref());
        let mode = choose_mode(&view, Some(&self.layout), engine);

        let surface_ready = self.orchestrator.wait_for_surface(self.backend.as_mut()).await;
        // Record the mount before the layout wait so a dropped render still
        // gets torn down by the next one.
        self.orchestrator.mount(self.backend.as_mut(), self.session, &view, mode);
        self.mounted = true;
        self.view = view;
        self.controller = controller;
        self.sync_styles();

        let outcome = self
            .orchestrator
            .settle(self.backend.as_mut(), &mut self.events, self.session, mode, surface_ready)
            .await;
        for event in outcome.deferred.iter().cloned() {
            self.apply_event(event);
        }
        Ok(outcome)
    }

    fn ensure_container(&self) -> Result<()> {
        if self.backend.container_exists(&self.container) {
            Ok(())
        } else {
            Err(ViewerError::MissingContainer {
                container: self.container.clone(),
            })
        }
    }

    fn teardown(&mut self) {
        if self.mounted {
            self.backend.destroy();
            self.mounted = false;
            tracing::debug!(session = self.session.0, "destroyed previous render");
        }
    }

    /// Tear down the rendered graph. Events still in flight become stale.
    pub fn destroy(&mut self) {
        self.teardown();
        self.session = self.session.next();
        self.view = Graph::default();
        self.controller = ViewController::default();
    }

    fn sync_styles(&mut self) {
        for (id, style) in self.controller.node_styles() {
            self.backend.set_node_style(id, style);
        }
        for (id, style) in self.controller.edge_styles() {
            self.backend.set_edge_style(id, style);
        }
    }

    pub fn collapse(&mut self, id: &str) -> bool {
        let changed = self.controller.collapse(id);
        if changed {
            self.sync_styles();
        }
        changed
    }

    pub fn expand(&mut self, id: &str) -> bool {
        let changed = self.controller.expand(id);
        if changed {
            self.sync_styles();
        }
        changed
    }

    pub fn collapse_by_type(&mut self, node_type: NodeType) -> usize {
        let n = self.controller.collapse_by_type(node_type);
        self.sync_styles();
        n
    }

    pub fn expand_by_type(&mut self, node_type: NodeType) -> usize {
        let n = self.controller.expand_by_type(node_type);
        self.sync_styles();
        n
    }

    pub fn set_focus(&mut self, scope: Option<FocusScope>) {
        self.controller.set_focus(scope);
        self.sync_styles();
    }

    /// Apply a backend notification. Returns false for events from an older
    /// session, which are dropped.
    pub fn handle_event(&mut self, event: RenderEvent) -> bool {
        if !self.mounted || event.session() != self.session {
            tracing::debug!(
                session = event.session().0,
                current = self.session.0,
                "ignoring stale render event"
            );
            return false;
        }
        self.apply_event(event)
    }

    /// Drain notifications that are already queued.
    pub fn pump_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.handle_event(event) {
                applied += 1;
            }
        }
        applied
    }

    fn apply_event(&mut self, event: RenderEvent) -> bool {
        match event {
            // Only meaningful while the orchestrator is waiting.
            RenderEvent::LayoutStop { .. } => false,
            RenderEvent::DragEnd { node_id, bounds, .. } => self.record_position(&node_id, bounds),
            RenderEvent::Select { node_id, .. } => {
                self.select(node_id);
                true
            }
        }
    }

    fn record_position(&mut self, id: &str, bounds: Rect) -> bool {
        if let Err(err) = self.model.set_position(id, bounds) {
            tracing::debug!(%err, "position for node outside the model");
            return false;
        }
        // A projected view holds a subset of the model, so a miss here is expected.
        self.view.set_position(id, bounds).ok();
        self.layout.insert(id.to_string(), bounds);
        true
    }

    /// Selecting a system or container focuses it; clearing the selection
    /// clears the focus. Other node types leave the focus alone.
    fn select(&mut self, node_id: Option<String>) {
        let focus = match node_id.as_deref().and_then(|id| self.view.node(id)) {
            Some(node) => match node.node_type {
                NodeType::System => Some(Some(FocusScope::System(node.id.clone()))),
                NodeType::Container => Some(Some(FocusScope::Container(node.id.clone()))),
                _ => None,
            },
            None => Some(None),
        };
        self.selected = node_id;
        if let Some(scope) = focus {
            self.set_focus(scope);
        }
    }

    /// Pull live bounds from the backend into the model.
    fn capture_positions(&mut self) {
        if !self.mounted {
            return;
        }
        for (id, bounds) in self.backend.node_bounds() {
            if self.model.set_position(&id, bounds).is_ok() {
                self.layout.insert(id, bounds);
            }
        }
    }

    pub async fn add_node(&mut self, node: Node) -> Result<RenderOutcome> {
        self.capture_positions();
        self.model.add_node(node)?;
        self.render().await
    }

    /// Remove `id` with its descendants and their edges.
    pub async fn remove_node(&mut self, id: &str) -> Result<Vec<Node>> {
        self.capture_positions();
        let removed = self.model.remove_node(id)?;
        for node in &removed {
            self.layout.remove(&node.id);
        }
        self.render().await?;
        Ok(removed)
    }

    /// Returns the id the edge was stored under.
    pub async fn add_edge(&mut self, edge: Edge) -> Result<String> {
        self.capture_positions();
        let id = self.model.add_edge(edge)?;
        self.render().await?;
        Ok(id)
    }

    pub async fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        self.capture_positions();
        let edge = self.model.remove_edge(id)?;
        self.render().await?;
        Ok(edge)
    }

    /// Serialize the model and write it back into the loaded document,
    /// merging positions into the document's layout.
    pub fn save(&mut self) -> Serialized {
        self.capture_positions();
        let serialized = serialize(&self.model);
        if let Some(document) = self.document.as_mut() {
            document.architecture = serialized.architecture_body.clone();
            document.merge_layout(&serialized.layout_map);
        }
        tracing::info!(
            nodes = serialized.layout_map.len(),
            "saved architecture"
        );
        serialized
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn document(&self) -> Option<&ArchitectureDocument> {
        self.document.as_ref()
    }

    pub fn model(&self) -> &Graph {
        &self.model
    }

    /// What is currently mounted.
    pub fn view(&self) -> &Graph {
        &self.view
    }

    pub fn controller(&self) -> &ViewController {
        &self.controller
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}
