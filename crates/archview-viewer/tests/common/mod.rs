#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use archview_core::{Rect, Shape};
use archview_viewer::{
    EdgeStyle, ElementSet, LayoutAlgorithm, NodeStyle, RenderBackend, RenderEvent, SessionId,
    StyleFn, SurfaceSize,
};
use tokio::sync::{mpsc, watch};

pub const CONTAINER: &str = "diagram";

/// Everything the fake engine was asked to do, shared with the test body.
#[derive(Debug, Default)]
pub struct FakeState {
    pub size: SurfaceSize,
    pub mounted: Option<(SessionId, ElementSet)>,
    pub mounts: usize,
    pub shapes: HashMap<String, Shape>,
    pub layouts: Vec<(SessionId, LayoutAlgorithm)>,
    pub fits: Vec<f64>,
    pub node_styles: HashMap<String, NodeStyle>,
    pub edge_styles: HashMap<String, EdgeStyle>,
    /// Bounds reported back by `node_bounds`.
    pub bounds: Vec<(String, Rect)>,
    pub destroyed: usize,
    /// Answer `run_layout` with an immediate `LayoutStop`.
    pub auto_complete: bool,
    pub resize: Option<watch::Receiver<SurfaceSize>>,
    /// Simulates the mount point being removed from the host.
    pub detached: bool,
}

pub struct FakeBackend {
    pub state: Arc<Mutex<FakeState>>,
    events: mpsc::UnboundedSender<RenderEvent>,
}

impl FakeBackend {
    pub fn new(size: SurfaceSize) -> (Self, Arc<Mutex<FakeState>>, mpsc::UnboundedSender<RenderEvent>, mpsc::UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(FakeState {
            size,
            auto_complete: true,
            ..Default::default()
        }));
        let backend = FakeBackend {
            state: state.clone(),
            events: tx.clone(),
        };
        (backend, state, tx, rx)
    }

    pub fn sized() -> (Self, Arc<Mutex<FakeState>>, mpsc::UnboundedSender<RenderEvent>, mpsc::UnboundedReceiver<RenderEvent>) {
        Self::new(SurfaceSize::new(800.0, 600.0))
    }
}

impl RenderBackend for FakeBackend {
    fn container_exists(&self, container: &str) -> bool {
        container == CONTAINER && !self.state.lock().unwrap().detached
    }

    fn surface_size(&self) -> SurfaceSize {
        self.state.lock().unwrap().size
    }

    fn resize_notifications(&mut self) -> Option<watch::Receiver<SurfaceSize>> {
        self.state.lock().unwrap().resize.clone()
    }

    fn mount(&mut self, session: SessionId, elements: &ElementSet, style: StyleFn) {
        let mut state = self.state.lock().unwrap();
        state.shapes = elements
            .nodes
            .iter()
            .map(|n| (n.id.clone(), style(&n.node_type)))
            .collect();
        state.mounted = Some((session, elements.clone()));
        state.mounts += 1;
    }

    fn run_layout(&mut self, session: SessionId, algorithm: LayoutAlgorithm) {
        let mut state = self.state.lock().unwrap();
        state.layouts.push((session, algorithm));
        if state.auto_complete {
            let _ = self.events.send(RenderEvent::LayoutStop { session });
        }
    }

    fn fit(&mut self, padding: f64) {
        self.state.lock().unwrap().fits.push(padding);
    }

    fn set_node_style(&mut self, id: &str, style: NodeStyle) {
        self.state.lock().unwrap().node_styles.insert(id.to_string(), style);
    }

    fn set_edge_style(&mut self, id: &str, style: EdgeStyle) {
        self.state.lock().unwrap().edge_styles.insert(id.to_string(), style);
    }

    fn node_bounds(&self) -> Vec<(String, Rect)> {
        self.state.lock().unwrap().bounds.clone()
    }

    fn destroy(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.mounted = None;
        state.node_styles.clear();
        state.edge_styles.clear();
        state.destroyed += 1;
    }
}

pub fn mounted_ids(state: &Arc<Mutex<FakeState>>) -> Vec<String> {
    state
        .lock()
        .unwrap()
        .mounted
        .as_ref()
        .map(|(_, set)| set.nodes.iter().map(|n| n.id.clone()).collect())
        .unwrap_or_default()
}

pub fn shape_of(state: &Arc<Mutex<FakeState>>, id: &str) -> Option<Shape> {
    state.lock().unwrap().shapes.get(id).copied()
}
