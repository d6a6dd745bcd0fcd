pub mod backend;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod settings;
pub mod viewer;

pub use backend::{
    EdgeElement, ElementSet, LayoutAlgorithm, NodeElement, RenderBackend, RenderEvent, SessionId,
    StyleFn, SurfaceSize,
};
pub use controller::{EdgeStyle, FocusScope, NodeStyle, ViewController, FULL_OPACITY};
pub use error::{Result, ViewerError};
pub use orchestrator::{choose_mode, LayoutMode, Orchestrator, RenderOutcome};
pub use settings::{read_settings, read_settings_from, settings_path, write_settings, write_settings_to, ViewerSettings};
pub use viewer::Viewer;
