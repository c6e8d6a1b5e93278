//! Viewport and scroll engine for a continuous-scroll document viewer.
//!
//! The crate owns everything between the document backend and the drawing
//! surface: the page cache, the scroll position, the compositor that stitches
//! adjacent pages into the viewport and the router that turns input events
//! into navigation.

pub mod backend;
pub mod cache;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod scroll;
pub mod session;
pub mod signal;
pub mod toc;
pub mod viewer;

pub use backend::{
    normalize_document_uri, uri_to_path, Document, DocumentProvider, PageBuffer, RenderRequest,
    RenderedPage, TextRect,
};
pub use cache::PageCache;
pub use compositor::{Compositor, FrameBuffer, Surface};
pub use config::ViewerConfig;
pub use error::{ConfigError, LoadError};
pub use geometry::{Geometry, LaunchArgs, ScreenSize};
pub use input::{Action, Button, Key, Keymap, Response};
pub use scroll::{PageSource, ScrollPosition, ScrollState};
pub use session::Session;
pub use signal::{parse_refresh_signal, title_channel, RefreshSignal, TitleReceiver, TitleSender};
pub use toc::{parse_toc, strip_heading_marker, TocEntry, TocLauncher, TocRequest};
pub use viewer::Viewer;

#[cfg(test)]
pub(crate) mod testing;
