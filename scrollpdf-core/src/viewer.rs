use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{normalize_document_uri, DocumentProvider, TextRect};
use crate::compositor::{Compositor, Surface};
use crate::config::ViewerConfig;
use crate::error::LoadError;
use crate::geometry::Geometry;
use crate::input::{Action, Button, Key, Keymap, Response};
use crate::scroll::{ScrollPosition, ScrollState};
use crate::session::Session;
use crate::signal::{parse_refresh_signal, RefreshSignal, TitleSender};
use crate::toc::{parse_toc, TocEntry, TocLauncher, TocRequest};

/// The continuous-scroll viewer: callbacks for the windowing side plus the
/// state they drive.
pub struct Viewer {
    provider: Arc<dyn DocumentProvider>,
    uri: String,
    title: String,
    geometry: Geometry,
    session: Option<Session>,
    scroll: ScrollState,
    compositor: Compositor,
    keymap: Keymap,
    scroll_step: i64,
    pending_jump: usize,
}

impl Viewer {
    /// Opens `path` (a filesystem path or `file://` URI). Fails without
    /// creating a viewer when the document cannot be opened.
    pub fn open(
        provider: Arc<dyn DocumentProvider>,
        path: &str,
        title: impl Into<String>,
        geometry: Geometry,
        config: &ViewerConfig,
    ) -> Result<Self, LoadError> {
        let uri = normalize_document_uri(path);
        let session = Session::open(provider.as_ref(), &uri, &geometry)?;
        Ok(Self {
            provider,
            uri,
            title: title.into(),
            geometry,
            session: Some(session),
            scroll: ScrollState::new(geometry.page_height),
            compositor: Compositor::new(geometry, config.gap_color),
            keymap: config.keymap(),
            scroll_step: config.scroll_step,
            pending_jump: 0,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn position(&self) -> ScrollPosition {
        self.scroll.position()
    }

    /// Page number typed so far, zero when none.
    pub fn pending_jump(&self) -> usize {
        self.pending_jump
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    pub fn page_count(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.document().page_count())
    }

    pub fn cached_pages(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.cache().len())
    }

    pub fn toc_entries(&self) -> Vec<TocEntry> {
        self.session
            .as_ref()
            .map(|s| parse_toc(s.toc_text()))
            .unwrap_or_default()
    }

    pub fn page_text(&self, page: usize) -> Result<String, LoadError> {
        self.session
            .as_ref()
            .ok_or(LoadError::NoDocument)?
            .document()
            .extract_text(page)
    }

    pub fn find_text(&self, page: usize, query: &str) -> Result<Vec<TextRect>, LoadError> {
        self.session
            .as_ref()
            .ok_or(LoadError::NoDocument)?
            .document()
            .find_text(page, query)
    }

    pub fn paint(&mut self, surface: &mut dyn Surface) {
        self.compositor
            .paint(surface, self.scroll.position(), &mut self.session);
    }

    pub fn advance(&mut self, delta: i64) {
        self.scroll.advance(delta, &mut self.session);
    }

    pub fn jump_to(&mut self, page: usize) -> bool {
        let jumped = self.scroll.jump_to(page, &mut self.session);
        if !jumped {
            debug!(page, "jump target cannot be rendered");
        }
        jumped
    }

    pub fn on_button(&mut self, button: Button, _x: i32, _y: i32) -> Response {
        match button {
            Button::WheelUp => self.advance(self.scroll_step.saturating_neg()),
            Button::WheelDown => self.advance(self.scroll_step),
            Button::Other(_) => return Response::Ignored,
        }
        Response::Redraw
    }

    pub fn on_key(&mut self, key: Key) -> Response {
        if let Key::Digit(digit) = key {
            self.pending_jump = self
                .pending_jump
                .saturating_mul(10)
                .saturating_add(usize::from(digit));
            return Response::Ignored;
        }

        let pending = std::mem::take(&mut self.pending_jump);
        match self.keymap.action(key) {
            Some(Action::Scroll { steps }) => {
                self.advance(i64::from(steps).saturating_mul(self.scroll_step));
                Response::Redraw
            }
            Some(Action::ConfirmJump) if pending > 0 => {
                if self.jump_to(pending) {
                    Response::Redraw
                } else {
                    Response::Ignored
                }
            }
            Some(Action::Quit) => Response::Quit,
            Some(Action::ConfirmJump) | None => Response::Ignored,
        }
    }

    /// Handles a title-string signal: `"...@<page>*"` jumps to `page`, any
    /// other title reloads the document from scratch.
    pub fn on_refresh(&mut self, signal: &str) -> Result<(), LoadError> {
        match parse_refresh_signal(signal) {
            Some(RefreshSignal::Reload) => self.reload(),
            Some(RefreshSignal::Jump(page)) => {
                self.jump_to(page);
                Ok(())
            }
            None => {
                warn!(signal, "ignoring refresh signal with a malformed page");
                Ok(())
            }
        }
    }

    /// Closes the current document and opens it again with an empty cache.
    /// The scroll position is kept.
    pub fn reload(&mut self) -> Result<(), LoadError> {
        self.session = None;
        let session = Session::open(self.provider.as_ref(), &self.uri, &self.geometry)?;
        info!(uri = %self.uri, "reloaded document");
        self.session = Some(session);
        Ok(())
    }

    /// Launches the table-of-contents peer when the document has an outline.
    pub fn on_init(&mut self, launcher: &dyn TocLauncher, signal: TitleSender) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        let toc_text = session.toc_text();
        if !toc_text.contains('@') {
            return false;
        }
        launcher.launch(TocRequest {
            title: format!("{}-toc", self.title),
            entries: parse_toc(toc_text),
            signal,
        });
        true
    }

    /// Releases the document. Also happens on drop.
    pub fn close(&mut self) {
        self.session = None;
    }
}
