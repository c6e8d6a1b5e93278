use std::io::{self, Write};

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind},
    terminal::{Clear, ClearType},
};
use png::{BitDepth, ColorType, Encoder};
use scrollpdf_core::{Button, FrameBuffer, Key, Surface};

mod toc_peer;

pub use toc_peer::{visible_window, TocCommand, TocPeer, TocPicker, TocSnapshot, TokioTocLauncher};

pub struct KittyRenderer<W: Write> {
    writer: W,
    image_id: u32,
    placement_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub columns: u32,
    pub rows: u32,
}

impl DrawParams {
    pub fn clamped(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

/// Largest cell box that shows a `image_width` x `image_height` frame without
/// distortion inside `columns` x `rows` cells. Terminal pixel sizes of zero
/// mean unknown; cells are then assumed to be twice as tall as wide.
pub fn fit_to_cells(
    image_width: u32,
    image_height: u32,
    columns: u32,
    rows: u32,
    pixel_width: u32,
    pixel_height: u32,
) -> DrawParams {
    let columns = columns.max(1);
    let rows = rows.max(1);
    if image_width == 0 || image_height == 0 {
        return DrawParams::clamped(columns, rows);
    }

    let (cell_width, cell_height) = if pixel_width > 0 && pixel_height > 0 {
        (
            pixel_width as f32 / columns as f32,
            pixel_height as f32 / rows as f32,
        )
    } else {
        (1.0, 2.0)
    };
    let scale = (columns as f32 * cell_width / image_width as f32)
        .min(rows as f32 * cell_height / image_height as f32);
    let fit_columns = (image_width as f32 * scale / cell_width).round() as u32;
    let fit_rows = (image_height as f32 * scale / cell_height).round() as u32;
    DrawParams::clamped(fit_columns.min(columns), fit_rows.min(rows))
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            image_id: 1,
            placement_id: 1,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Transmits the composed viewport `frame` as one PNG and places it at the
    /// cursor, replacing the previous frame. Pages and gap bands are already
    /// stitched into the frame, so every redraw is a single image.
    pub fn draw(&mut self, frame: &FrameBuffer, params: DrawParams) -> Result<()> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, frame.width() as u32, frame.height() as u32);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&frame.to_rgba_bytes())?;
        writer.finish()?;

        let encoded = BASE64.encode(&buffer);
        let mut chunks = encoded.as_bytes().chunks(4096).peekable();
        let mut first = true;

        while let Some(chunk) = chunks.next() {
            let more = chunks.peek().is_some();
            if first {
                write!(
                    self.writer,
                    "\u{1b}_Ga=T,f=100,C=1,q=2,i={},p={},c={},r={},z=-1,m={}",
                    self.image_id,
                    self.placement_id,
                    params.columns,
                    params.rows,
                    if more { 1 } else { 0 }
                )?;
                first = false;
            } else {
                write!(self.writer, "\u{1b}_Gm={},q=2", if more { 1 } else { 0 })?;
            }
            if !chunk.is_empty() {
                self.writer.write_all(b";")?;
                self.writer.write_all(chunk)?;
            }
            write!(self.writer, "\u{1b}\\")?;
        }

        self.writer.flush()?;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// Ends a synchronized update; the terminal shows the buffered changes at once.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Removes every image this renderer placed.
    pub fn delete_images(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}_Ga=d,d=A,q=2\u{1b}\\")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Key(Key),
    Button { button: Button, x: i32, y: i32 },
    OpenTableOfContents,
    CloseOverlay,
    TocMoveSelection { delta: isize },
    TocActivateSelection,
    Reload,
    Resize,
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Toc,
}

/// Translates terminal events into viewer input. In normal mode keys go to
/// the viewer's keymap untouched, except for the few the terminal host owns:
/// Tab (table of contents), Ctrl-R (reload) and Ctrl-C (quit).
#[derive(Debug, Default)]
pub struct EventMapper {
    mode: InputMode,
}

impl EventMapper {
    const TOC_PAGE: isize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Resize(..) => UiEvent::Resize,
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => UiEvent::Quit,
            Event::Key(key) => match self.mode {
                InputMode::Normal => self.map_key_normal(key),
                InputMode::Toc => self.map_key_toc(key),
            },
            Event::Mouse(mouse) => match self.mode {
                InputMode::Normal => map_mouse_normal(mouse),
                InputMode::Toc => match mouse.kind {
                    MouseEventKind::ScrollUp => UiEvent::TocMoveSelection { delta: -1 },
                    MouseEventKind::ScrollDown => UiEvent::TocMoveSelection { delta: 1 },
                    _ => UiEvent::None,
                },
            },
            _ => UiEvent::None,
        }
    }

    fn map_key_normal(&mut self, event: KeyEvent) -> UiEvent {
        let key = match (event.code, event.modifiers) {
            (KeyCode::Char('r'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                return UiEvent::Reload
            }
            (_, modifiers) if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                return UiEvent::None
            }
            (KeyCode::Tab, _) => return UiEvent::OpenTableOfContents,
            (KeyCode::Char(c), _) => Key::from_char(c),
            (KeyCode::Enter, _) => Key::Enter,
            (KeyCode::Esc, _) => Key::Escape,
            (KeyCode::Up, _) => Key::Up,
            (KeyCode::Down, _) => Key::Down,
            (KeyCode::Left, _) => Key::Left,
            (KeyCode::Right, _) => Key::Right,
            (KeyCode::PageUp, _) => Key::PageUp,
            (KeyCode::PageDown, _) => Key::PageDown,
            (KeyCode::Home, _) => Key::Home,
            (KeyCode::End, _) => Key::End,
            _ => return UiEvent::None,
        };
        UiEvent::Key(key)
    }

    fn map_key_toc(&mut self, event: KeyEvent) -> UiEvent {
        match event.code {
            KeyCode::Esc | KeyCode::Tab | KeyCode::Char('q') => UiEvent::CloseOverlay,
            KeyCode::Enter => UiEvent::TocActivateSelection,
            KeyCode::Char('j') | KeyCode::Down => UiEvent::TocMoveSelection { delta: 1 },
            KeyCode::Char('k') | KeyCode::Up => UiEvent::TocMoveSelection { delta: -1 },
            KeyCode::PageDown => UiEvent::TocMoveSelection {
                delta: Self::TOC_PAGE,
            },
            KeyCode::PageUp => UiEvent::TocMoveSelection {
                delta: -Self::TOC_PAGE,
            },
            KeyCode::Char('g') | KeyCode::Home => UiEvent::TocMoveSelection { delta: isize::MIN },
            KeyCode::Char('G') | KeyCode::End => UiEvent::TocMoveSelection { delta: isize::MAX },
            _ => UiEvent::None,
        }
    }
}

fn map_mouse_normal(mouse: MouseEvent) -> UiEvent {
    let button = match mouse.kind {
        MouseEventKind::ScrollUp => Button::WheelUp,
        MouseEventKind::ScrollDown => Button::WheelDown,
        MouseEventKind::Down(MouseButton::Left) => Button::Other(1),
        MouseEventKind::Down(MouseButton::Middle) => Button::Other(2),
        MouseEventKind::Down(MouseButton::Right) => Button::Other(3),
        _ => return UiEvent::None,
    };
    UiEvent::Button {
        button,
        x: i32::from(mouse.column),
        y: i32::from(mouse.row),
    }
}

pub fn write_status_line<W: Write>(writer: &mut W, label: &str) -> io::Result<()> {
    write!(writer, "{}", label)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    #[test]
    fn kitty_draw_emits_protocol() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let frame = FrameBuffer::new(2, 2, u32::from_ne_bytes([255, 0, 0, 255]));

        renderer.draw(&frame, DrawParams::clamped(10, 5)).unwrap();
        let output = String::from_utf8(renderer.writer).unwrap();
        assert!(output.starts_with("\u{1b}_Ga=T,f=100,"));
        assert!(output.contains("c=10,r=5"));
        assert!(output.ends_with("\u{1b}\\"));
    }

    #[test]
    fn frames_fit_inside_the_cell_box() {
        let params = fit_to_cells(1750, 1600, 100, 50, 1000, 1000);
        assert_eq!(params, DrawParams { columns: 100, rows: 46 });

        let params = fit_to_cells(100, 400, 80, 24, 0, 0);
        assert_eq!(params, DrawParams { columns: 12, rows: 24 });

        assert_eq!(fit_to_cells(0, 0, 0, 0, 0, 0), DrawParams::clamped(1, 1));
    }

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse_event(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 7,
            row: 3,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn normal_mode_passes_keys_to_the_viewer() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('4'))),
            UiEvent::Key(Key::Digit(4))
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('u'))),
            UiEvent::Key(Key::Char('u'))
        );
        assert_eq!(mapper.map_event(key_event(KeyCode::Enter)), UiEvent::Key(Key::Enter));
        assert_eq!(mapper.map_event(key_event(KeyCode::PageDown)), UiEvent::Key(Key::PageDown));
        assert_eq!(mapper.map_event(key_event(KeyCode::Esc)), UiEvent::Key(Key::Escape));
        assert_eq!(mapper.map_event(key_event(KeyCode::F(5))), UiEvent::None);
    }

    #[test]
    fn host_shortcuts_are_not_forwarded() {
        let mut mapper = EventMapper::new();
        assert_eq!(mapper.map_event(key_event(KeyCode::Tab)), UiEvent::OpenTableOfContents);
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            UiEvent::Reload
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            UiEvent::Quit
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            UiEvent::None
        );
    }

    #[test]
    fn wheel_maps_to_scroll_buttons() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::ScrollDown)),
            UiEvent::Button {
                button: Button::WheelDown,
                x: 7,
                y: 3
            }
        );
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::ScrollUp)),
            UiEvent::Button {
                button: Button::WheelUp,
                x: 7,
                y: 3
            }
        );
        assert_eq!(mapper.map_event(mouse_event(MouseEventKind::Moved)), UiEvent::None);
    }

    #[test]
    fn toc_mode_maps_navigation_keys() {
        let mut mapper = EventMapper::new();
        mapper.set_mode(InputMode::Toc);

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('j'))),
            UiEvent::TocMoveSelection { delta: 1 }
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Up)),
            UiEvent::TocMoveSelection { delta: -1 }
        );
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::ScrollDown)),
            UiEvent::TocMoveSelection { delta: 1 }
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Enter)),
            UiEvent::TocActivateSelection
        );
        assert_eq!(mapper.map_event(key_event(KeyCode::Esc)), UiEvent::CloseOverlay);
        assert_eq!(mapper.map_event(key_event(KeyCode::Tab)), UiEvent::CloseOverlay);
    }
}
