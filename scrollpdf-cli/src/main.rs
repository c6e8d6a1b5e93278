use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType, SetTitle};
use directories::ProjectDirs;
use scrollpdf_core::{
    title_channel, DocumentProvider, FrameBuffer, Geometry, LaunchArgs, Response, ScreenSize,
    TitleSender, Viewer, ViewerConfig,
};
use scrollpdf_render::PdfRenderFactory;
use scrollpdf_tty::{
    fit_to_cells, visible_window, write_status_line, EventMapper, InputMode, KittyRenderer,
    TocCommand, TocPeer, TocSnapshot, TokioTocLauncher, UiEvent,
};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "scrollpdf",
    version,
    about = "Continuous-scroll PDF viewer for kitty-graphics terminals"
)]
struct Args {
    /// PDF file to open (path or file:// URI)
    path: String,

    /// Rendered page width in pixels; below 100 uses 70% of the screen width
    page_width: Option<String>,

    /// Viewport height in pixels; below 100 uses the screen height minus 40
    win_height: Option<String>,

    /// Page width as a percentage of page height; below 1 uses 80
    aspect_percent: Option<String>,

    /// Horizontal margin in page points trimmed from each side
    x_offset: Option<String>,
}

impl Args {
    fn launch_args(&self) -> LaunchArgs {
        LaunchArgs {
            page_width: lenient_number(self.page_width.as_deref()),
            window_height: lenient_number(self.win_height.as_deref()),
            aspect_percent: lenient_number(self.aspect_percent.as_deref()),
            x_offset: lenient_number(self.x_offset.as_deref()),
        }
    }
}

/// Present but unparsable arguments count as zero, which the geometry
/// fallbacks then replace.
fn lenient_number(arg: Option<&str>) -> Option<i64> {
    arg.map(|value| value.trim().parse().unwrap_or(0))
}

struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnableMouseCapture, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, DisableMouseCapture, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "scrollpdf", "scrollpdf")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = project_dirs.config_dir().join("config.toml");
    let config = ViewerConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let screen = match terminal::window_size() {
        Ok(size) => ScreenSize {
            width: u32::from(size.width),
            height: u32::from(size.height),
        },
        Err(err) => {
            debug!(?err, "terminal pixel size unavailable");
            ScreenSize::default()
        }
    };
    let geometry = Geometry::from_launch(args.launch_args(), config.page_gap, screen);
    info!(?geometry, "viewer geometry");

    let provider: Arc<dyn DocumentProvider> = Arc::new(PdfRenderFactory::new()?);
    let title = window_title(&args.path);
    let mut viewer = Viewer::open(provider, &args.path, title.clone(), geometry, &config)
        .with_context(|| format!("failed to open {}", args.path))?;

    let (signal, mut signals) = title_channel(title.clone());
    let launcher = TokioTocLauncher::new(tokio::runtime::Handle::current());
    viewer.on_init(&launcher, signal.clone());
    let mut toc_peer = launcher.take_peer();

    let guard = TerminalGuard::new()?;
    let mut renderer = KittyRenderer::new(io::stdout());
    set_window_title(&mut renderer, &title)?;
    renderer.clear_all()?;

    let mut mapper = EventMapper::new();
    let mut dirty = true;

    loop {
        if dirty {
            let overlay = match (mapper.mode(), toc_peer.as_ref()) {
                (InputMode::Toc, Some(peer)) => Some(peer.snapshot()),
                _ => None,
            };
            redraw(&mut renderer, &mut viewer, config.background, overlay.as_ref())?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(50))? {
            let ui_event = mapper.map_event(event::read()?);
            match handle_event(ui_event, &mut viewer, &mut mapper, toc_peer.as_ref(), &signal)
            {
                LoopAction::ContinueRedraw => dirty = true,
                LoopAction::StatusOnly => draw_status_line(&mut renderer, &status_text(&viewer))?,
                LoopAction::Continue => {}
                LoopAction::Quit => break,
            }
        }

        if let Some(peer) = toc_peer.as_mut() {
            if peer.take_update() && mapper.mode() == InputMode::Toc {
                dirty = true;
            }
        }

        while let Some(title_signal) = signals.try_recv() {
            set_window_title(&mut renderer, &title_signal)?;
            if let Err(err) = viewer.on_refresh(&title_signal) {
                warn!(%err, signal = %title_signal, "refresh failed");
            }
            mapper.set_mode(InputMode::Normal);
            renderer.clear_all()?;
            dirty = true;
        }
    }

    if let Some(peer) = toc_peer.take() {
        peer.shutdown().await;
    }
    viewer.close();
    renderer.delete_images()?;
    renderer.clear_all()?;
    drop(guard);
    Ok(())
}

enum LoopAction {
    Continue,
    ContinueRedraw,
    StatusOnly,
    Quit,
}

fn handle_event(
    event: UiEvent,
    viewer: &mut Viewer,
    mapper: &mut EventMapper,
    toc_peer: Option<&TocPeer>,
    signal: &TitleSender,
) -> LoopAction {
    match event {
        UiEvent::Key(key) => match viewer.on_key(key) {
            Response::Redraw => LoopAction::ContinueRedraw,
            Response::Quit => LoopAction::Quit,
            Response::Ignored => LoopAction::StatusOnly,
        },
        UiEvent::Button { button, x, y } => match viewer.on_button(button, x, y) {
            Response::Redraw => LoopAction::ContinueRedraw,
            Response::Quit => LoopAction::Quit,
            Response::Ignored => LoopAction::Continue,
        },
        UiEvent::OpenTableOfContents => match toc_peer {
            Some(peer) if !peer.is_finished() => {
                mapper.set_mode(InputMode::Toc);
                LoopAction::ContinueRedraw
            }
            _ => {
                debug!("no table of contents for this document");
                LoopAction::Continue
            }
        },
        UiEvent::CloseOverlay => {
            mapper.set_mode(InputMode::Normal);
            LoopAction::ContinueRedraw
        }
        UiEvent::TocMoveSelection { delta } => {
            send_toc_command(toc_peer, TocCommand::Move(delta));
            LoopAction::Continue
        }
        UiEvent::TocActivateSelection => {
            send_toc_command(toc_peer, TocCommand::Activate);
            LoopAction::Continue
        }
        UiEvent::Reload => {
            signal.reload();
            LoopAction::Continue
        }
        UiEvent::Resize => LoopAction::ContinueRedraw,
        UiEvent::Quit => LoopAction::Quit,
        UiEvent::None => LoopAction::Continue,
    }
}

fn send_toc_command(toc_peer: Option<&TocPeer>, command: TocCommand) {
    if let Some(peer) = toc_peer {
        if !peer.send(command) {
            debug!(?command, "toc peer is gone");
        }
    }
}

fn redraw(
    renderer: &mut KittyRenderer<io::Stdout>,
    viewer: &mut Viewer,
    background: u32,
    overlay: Option<&TocSnapshot>,
) -> Result<()> {
    let window = terminal::window_size()?;
    let total_cols = u32::from(window.columns).max(1);
    let total_rows = u32::from(window.rows).max(1);
    let image_rows = total_rows.saturating_sub(1).max(1);
    let image_pixel_height = u32::from(window.height) * image_rows / total_rows;

    let geometry = viewer.geometry();
    let mut frame = FrameBuffer::new(geometry.width, geometry.view_height, background);
    viewer.paint(&mut frame);

    let params = fit_to_cells(
        geometry.width as u32,
        geometry.view_height as u32,
        total_cols,
        image_rows,
        u32::from(window.width),
        image_pixel_height,
    );
    let start_col = total_cols.saturating_sub(params.columns) / 2;

    renderer.begin_sync_update()?;
    {
        let writer = renderer.writer();
        crossterm::execute!(writer, cursor::MoveTo(start_col as u16, 0))?;
    }
    renderer.draw(&frame, params)?;
    draw_status_line(renderer, &status_text(viewer))?;
    if let Some(snapshot) = overlay {
        draw_toc_overlay(renderer.writer(), snapshot, total_cols, image_rows)?;
    }
    renderer.end_sync_update()?;
    Ok(())
}

fn set_window_title(renderer: &mut KittyRenderer<io::Stdout>, title: &str) -> Result<()> {
    let writer = renderer.writer();
    crossterm::execute!(writer, SetTitle(title))?;
    Ok(())
}

fn status_text(viewer: &Viewer) -> String {
    let position = viewer.position();
    let mut status = match viewer.page_count() {
        Some(count) => format!(
            "{}  page {}/{}  +{}px",
            viewer.title(),
            position.page + 1,
            count,
            position.top
        ),
        None => format!("{}  (no document)", viewer.title()),
    };
    if viewer.pending_jump() > 0 {
        status.push_str(&format!(" | goto {}", viewer.pending_jump()));
    }
    status
}

fn draw_status_line(renderer: &mut KittyRenderer<io::Stdout>, status: &str) -> Result<()> {
    let window = terminal::window_size()?;
    let status_row = u32::from(window.rows).max(1) - 1;
    let writer = renderer.writer();
    crossterm::execute!(
        writer,
        cursor::MoveTo(0, status_row as u16),
        Clear(ClearType::CurrentLine)
    )?;
    write_status_line(writer, status)?;
    Ok(())
}

fn draw_toc_overlay(
    writer: &mut impl Write,
    snapshot: &TocSnapshot,
    total_cols: u32,
    rows_available: u32,
) -> Result<()> {
    const HEADER: &str = "Contents";

    let max_inner = total_cols.saturating_sub(6) as usize;
    let max_content = rows_available.saturating_sub(6) as usize;
    if max_inner < 10 || max_content == 0 || snapshot.entries.is_empty() {
        return Ok(());
    }

    let widest = snapshot
        .entries
        .iter()
        .map(|entry| toc_row(&entry.label, entry.page, false).chars().count())
        .max()
        .unwrap_or(0);
    let inner = widest.max(HEADER.len()).clamp(20.min(max_inner), max_inner);
    let window = visible_window(snapshot.selected, snapshot.entries.len(), max_content);
    let content_rows = window.len();

    let left = (total_cols as usize).saturating_sub(inner + 2) / 2;
    let top = (rows_available as usize).saturating_sub(content_rows + 4) / 2;
    let border = format!("+{}+", "-".repeat(inner));

    let mut lines = Vec::with_capacity(content_rows + 4);
    lines.push(border.clone());
    lines.push(format!("|{:^inner$}|", HEADER));
    lines.push(format!("|{}|", "-".repeat(inner)));
    for index in window {
        let entry = &snapshot.entries[index];
        let row = toc_row(&entry.label, entry.page, index == snapshot.selected);
        lines.push(format!("|{}|", fit_width(row, inner)));
    }
    lines.push(border);

    for (offset, line) in lines.iter().enumerate() {
        crossterm::queue!(
            writer,
            cursor::MoveTo(left as u16, (top + offset) as u16),
            SetAttribute(Attribute::Reverse),
            Print(line),
            SetAttribute(Attribute::Reset)
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn toc_row(label: &str, page: usize, selected: bool) -> String {
    let marker = if selected { '>' } else { ' ' };
    format!("{marker} {label} (p{})", page + 1)
}

/// Pads or cuts `text` to exactly `width` characters, marking cuts with "...".
fn fit_width(text: String, width: usize) -> String {
    let len = text.chars().count();
    if len > width {
        if width <= 3 {
            return text.chars().take(width).collect();
        }
        let mut cut: String = text.chars().take(width - 3).collect();
        cut.push_str("...");
        return cut;
    }
    let mut padded = text;
    padded.push_str(&" ".repeat(width - len));
    padded
}

fn window_title(path: &str) -> String {
    let trimmed = path.strip_prefix("file://").unwrap_or(path);
    let name = Path::new(trimmed)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string());
    format!("auto-pdf-{name}")
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "scrollpdf.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
