use std::ops::Range;

use parking_lot::Mutex;
use scrollpdf_core::{TitleSender, TocEntry, TocLauncher, TocRequest};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Selection state of the table-of-contents picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocPicker {
    entries: Vec<TocEntry>,
    selected: usize,
}

impl TocPicker {
    pub fn new(entries: Vec<TocEntry>) -> Self {
        Self {
            entries,
            selected: 0,
        }
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&TocEntry> {
        self.entries.get(self.selected)
    }

    /// Moves the selection by `delta`, clamped to the entry list. Returns
    /// whether the selection changed.
    pub fn move_selection(&mut self, delta: isize) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let last = self.entries.len() - 1;
        let next = if delta < 0 {
            self.selected.saturating_sub(delta.unsigned_abs())
        } else {
            self.selected.saturating_add(delta.unsigned_abs()).min(last)
        };
        if next != self.selected {
            self.selected = next;
            true
        } else {
            false
        }
    }
}

/// Rows of a `len`-entry list to show in a `height`-row window so that
/// `selected` stays visible, keeping it as close to the middle as the list
/// allows.
pub fn visible_window(selected: usize, len: usize, height: usize) -> Range<usize> {
    if height == 0 || len == 0 {
        return 0..0;
    }
    if len <= height {
        return 0..len;
    }
    let start = selected
        .min(len - 1)
        .saturating_sub(height / 2)
        .min(len - height);
    start..start + height
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocSnapshot {
    pub title: String,
    pub entries: Vec<TocEntry>,
    pub selected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocCommand {
    Move(isize),
    Activate,
    Shutdown,
}

/// Handle to a running picker task. Commands go in over a channel; the
/// picker's state comes back as snapshots; jumps are sent to the viewer as
/// title signals.
pub struct TocPeer {
    commands: UnboundedSender<TocCommand>,
    snapshots: watch::Receiver<TocSnapshot>,
    task: JoinHandle<()>,
}

impl TocPeer {
    pub fn spawn(handle: &Handle, request: TocRequest) -> Self {
        let picker = TocPicker::new(request.entries);
        let initial = TocSnapshot {
            title: request.title,
            entries: picker.entries().to_vec(),
            selected: picker.selected(),
        };
        info!(title = %initial.title, entries = initial.entries.len(), "starting toc peer");

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(initial);
        let task = handle.spawn(run_picker(picker, request.signal, command_rx, snapshot_tx));
        Self {
            commands,
            snapshots,
            task,
        }
    }

    /// Returns `false` once the picker has stopped.
    pub fn send(&self, command: TocCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn snapshot(&self) -> TocSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Whether the picker published a new selection since the last call.
    pub fn take_update(&mut self) -> bool {
        let changed = self.snapshots.has_changed().unwrap_or(false);
        if changed {
            self.snapshots.borrow_and_update();
        }
        changed
    }

    /// Waits for the next published selection. Returns `false` when the
    /// picker has stopped.
    pub async fn changed(&mut self) -> bool {
        self.snapshots.changed().await.is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(TocCommand::Shutdown);
        if let Err(err) = self.task.await {
            debug!(error = %err, "toc peer task ended abnormally");
        }
    }
}

async fn run_picker(
    mut picker: TocPicker,
    signal: TitleSender,
    mut commands: UnboundedReceiver<TocCommand>,
    snapshots: watch::Sender<TocSnapshot>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            TocCommand::Move(delta) => {
                if picker.move_selection(delta) {
                    let selected = picker.selected();
                    snapshots.send_modify(|snapshot| snapshot.selected = selected);
                }
            }
            TocCommand::Activate => {
                let Some(entry) = picker.selected_entry() else {
                    continue;
                };
                debug!(page = entry.page, label = %entry.label.trim(), "toc jump");
                if !signal.jump(entry.page) {
                    break;
                }
            }
            TocCommand::Shutdown => break,
        }
    }
    debug!(title = signal.title(), "toc peer stopped");
}

/// Launches the picker as a task on a tokio runtime and parks its handle
/// until the terminal loop collects it.
pub struct TokioTocLauncher {
    handle: Handle,
    peer: Mutex<Option<TocPeer>>,
}

impl TokioTocLauncher {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            peer: Mutex::new(None),
        }
    }

    pub fn take_peer(&self) -> Option<TocPeer> {
        self.peer.lock().take()
    }
}

impl TocLauncher for TokioTocLauncher {
    fn launch(&self, request: TocRequest) {
        let peer = TocPeer::spawn(&self.handle, request);
        *self.peer.lock() = Some(peer);
    }
}
