use fbpad_vt::{Rgb, VtTerminal};

use crate::layout::{region_for, Region, BORDER_WIDTH};
use crate::lock::ScreenLock;
use crate::pty::PtyError;
use crate::slot::{SlotId, SplitMode, Tag, TagState};

/// Tag-list strip colors.
const LIST_FG: Rgb = Rgb::from_u32(0x96cb5c);
const LIST_BG: Rgb = Rgb::from_u32(0x516f7b);
/// Tag character colors indexed by the tag's live terminal count.
const LIST_COLORS: [Rgb; 3] = [Rgb::from_u32(0x173f4f), LIST_FG, Rgb::from_u32(0x68cbc0)];

/// A terminal that can occupy a slot.
pub trait Terminal {
    fn vt(&self) -> &VtTerminal;
    fn vt_mut(&mut self) -> &mut VtTerminal;
    /// Resize both the emulator and the program's terminal.
    fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError>;
    /// Send user input to the program.
    fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError>;
    /// Notify the program that its slot was hidden or shown.
    fn set_shown(&mut self, shown: bool);
}

/// The output surface the multiplexer paints through.
///
/// Drawing happens inside the region last passed to [`Screen::configure`].
pub trait Screen {
    /// Screen size in pixels as `(height, width)`.
    fn size(&self) -> (usize, usize);
    /// Character cell size in pixels as `(height, width)`.
    fn cell_size(&self) -> (usize, usize);
    fn configure(&mut self, region: Region);
    /// Paint a terminal into the region: every cell when `full`, otherwise
    /// only what changed since the last paint. `None` clears the region.
    fn draw(&mut self, vt: Option<&mut VtTerminal>, full: bool);
    /// Draw a frame `width` pixels wide just outside the region; `None`
    /// erases it.
    fn border(&mut self, color: Option<Rgb>, width: usize);
    fn save_snapshot(&mut self, slot: usize);
    /// Restore a saved snapshot. Returns false when none is usable.
    fn load_snapshot(&mut self, slot: usize) -> bool;
    fn drop_snapshot(&mut self, slot: usize);
    /// Draw one character at a text position of the region.
    fn put(&mut self, ch: char, row: usize, col: usize, fg: Rgb, bg: Rgb, bold: bool);
}

/// Errors from setting up a multiplexer.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    #[error("no tags configured")]
    NoTags,
    #[error("tag {0:?} is configured twice")]
    DuplicateTag(char),
    #[error("snapshot tag {0:?} is not a configured tag")]
    UnknownSnapshotTag(char),
}

/// Multiplexer settings.
#[derive(Clone, Debug)]
pub struct MuxOptions {
    /// One character per tag, in order.
    pub tags: String,
    /// Tags whose slots keep snapshots while hidden.
    pub snapshot_tags: String,
    pub passphrase: Option<String>,
    pub border_color: Rgb,
}

/// How a slot is brought onto the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Show {
    /// Paint pending changes only.
    Visible,
    /// Restore the snapshot and paint changes, or fall back to `Redraw`.
    Load,
    /// Repaint everything.
    Redraw,
}

struct Slot<T> {
    term: Option<T>,
    /// Text size last applied to the terminal, as `(cols, rows)`.
    geometry: Option<(u16, u16)>,
}

/// Owns the tags, their terminal slots and the session state, and sequences
/// hiding and showing slots on the screen.
///
/// There is one multiplexer per process, owned by the event loop.
pub struct Multiplexer<T, S> {
    screen: S,
    tags: Vec<Tag>,
    slots: Vec<Slot<T>>,
    current_tag: usize,
    last_tag: usize,
    tag_lock: bool,
    lock: ScreenLock,
    exit_requested: bool,
    border_color: Rgb,
}

impl<T: Terminal, S: Screen> Multiplexer<T, S> {
    pub fn new(options: MuxOptions, screen: S) -> Result<Self, MuxError> {
        let mut tags: Vec<Tag> = Vec::new();
        for ch in options.tags.chars() {
            if tags.iter().any(|t| t.ch == ch) {
                return Err(MuxError::DuplicateTag(ch));
            }
            tags.push(Tag::new(ch, options.snapshot_tags.contains(ch)));
        }
        if tags.is_empty() {
            return Err(MuxError::NoTags);
        }
        if let Some(ch) = options.snapshot_tags.chars().find(|c| !options.tags.contains(*c)) {
            return Err(MuxError::UnknownSnapshotTag(ch));
        }

        let slots = (0..2 * tags.len())
            .map(|_| Slot {
                term: None,
                geometry: None,
            })
            .collect();

        Ok(Self {
            screen,
            tags,
            slots,
            current_tag: 0,
            last_tag: 0,
            tag_lock: false,
            lock: ScreenLock::new(options.passphrase),
            exit_requested: false,
            border_color: options.border_color,
        })
    }

    pub fn ntags(&self) -> usize {
        self.tags.len()
    }

    pub fn tag(&self, tag: usize) -> &Tag {
        &self.tags[tag]
    }

    /// Index of the tag selected by `ch`.
    pub fn tag_index(&self, ch: char) -> Option<usize> {
        self.tags.iter().position(|t| t.ch == ch)
    }

    pub fn current_tag(&self) -> usize {
        self.current_tag
    }

    pub fn last_tag(&self) -> usize {
        self.last_tag
    }

    /// The active slot.
    pub fn current_slot(&self) -> SlotId {
        self.top_slot(self.current_tag)
    }

    /// The slot last active in `tag`.
    pub fn top_slot(&self, tag: usize) -> SlotId {
        SlotId::new(tag, self.tags[tag].top)
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    fn index(&self, slot: SlotId) -> usize {
        slot.index(self.tags.len())
    }

    pub fn terminal(&self, slot: SlotId) -> Option<&T> {
        self.slots[self.index(slot)].term.as_ref()
    }

    pub fn terminal_mut(&mut self, slot: SlotId) -> Option<&mut T> {
        let idx = self.index(slot);
        self.slots[idx].term.as_mut()
    }

    pub fn current_terminal(&self) -> Option<&T> {
        self.terminal(self.current_slot())
    }

    pub fn is_live(&self, slot: SlotId) -> bool {
        self.terminal(slot).is_some()
    }

    /// Slots holding a live terminal, in index order.
    pub fn live_slots(&self) -> Vec<SlotId> {
        let ntags = self.tags.len();
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.term.is_some())
            .map(|(i, _)| SlotId::from_index(i, ntags))
            .collect()
    }

    /// The next live slot after the current one in index order, wrapping
    /// around; the current slot when no other is live.
    pub fn next_live_slot(&self) -> SlotId {
        let ntags = self.tags.len();
        let nterms = self.slots.len();
        let cur = self.index(self.current_slot());
        let mut n = (cur + 1) % nterms;
        while n != cur {
            if self.slots[n].term.is_some() {
                break;
            }
            n = (n + 1) % nterms;
        }
        SlotId::from_index(n, ntags)
    }

    /// Whether `slot` is on screen: the current slot, or its partner while
    /// the current tag is split.
    pub fn is_visible(&self, slot: SlotId) -> bool {
        let cur = self.current_slot();
        slot == cur || (self.tags[cur.tag].split.is_split() && slot == cur.partner())
    }

    pub fn tag_state(&self, tag: usize) -> TagState {
        let live = self.is_live(SlotId::primary(tag)) || self.is_live(SlotId::secondary(tag));
        match (live, self.tags[tag].split) {
            (false, _) => TagState::Closed,
            (true, SplitMode::None) => TagState::SingleFullscreen,
            (true, SplitMode::Horizontal) => TagState::SplitHorizontal,
            (true, SplitMode::Vertical) => TagState::SplitVertical,
        }
    }

    /// Screen region of `slot` under its tag's current split.
    pub fn region(&self, slot: SlotId) -> Region {
        region_for(
            self.tags[slot.tag].split,
            slot.role,
            self.screen.size(),
            self.screen.cell_size(),
        )
    }

    /// Text rows of the current slot's region.
    pub fn text_rows(&self) -> u16 {
        self.region(self.current_slot())
            .text_size(self.screen.cell_size())
            .1
    }

    pub fn tag_lock_enabled(&self) -> bool {
        self.tag_lock
    }

    pub fn toggle_tag_lock(&mut self) {
        self.tag_lock = !self.tag_lock;
        log::debug!("tag lock {}", if self.tag_lock { "on" } else { "off" });
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn lock_screen(&mut self) {
        self.lock.lock();
        if self.lock.is_locked() {
            log::info!("screen locked");
        }
    }

    /// Feed a keystroke to the screen lock. Returns true if it unlocked.
    pub fn feed_lock(&mut self, byte: u8) -> bool {
        self.lock.feed(byte)
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Point the screen at `slot`'s region and bring its terminal to the
    /// region's text size.
    fn configure(&mut self, slot: SlotId) {
        let region = self.region(slot);
        self.screen.configure(region);

        let size = region.text_size(self.screen.cell_size());
        let idx = self.index(slot);
        let entry = &mut self.slots[idx];
        if let Some(term) = entry.term.as_mut() {
            if entry.geometry != Some(size) {
                let (cols, rows) = size;
                // Geometry is only recorded once applied, so a failed
                // resize is retried on the next show.
                match term.resize(cols, rows) {
                    Ok(()) => entry.geometry = Some(size),
                    Err(e) => log::warn!("failed to resize slot {idx} to {cols}x{rows}: {e}"),
                }
            }
        }
    }

    fn hide(&mut self, slot: SlotId, save: bool) {
        if !save {
            return;
        }
        let idx = self.index(slot);
        let eligible = self.tags[slot.tag].snapshot;
        if let Some(term) = self.slots[idx].term.as_mut() {
            term.set_shown(false);
            if eligible {
                self.screen.save_snapshot(idx);
            }
        }
    }

    fn show(&mut self, slot: SlotId, mode: Show) -> Show {
        self.configure(slot);
        let idx = self.index(slot);
        let live = self.slots[idx].term.is_some();

        let mut mode = mode;
        if mode == Show::Load
            && !(live && self.tags[slot.tag].snapshot && self.screen.load_snapshot(idx))
        {
            mode = Show::Redraw;
        }

        let vt = self.slots[idx].term.as_mut().map(|t| t.vt_mut());
        self.screen.draw(vt, mode == Show::Redraw);

        if mode != Show::Visible {
            if let Some(term) = self.slots[idx].term.as_mut() {
                term.set_shown(true);
            }
        }
        mode
    }

    fn hide_show(&mut self, old: SlotId, save: bool, new: SlotId, mode: Show) -> Show {
        self.hide(old, save);
        if self.tags[old.tag].split.is_split() && old.tag == new.tag {
            self.screen.border(None, BORDER_WIDTH);
        }
        let shown = self.show(new, mode);
        if self.tags[new.tag].split.is_split() {
            self.screen.border(Some(self.border_color), BORDER_WIDTH);
        }
        shown
    }

    /// Make `target` the current slot.
    ///
    /// Returns false without touching the screen if `target` is already
    /// current or tag lock refuses a switch to another tag.
    pub fn switch_to(&mut self, target: SlotId) -> bool {
        let cur = self.current_slot();
        if cur == target {
            return false;
        }
        if self.tag_lock && target.tag != cur.tag {
            log::debug!("tag lock refused switch to tag {}", target.tag);
            return false;
        }

        if target.tag == cur.tag {
            if self.tags[target.tag].split.is_split() {
                self.hide_show(cur, false, target, Show::Visible);
            } else {
                self.hide_show(cur, true, target, Show::Load);
            }
        } else {
            self.last_tag = cur.tag;
            let drawn = self.hide_show(cur, true, target, Show::Load);
            if self.tags[target.tag].split.is_split() {
                let partner = target.partner();
                let partner_mode = if drawn == Show::Load {
                    Show::Visible
                } else {
                    Show::Load
                };
                self.hide_show(target, false, partner, partner_mode);
                self.hide_show(partner, false, target, Show::Visible);
            }
        }

        self.current_tag = target.tag;
        self.tags[target.tag].top = target.role;
        log::debug!("switched to tag {} {:?}", target.tag, target.role);
        true
    }

    /// Switch to the other slot of the current tag.
    pub fn toggle_slot(&mut self) -> bool {
        self.switch_to(self.current_slot().partner())
    }

    /// Switch to the active slot of the previously used tag.
    pub fn switch_to_last(&mut self) -> bool {
        self.switch_to(self.top_slot(self.last_tag))
    }

    /// Switch to the next live terminal, if there is another one.
    pub fn switch_to_next(&mut self) -> bool {
        let next = self.next_live_slot();
        next != self.current_slot() && self.switch_to(next)
    }

    /// Change how the current tag is split and repaint both halves.
    pub fn set_split(&mut self, mode: SplitMode) {
        let cur = self.current_slot();
        self.tags[cur.tag].split = mode;
        self.hide_show(cur, false, cur.partner(), Show::Redraw);
        self.hide_show(cur.partner(), true, cur, Show::Redraw);
        log::debug!("tag {} split {:?}", cur.tag, mode);
    }

    /// Split the current tag, alternating horizontal and vertical.
    pub fn toggle_split(&mut self) {
        let mode = self.tags[self.current_tag].split.toggled();
        self.set_split(mode);
    }

    /// Start a terminal in the current slot if it is empty.
    ///
    /// `start` receives the region's text size as `(cols, rows)`. Returns
    /// false when the slot was already occupied.
    pub fn spawn<F>(&mut self, start: F) -> Result<bool, PtyError>
    where
        F: FnOnce(u16, u16) -> Result<T, PtyError>,
    {
        let slot = self.current_slot();
        if self.is_live(slot) {
            return Ok(false);
        }

        let region = self.region(slot);
        self.screen.configure(region);
        let (cols, rows) = region.text_size(self.screen.cell_size());
        let term = start(cols, rows)?;

        let idx = self.index(slot);
        let entry = &mut self.slots[idx];
        entry.geometry = Some((cols, rows));
        let term = entry.term.insert(term);
        self.screen.draw(Some(term.vt_mut()), true);
        Ok(true)
    }

    /// Repaint the current slot completely. The program is not told.
    pub fn redraw(&mut self) {
        let cur = self.current_slot();
        self.configure(cur);
        let idx = self.index(cur);
        let vt = self.slots[idx].term.as_mut().map(|t| t.vt_mut());
        self.screen.draw(vt, true);
        if self.tags[cur.tag].split.is_split() {
            self.screen.border(Some(self.border_color), BORDER_WIDTH);
        }
    }

    /// Paint whatever changed in `slot`'s terminal, if it is on screen.
    ///
    /// A visible partner is painted in its own region, after which the
    /// screen is pointed back at the current slot.
    pub fn refresh(&mut self, slot: SlotId) {
        if !self.is_visible(slot) {
            return;
        }
        let cur = self.current_slot();
        if slot != cur {
            self.configure(slot);
        }
        let idx = self.index(slot);
        let vt = self.slots[idx].term.as_mut().map(|t| t.vt_mut());
        if vt.is_some() {
            self.screen.draw(vt, false);
        }
        if slot != cur {
            self.configure(cur);
        }
    }

    /// Drop the terminal in `slot` after its program ended.
    ///
    /// Requests exit once no live terminal remains.
    pub fn close(&mut self, slot: SlotId) -> Option<T> {
        let idx = self.index(slot);
        let term = self.slots[idx].term.take();
        self.slots[idx].geometry = None;
        self.screen.drop_snapshot(idx);

        if term.is_some() {
            log::info!("terminal in slot {idx} ended");
            if self.is_visible(slot) {
                let cur = self.current_slot();
                self.configure(slot);
                self.screen.draw(None, true);
                if slot != cur {
                    self.configure(cur);
                }
            }
        }

        if self.slots.iter().all(|s| s.term.is_none()) {
            log::info!("no terminals left");
            self.exit_requested = true;
        }
        term
    }

    /// Scroll the current terminal's view by `lines` (positive is back into
    /// history) and repaint it.
    pub fn scroll(&mut self, lines: i32) {
        let cur = self.current_slot();
        let idx = self.index(cur);
        if let Some(term) = self.slots[idx].term.as_mut() {
            let vt = term.vt_mut();
            vt.scroll(lines);
            self.screen.draw(Some(vt), true);
        }
    }

    /// Forward input to the current terminal. Returns false when the
    /// current slot is empty.
    ///
    /// A view scrolled into history snaps back to the live screen first.
    pub fn send(&mut self, data: &[u8]) -> bool {
        let cur = self.current_slot();
        let idx = self.index(cur);
        let Some(term) = self.slots[idx].term.as_mut() else {
            return false;
        };

        if term.vt().screen().display_offset() != 0 {
            let vt = term.vt_mut();
            vt.scroll_to_bottom();
            self.screen.draw(Some(vt), true);
        }
        if let Err(e) = term.write_input(data) {
            log::warn!("failed to write to slot {idx}: {e}");
        }
        true
    }

    /// Draw the tag list on the last text row of the current region.
    pub fn list_tags(&mut self) {
        let (cols, rows) = self
            .region(self.current_slot())
            .text_size(self.screen.cell_size());
        let (cols, rows) = (cols as usize, rows as usize);
        if rows == 0 {
            return;
        }
        let r = rows - 1;
        let mut c = 0;

        for ch in "TAGS: ".chars() {
            if c < cols {
                self.screen.put(ch, r, c, LIST_FG, LIST_BG, true);
            }
            c += 1;
        }

        let mut i = 0;
        while i < self.tags.len() && c + 2 < cols {
            let nt = [SlotId::primary(i), SlotId::secondary(i)]
                .iter()
                .filter(|s| self.is_live(**s))
                .count();
            let (open, close) = if i == self.current_tag {
                ('(', ')')
            } else {
                (' ', ' ')
            };
            let tag = &self.tags[i];
            let (ch, snapshot) = (tag.ch, tag.snapshot);
            let (fg, bg) = if snapshot {
                (if nt == 0 { LIST_BG } else { LIST_COLORS[nt] }, LIST_COLORS[0])
            } else {
                (LIST_COLORS[nt], LIST_BG)
            };

            self.screen.put(open, r, c, LIST_FG, LIST_BG, false);
            self.screen.put(ch, r, c + 1, fg, bg, nt == 2);
            self.screen.put(close, r, c + 2, LIST_FG, LIST_BG, false);
            c += 3;
            i += 1;
        }

        while c < cols {
            self.screen.put(' ', r, c, LIST_FG, LIST_BG, false);
            c += 1;
        }
    }
}
