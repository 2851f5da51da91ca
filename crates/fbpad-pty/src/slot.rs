//! Tag and terminal-slot addressing.
//!
//! Every tag owns exactly two slots. With `n` tags, the primary slot of tag
//! `t` has flat index `t` and the secondary slot has index `t + n`.

/// Which of a tag's two slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    pub fn other(self) -> Self {
        match self {
            Role::Primary => Role::Secondary,
            Role::Secondary => Role::Primary,
        }
    }
}

/// Address of a terminal slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId {
    pub tag: usize,
    pub role: Role,
}

impl SlotId {
    pub const fn new(tag: usize, role: Role) -> Self {
        Self { tag, role }
    }

    pub const fn primary(tag: usize) -> Self {
        Self::new(tag, Role::Primary)
    }

    pub const fn secondary(tag: usize) -> Self {
        Self::new(tag, Role::Secondary)
    }

    /// The other slot of the same tag.
    pub fn partner(self) -> Self {
        Self::new(self.tag, self.role.other())
    }

    /// Flat slot index for a multiplexer with `ntags` tags.
    pub fn index(self, ntags: usize) -> usize {
        match self.role {
            Role::Primary => self.tag,
            Role::Secondary => self.tag + ntags,
        }
    }

    /// Inverse of [`SlotId::index`]. `index` must be below `2 * ntags`.
    pub fn from_index(index: usize, ntags: usize) -> Self {
        if index < ntags {
            Self::primary(index)
        } else {
            Self::secondary(index - ntags)
        }
    }
}

/// How a tag's two slots share the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitMode {
    /// One slot covers the whole screen.
    #[default]
    None,
    /// Primary on top, secondary below.
    Horizontal,
    /// Primary on the left, secondary on the right.
    Vertical,
}

impl SplitMode {
    pub fn is_split(self) -> bool {
        self != SplitMode::None
    }

    /// Mode selected by the split toggle: horizontal unless already
    /// horizontal.
    pub fn toggled(self) -> Self {
        match self {
            SplitMode::Horizontal => SplitMode::Vertical,
            SplitMode::None | SplitMode::Vertical => SplitMode::Horizontal,
        }
    }
}

/// A named workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Character that selects this tag.
    pub ch: char,
    /// Slot last active in this tag.
    pub top: Role,
    pub split: SplitMode,
    /// Whether hiding this tag captures a snapshot for fast redraw.
    pub snapshot: bool,
}

impl Tag {
    pub fn new(ch: char, snapshot: bool) -> Self {
        Self {
            ch,
            top: Role::Primary,
            split: SplitMode::None,
            snapshot,
        }
    }
}

/// Observable state of a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagState {
    /// Neither slot holds a live terminal.
    Closed,
    SingleFullscreen,
    SplitHorizontal,
    SplitVertical,
}
