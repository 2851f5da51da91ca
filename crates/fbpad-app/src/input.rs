//! Keyboard input decoding.
//!
//! Every command is ESC followed by one byte. Anything else goes to the
//! active terminal unchanged.

const ESC: u8 = 0x1b;

const fn ctrl(key: u8) -> u8 {
    key & 0x1f
}

/// Which program a spawn command starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Program {
    Shell,
    /// The shell, told through signals when its slot is hidden or shown.
    SignalledShell,
    Mail,
    Editor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Spawn(Program),
    /// Switch to the other slot of the current tag.
    ToggleSlot,
    LastTag,
    ListTags,
    NextTerminal,
    Exit,
    Screenshot,
    Redraw,
    Lock,
    ToggleTagLock,
    ScrollUp,
    ScrollDown,
    ToggleSplit,
    ClearSplit,
    /// Jump to the tag with this character.
    Tag(char),
    /// Bytes for the active terminal.
    Forward(Vec<u8>),
}

/// Turns input bytes into commands, one byte at a time.
///
/// The escape state survives between reads, so a command split across two
/// reads is still recognized.
#[derive(Debug, Default)]
pub struct Dispatcher {
    escaped: bool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last byte was a lone ESC.
    pub fn is_pending(&self) -> bool {
        self.escaped
    }

    /// Decode one byte; `tags` holds the tag characters in order.
    pub fn feed(&mut self, byte: u8, tags: &str) -> Option<Command> {
        if !self.escaped {
            if byte == ESC {
                self.escaped = true;
                return None;
            }
            return Some(Command::Forward(vec![byte]));
        }
        self.escaped = false;

        let command = match byte {
            b'c' => Command::Spawn(Program::Shell),
            b';' => Command::Spawn(Program::SignalledShell),
            b'm' => Command::Spawn(Program::Mail),
            b'e' => Command::Spawn(Program::Editor),
            b'j' | b'k' => Command::ToggleSlot,
            b'o' => Command::LastTag,
            b'p' => Command::ListTags,
            b'\t' => Command::NextTerminal,
            b's' => Command::Screenshot,
            b'y' => Command::Redraw,
            b',' => Command::ScrollUp,
            b'.' => Command::ScrollDown,
            b'=' => Command::ToggleSplit,
            b'-' => Command::ClearSplit,
            b if b == ctrl(b'q') => Command::Exit,
            b if b == ctrl(b'l') => Command::Lock,
            b if b == ctrl(b'o') => Command::ToggleTagLock,
            b if b.is_ascii() && tags.contains(b as char) => Command::Tag(b as char),
            b => Command::Forward(vec![ESC, b]),
        };
        Some(command)
    }
}
