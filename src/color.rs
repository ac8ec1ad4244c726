//! Color pair registry.
//!
//! Terminals draw with numbered color pairs, each binding a foreground and
//! a background color code. `ColorRegistry` hands out one pair id per
//! distinct (foreground, background) combination and binds it on the
//! terminal the first time the combination is requested:
//!
//! ```text
//! resolve(15, 4)  -> 256   init_pair(256, 15, 4)
//! resolve(15, 4)  -> 256   (no call)
//! resolve(7, 0)   -> 257   init_pair(257, 7, 0)
//! ```
//!
//! Ids start above the reserved range (`0..=255` by default) and are never
//! reused. Once the terminal's pair limit is reached no further pair can be
//! bound, although existing combinations keep resolving.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::term::{Terminal, TerminalError};

// Basic color codes, as used by curses
pub const BLACK: u8 = 0;
pub const RED: u8 = 1;
pub const GREEN: u8 = 2;
pub const YELLOW: u8 = 3;
pub const BLUE: u8 = 4;
pub const MAGENTA: u8 = 5;
pub const CYAN: u8 = 6;
pub const WHITE: u8 = 7;

/// First pair id handed out; lower ids are left to the terminal
pub const DEFAULT_FIRST_PAIR_ID: u16 = 256;

#[derive(Error, Debug)]
pub enum ColorError {
    #[error("Maximum number of color pairs reached ({max})")]
    CapacityExceeded { max: u16 },

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// Identifier of a bound color pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorPairId(pub u16);

impl ColorPairId {
    /// The terminal's default colors
    pub const DEFAULT: ColorPairId = ColorPairId(0);
}

impl fmt::Display for ColorPairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplication key: a foreground and background color code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorPairKey {
    pub fg: u8,
    pub bg: u8,
}

impl ColorPairKey {
    pub const fn new(fg: u8, bg: u8) -> Self {
        Self { fg, bg }
    }
}

impl fmt::Display for ColorPairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{:03};b{:03}", self.fg, self.bg)
    }
}

/// Registry of allocated color pairs
#[derive(Debug, Clone)]
pub struct ColorRegistry {
    pairs: HashMap<ColorPairKey, ColorPairId>,
    first_id: u16,
    next_id: u16,
    max_pairs: u16,
}

impl ColorRegistry {
    /// Registry issuing ids from `first_id` up to (excluding) `max_pairs`
    pub fn new(first_id: u16, max_pairs: u16) -> Self {
        Self {
            pairs: HashMap::new(),
            first_id,
            next_id: first_id,
            max_pairs,
        }
    }

    /// Registry sized to the terminal's pair limit
    pub fn for_terminal<T: Terminal + ?Sized>(terminal: &T) -> Self {
        Self::new(DEFAULT_FIRST_PAIR_ID, terminal.max_color_pairs())
    }

    /// Get the pair id for a foreground/background combination, binding a
    /// new pair on the terminal if the combination is new.
    pub fn resolve<T: Terminal + ?Sized>(
        &mut self,
        terminal: &mut T,
        fg: u8,
        bg: u8,
    ) -> Result<ColorPairId, ColorError> {
        let key = ColorPairKey::new(fg, bg);
        if let Some(id) = self.pairs.get(&key) {
            return Ok(*id);
        }

        if self.next_id >= self.max_pairs {
            return Err(ColorError::CapacityExceeded { max: self.max_pairs });
        }

        let id = ColorPairId(self.next_id);
        terminal.init_pair(id, fg, bg)?;

        self.pairs.insert(key, id);
        self.next_id += 1;
        debug!("Allocated color pair {} for {}", id, key);
        Ok(id)
    }

    /// Pair id previously assigned to `key`
    pub fn lookup(&self, key: ColorPairKey) -> Option<ColorPairId> {
        self.pairs.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// How many more pairs can be allocated
    pub fn remaining(&self) -> u16 {
        self.max_pairs.saturating_sub(self.next_id)
    }

    pub fn first_id(&self) -> u16 {
        self.first_id
    }

    pub fn max_pairs(&self) -> u16 {
        self.max_pairs
    }

    /// Allocated pairs in id order
    pub fn pairs(&self) -> impl Iterator<Item = (ColorPairKey, ColorPairId)> {
        let mut entries: Vec<_> = self.pairs.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(_, id)| *id);
        entries.into_iter()
    }
}
