//! Terminal binding layer.
//!
//! Everything above this module talks to the terminal through the
//! [`Terminal`] trait, which mirrors the small curses-style call surface
//! the color registry, styles and session guard need:
//!
//! - **attrs**: rendering attributes and the current `Rendition`
//! - **tty**: crossterm-backed implementation driving a real terminal
//! - **recording**: in-memory implementation that records every call (tests)
//!
//! # Call surface
//!
//! ```text
//! session     init_screen / end_screen
//! toggles     start_color / set_echo / set_cursor_visible / set_keypad
//! colors      max_color_pairs / init_pair / color_pair_on / color_pair_off
//! attributes  attr_on / attr_off / rendition
//! output      add_str / refresh
//! ```

pub mod attrs;
pub mod tty;
#[cfg(test)]
pub mod recording;

use std::io;
use thiserror::Error;

use crate::color::ColorPairId;

pub use attrs::{Attr, AttrFlags, Rendition};
pub use tty::TtyTerminal;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Terminal is already claimed by another session")]
    AlreadyClaimed,

    #[error("Color support has not been started")]
    ColorsNotStarted,

    #[error("Color pair {0} has not been initialized")]
    UnknownPair(ColorPairId),
}

pub type Result<T> = std::result::Result<T, TerminalError>;

/// The underlying terminal binding.
///
/// Implementations keep track of the active [`Rendition`] so callers can
/// inspect what a style changed.
pub trait Terminal {
    /// Initialize the screen for drawing
    fn init_screen(&mut self) -> Result<()>;

    /// Restore the terminal to its prior state. Safe to call more than once.
    fn end_screen(&mut self) -> Result<()>;

    /// Enable custom color pairs
    fn start_color(&mut self) -> Result<()>;

    /// Toggle echoing of typed keys
    fn set_echo(&mut self, enabled: bool) -> Result<()>;

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()>;

    /// Toggle decoding of special and function keys
    fn set_keypad(&mut self, enabled: bool) -> Result<()>;

    /// Number of color pairs the terminal can hold (ids `0..max`)
    fn max_color_pairs(&self) -> u16;

    /// Bind `pair` to the given foreground and background color codes
    fn init_pair(&mut self, pair: ColorPairId, fg: u8, bg: u8) -> Result<()>;

    fn color_pair_on(&mut self, pair: ColorPairId) -> Result<()>;

    fn color_pair_off(&mut self, pair: ColorPairId) -> Result<()>;

    fn attr_on(&mut self, attr: Attr) -> Result<()>;

    fn attr_off(&mut self, attr: Attr) -> Result<()>;

    /// Write text at the cursor using the active rendition
    fn add_str(&mut self, text: &str) -> Result<()>;

    /// Flush pending output to the screen
    fn refresh(&mut self) -> Result<()>;

    /// Current drawing state
    fn rendition(&self) -> Rendition;
}

impl<T: Terminal + ?Sized> Terminal for &mut T {
    fn init_screen(&mut self) -> Result<()> {
        (**self).init_screen()
    }

    fn end_screen(&mut self) -> Result<()> {
        (**self).end_screen()
    }

    fn start_color(&mut self) -> Result<()> {
        (**self).start_color()
    }

    fn set_echo(&mut self, enabled: bool) -> Result<()> {
        (**self).set_echo(enabled)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        (**self).set_cursor_visible(visible)
    }

    fn set_keypad(&mut self, enabled: bool) -> Result<()> {
        (**self).set_keypad(enabled)
    }

    fn max_color_pairs(&self) -> u16 {
        (**self).max_color_pairs()
    }

    fn init_pair(&mut self, pair: ColorPairId, fg: u8, bg: u8) -> Result<()> {
        (**self).init_pair(pair, fg, bg)
    }

    fn color_pair_on(&mut self, pair: ColorPairId) -> Result<()> {
        (**self).color_pair_on(pair)
    }

    fn color_pair_off(&mut self, pair: ColorPairId) -> Result<()> {
        (**self).color_pair_off(pair)
    }

    fn attr_on(&mut self, attr: Attr) -> Result<()> {
        (**self).attr_on(attr)
    }

    fn attr_off(&mut self, attr: Attr) -> Result<()> {
        (**self).attr_off(attr)
    }

    fn add_str(&mut self, text: &str) -> Result<()> {
        (**self).add_str(text)
    }

    fn refresh(&mut self) -> Result<()> {
        (**self).refresh()
    }

    fn rendition(&self) -> Rendition {
        (**self).rendition()
    }
}
