//! Terminal binding using crossterm
//!
//! Emulates the curses color-pair model on top of 256-color escape
//! sequences: pairs are remembered locally and turned into foreground and
//! background colors when enabled.

use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, info, warn};

use super::{Attr, Rendition, Result, Terminal, TerminalError};
use crate::color::ColorPairId;

/// Pair count reported by a classic 256-color curses terminal
pub const DEFAULT_MAX_COLOR_PAIRS: u16 = 32767;

/// Only one session may own the real terminal at a time
static TERMINAL_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Crossterm-backed terminal
pub struct TtyTerminal<W: Write = Stdout> {
    out: W,
    max_pairs: u16,
    /// Bound pairs (id -> (fg, bg))
    pairs: HashMap<ColorPairId, (u8, u8)>,
    colors_started: bool,
    rendition: Rendition,
    /// Whether this instance holds the process-wide claim
    claimed: bool,
    raw_mode: bool,
    cursor_hidden: bool,
    keyboard_enhanced: bool,
}

impl TtyTerminal<Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Terminal size as (cols, rows)
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

impl Default for TtyTerminal<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TtyTerminal<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            max_pairs: DEFAULT_MAX_COLOR_PAIRS,
            pairs: HashMap::new(),
            colors_started: false,
            rendition: Rendition::default(),
            claimed: false,
            raw_mode: false,
            cursor_hidden: false,
            keyboard_enhanced: false,
        }
    }

    /// Override the reported pair limit
    pub fn with_max_color_pairs(mut self, max_pairs: u16) -> Self {
        self.max_pairs = max_pairs;
        self
    }

    /// Underlying writer
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Colors bound to `pair`, if any
    pub fn pair_colors(&self, pair: ColorPairId) -> Option<(u8, u8)> {
        self.pairs.get(&pair).copied()
    }

    fn release_claim(&mut self) {
        if self.claimed {
            self.claimed = false;
            TERMINAL_CLAIMED.store(false, Ordering::Release);
        }
    }
}

impl<W: Write> Terminal for TtyTerminal<W> {
    fn init_screen(&mut self) -> Result<()> {
        if !self.claimed {
            TERMINAL_CLAIMED
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .map_err(|_| TerminalError::AlreadyClaimed)?;
            self.claimed = true;
        }

        let result = queue!(
            self.out,
            EnterAlternateScreen,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Clear(ClearType::All),
            MoveTo(0, 0)
        );
        let result = result.and_then(|_| self.out.flush());

        if let Err(e) = result {
            self.release_claim();
            return Err(e.into());
        }

        self.rendition.clear();
        info!("Terminal session initialized");
        Ok(())
    }

    fn end_screen(&mut self) -> Result<()> {
        let mut first_error: Option<io::Error> = None;
        let mut note = |r: io::Result<()>| {
            if let Err(e) = r {
                first_error.get_or_insert(e);
            }
        };

        // Reset all attributes first
        note(queue!(self.out, ResetColor, SetAttribute(Attribute::Reset)));
        self.rendition.clear();

        if self.cursor_hidden {
            note(queue!(self.out, Show));
            self.cursor_hidden = false;
        }

        if self.keyboard_enhanced {
            note(queue!(self.out, PopKeyboardEnhancementFlags));
            self.keyboard_enhanced = false;
        }

        if self.claimed {
            note(queue!(self.out, LeaveAlternateScreen));
        }

        note(self.out.flush());

        // Disable raw mode last so the restored screen is drawn normally
        if self.raw_mode {
            note(terminal::disable_raw_mode());
            self.raw_mode = false;
        }

        if self.claimed {
            info!("Terminal session restored");
        }
        self.release_claim();

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn start_color(&mut self) -> Result<()> {
        self.colors_started = true;
        debug!("Color support started");
        Ok(())
    }

    fn set_echo(&mut self, enabled: bool) -> Result<()> {
        // crossterm can only suppress echo through raw mode
        if enabled && self.raw_mode {
            terminal::disable_raw_mode()?;
            self.raw_mode = false;
        } else if !enabled && !self.raw_mode {
            terminal::enable_raw_mode()?;
            self.raw_mode = true;
        }
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        if visible {
            queue!(self.out, Show)?;
        } else {
            queue!(self.out, Hide)?;
        }
        self.cursor_hidden = !visible;
        self.out.flush()?;
        Ok(())
    }

    fn set_keypad(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.keyboard_enhanced {
            return Ok(());
        }

        if enabled {
            if !terminal::supports_keyboard_enhancement().unwrap_or(false) {
                warn!("Terminal does not support extended key decoding, keypad left as is");
                return Ok(());
            }
            queue!(
                self.out,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )?;
        } else {
            queue!(self.out, PopKeyboardEnhancementFlags)?;
        }
        self.keyboard_enhanced = enabled;
        self.out.flush()?;
        Ok(())
    }

    fn max_color_pairs(&self) -> u16 {
        self.max_pairs
    }

    fn init_pair(&mut self, pair: ColorPairId, fg: u8, bg: u8) -> Result<()> {
        if !self.colors_started {
            return Err(TerminalError::ColorsNotStarted);
        }
        debug!("init_pair({}, {}, {})", pair, fg, bg);
        self.pairs.insert(pair, (fg, bg));
        Ok(())
    }

    fn color_pair_on(&mut self, pair: ColorPairId) -> Result<()> {
        if pair == ColorPairId::DEFAULT {
            queue!(self.out, SetForegroundColor(Color::Reset), SetBackgroundColor(Color::Reset))?;
        } else {
            let (fg, bg) = self
                .pair_colors(pair)
                .ok_or(TerminalError::UnknownPair(pair))?;
            queue!(
                self.out,
                SetForegroundColor(Color::AnsiValue(fg)),
                SetBackgroundColor(Color::AnsiValue(bg))
            )?;
        }
        self.rendition.pair_on(pair);
        Ok(())
    }

    fn color_pair_off(&mut self, pair: ColorPairId) -> Result<()> {
        // Reset only the colors; ResetColor would drop the attributes too
        if self.rendition.pair_off(pair) {
            queue!(self.out, SetForegroundColor(Color::Reset), SetBackgroundColor(Color::Reset))?;
        }
        Ok(())
    }

    fn attr_on(&mut self, attr: Attr) -> Result<()> {
        queue!(self.out, SetAttribute(enable_sequence(attr)))?;
        self.rendition.attr_on(attr);
        Ok(())
    }

    fn attr_off(&mut self, attr: Attr) -> Result<()> {
        self.rendition.attr_off(attr);
        queue!(self.out, SetAttribute(disable_sequence(attr)))?;

        // Bold and dim share one reset; put back whichever is still active
        let sibling = match attr {
            Attr::Bold => Some(Attr::Dim),
            Attr::Dim => Some(Attr::Bold),
            _ => None,
        };
        if let Some(other) = sibling.filter(|a| self.rendition.has(*a)) {
            queue!(self.out, SetAttribute(enable_sequence(other)))?;
        }
        Ok(())
    }

    fn add_str(&mut self, text: &str) -> Result<()> {
        queue!(self.out, Print(text))?;
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn rendition(&self) -> Rendition {
        self.rendition
    }
}

impl<W: Write> Drop for TtyTerminal<W> {
    fn drop(&mut self) {
        if self.claimed || self.raw_mode {
            if let Err(e) = self.end_screen() {
                warn!("Failed to restore terminal on drop: {}", e);
            }
        }
    }
}

fn enable_sequence(attr: Attr) -> Attribute {
    match attr {
        Attr::Bold => Attribute::Bold,
        Attr::Dim => Attribute::Dim,
        Attr::Italic => Attribute::Italic,
        Attr::Underline => Attribute::Underlined,
        Attr::Blink => Attribute::SlowBlink,
        Attr::Reverse => Attribute::Reverse,
        Attr::Hidden => Attribute::Hidden,
        Attr::Strikethrough => Attribute::CrossedOut,
    }
}

fn disable_sequence(attr: Attr) -> Attribute {
    match attr {
        Attr::Bold | Attr::Dim => Attribute::NormalIntensity,
        Attr::Italic => Attribute::NoItalic,
        Attr::Underline => Attribute::NoUnderline,
        Attr::Blink => Attribute::NoBlink,
        Attr::Reverse => Attribute::NoReverse,
        Attr::Hidden => Attribute::NoHidden,
        Attr::Strikethrough => Attribute::NotCrossedOut,
    }
}
