//! In-memory terminal that records every binding call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{Attr, Rendition, Result, Terminal, TerminalError};
use crate::color::ColorPairId;

/// One recorded binding call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    InitScreen,
    EndScreen,
    StartColor,
    SetEcho(bool),
    SetCursorVisible(bool),
    SetKeypad(bool),
    InitPair(ColorPairId, u8, u8),
    ColorPairOn(ColorPairId),
    ColorPairOff(ColorPairId),
    AttrOn(Attr),
    AttrOff(Attr),
    AddStr(String),
    Refresh,
}

pub struct RecordingTerminal {
    pub calls: Vec<Call>,
    pub max_pairs: u16,
    pairs: HashMap<ColorPairId, (u8, u8)>,
    colors_started: bool,
    rendition: Rendition,
    /// Make the named call fail once it is reached
    pub fail_on: Option<Call>,
    /// Shared log that also receives every call, in `{:?}` form
    pub journal: Option<Rc<RefCell<Vec<String>>>>,
}

impl Default for RecordingTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTerminal {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            max_pairs: 32767,
            pairs: HashMap::new(),
            colors_started: false,
            rendition: Rendition::default(),
            fail_on: None,
            journal: None,
        }
    }

    /// A terminal whose colors are already started
    pub fn with_colors() -> Self {
        let mut term = Self::new();
        term.colors_started = true;
        term
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(*c)).count()
    }

    pub fn init_pair_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::InitPair(..)))
    }

    pub fn end_screen_calls(&self) -> usize {
        self.count(|c| *c == Call::EndScreen)
    }

    fn record(&mut self, call: Call) -> Result<()> {
        let fail = self.fail_on.as_ref() == Some(&call);
        if let Some(journal) = &self.journal {
            journal.borrow_mut().push(format!("{:?}", call));
        }
        self.calls.push(call);
        if fail {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "injected failure").into());
        }
        Ok(())
    }
}

impl Terminal for RecordingTerminal {
    fn init_screen(&mut self) -> Result<()> {
        self.record(Call::InitScreen)
    }

    fn end_screen(&mut self) -> Result<()> {
        self.rendition.clear();
        self.record(Call::EndScreen)
    }

    fn start_color(&mut self) -> Result<()> {
        self.colors_started = true;
        self.record(Call::StartColor)
    }

    fn set_echo(&mut self, enabled: bool) -> Result<()> {
        self.record(Call::SetEcho(enabled))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        self.record(Call::SetCursorVisible(visible))
    }

    fn set_keypad(&mut self, enabled: bool) -> Result<()> {
        self.record(Call::SetKeypad(enabled))
    }

    fn max_color_pairs(&self) -> u16 {
        self.max_pairs
    }

    fn init_pair(&mut self, pair: ColorPairId, fg: u8, bg: u8) -> Result<()> {
        if !self.colors_started {
            return Err(TerminalError::ColorsNotStarted);
        }
        self.record(Call::InitPair(pair, fg, bg))?;
        self.pairs.insert(pair, (fg, bg));
        Ok(())
    }

    fn color_pair_on(&mut self, pair: ColorPairId) -> Result<()> {
        if pair != ColorPairId::DEFAULT && !self.pairs.contains_key(&pair) {
            return Err(TerminalError::UnknownPair(pair));
        }
        self.record(Call::ColorPairOn(pair))?;
        self.rendition.pair_on(pair);
        Ok(())
    }

    fn color_pair_off(&mut self, pair: ColorPairId) -> Result<()> {
        self.record(Call::ColorPairOff(pair))?;
        self.rendition.pair_off(pair);
        Ok(())
    }

    fn attr_on(&mut self, attr: Attr) -> Result<()> {
        self.record(Call::AttrOn(attr))?;
        self.rendition.attr_on(attr);
        Ok(())
    }

    fn attr_off(&mut self, attr: Attr) -> Result<()> {
        self.record(Call::AttrOff(attr))?;
        self.rendition.attr_off(attr);
        Ok(())
    }

    fn add_str(&mut self, text: &str) -> Result<()> {
        self.record(Call::AddStr(text.to_string()))
    }

    fn refresh(&mut self) -> Result<()> {
        self.record(Call::Refresh)
    }

    fn rendition(&self) -> Rendition {
        self.rendition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_new() {
        let term = RecordingTerminal::default();
        assert!(term.calls.is_empty());
        assert_eq!(term.max_color_pairs(), 32767);
        assert_eq!(term.rendition(), Rendition::default());
    }
}
