//! Rendering attributes and the terminal's current drawing state.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::color::ColorPairId;

bitflags! {
    /// Set of active rendering attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0001;
        const DIM           = 0b0000_0010;
        const ITALIC        = 0b0000_0100;
        const UNDERLINE     = 0b0000_1000;
        const BLINK         = 0b0001_0000;
        const REVERSE       = 0b0010_0000;
        const HIDDEN        = 0b0100_0000;
        const STRIKETHROUGH = 0b1000_0000;
    }
}

/// A single rendering attribute that a style can switch on and off.
///
/// Serialized by its lowercase name; deserialization goes through
/// [`Attr::parse`] so the curses aliases are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Attr {
    Bold,
    Dim,
    Italic,
    Underline,
    Blink,
    Reverse,
    Hidden,
    Strikethrough,
}

impl Attr {
    /// Flag corresponding to this attribute
    pub fn flag(self) -> AttrFlags {
        match self {
            Attr::Bold => AttrFlags::BOLD,
            Attr::Dim => AttrFlags::DIM,
            Attr::Italic => AttrFlags::ITALIC,
            Attr::Underline => AttrFlags::UNDERLINE,
            Attr::Blink => AttrFlags::BLINK,
            Attr::Reverse => AttrFlags::REVERSE,
            Attr::Hidden => AttrFlags::HIDDEN,
            Attr::Strikethrough => AttrFlags::STRIKETHROUGH,
        }
    }

    /// Parse an attribute name as written in configuration files
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "bold" => Some(Attr::Bold),
            "dim" => Some(Attr::Dim),
            "italic" => Some(Attr::Italic),
            "underline" | "underlined" => Some(Attr::Underline),
            "blink" => Some(Attr::Blink),
            "reverse" | "standout" => Some(Attr::Reverse),
            "hidden" | "invisible" => Some(Attr::Hidden),
            "strikethrough" | "crossed-out" => Some(Attr::Strikethrough),
            _ => None,
        }
    }
}

impl TryFrom<String> for Attr {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Attr::parse(&name).ok_or_else(|| format!("Unknown attribute: {}", name))
    }
}

/// Current drawing state of a terminal: active color pair plus attributes.
///
/// Follows the curses model: enabling a pair replaces the active one,
/// disabling a pair only clears it when it is the active one, and
/// attributes are plain flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rendition {
    pub pair: Option<ColorPairId>,
    pub attrs: AttrFlags,
}

impl Rendition {
    pub fn pair_on(&mut self, pair: ColorPairId) {
        self.pair = Some(pair);
    }

    /// Returns true when the active pair was cleared
    pub fn pair_off(&mut self, pair: ColorPairId) -> bool {
        if self.pair == Some(pair) {
            self.pair = None;
            true
        } else {
            false
        }
    }

    pub fn attr_on(&mut self, attr: Attr) {
        self.attrs.insert(attr.flag());
    }

    pub fn attr_off(&mut self, attr: Attr) {
        self.attrs.remove(attr.flag());
    }

    pub fn has(&self, attr: Attr) -> bool {
        self.attrs.contains(attr.flag())
    }

    /// Reset to the terminal default
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_off_only_clears_active_pair() {
        let mut r = Rendition::default();
        r.pair_on(ColorPairId(256));
        assert!(!r.pair_off(ColorPairId(257)));
        assert_eq!(r.pair, Some(ColorPairId(256)));
        assert!(r.pair_off(ColorPairId(256)));
        assert_eq!(r.pair, None);
    }

    #[test]
    fn test_attrs_are_additive() {
        let mut r = Rendition::default();
        r.attr_on(Attr::Bold);
        r.attr_on(Attr::Bold);
        r.attr_on(Attr::Underline);
        assert_eq!(r.attrs, AttrFlags::BOLD | AttrFlags::UNDERLINE);

        r.attr_off(Attr::Bold);
        assert!(!r.has(Attr::Bold));
        assert!(r.has(Attr::Underline));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Attr::parse("BOLD"), Some(Attr::Bold));
        assert_eq!(Attr::parse("standout"), Some(Attr::Reverse));
        assert_eq!(Attr::parse("Crossed-Out"), Some(Attr::Strikethrough));
        assert_eq!(Attr::parse("sparkly"), None);
    }

    #[test]
    fn test_try_from_rejects_unknown_name() {
        assert_eq!(Attr::try_from("invisible".to_string()), Ok(Attr::Hidden));
        let err = Attr::try_from("sparkly".to_string()).unwrap_err();
        assert!(err.contains("sparkly"));
    }
}
