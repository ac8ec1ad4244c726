//! Text styles: a color pair plus extra rendering attributes.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::color::{ColorError, ColorPairId, ColorRegistry, BLACK};
use crate::term::{self, Attr, Terminal};

/// Font color, background color and additional attributes for text.
///
/// The color pair is resolved once, when the style is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    fg: u8,
    bg: u8,
    attrs: Vec<Attr>,
    pair: ColorPairId,
}

impl Style {
    /// Create a style, allocating its color pair through `registry`.
    ///
    /// `bg` defaults to [`BLACK`].
    pub fn new<T, I>(
        registry: &mut ColorRegistry,
        terminal: &mut T,
        fg: u8,
        bg: Option<u8>,
        attrs: I,
    ) -> Result<Self, ColorError>
    where
        T: Terminal + ?Sized,
        I: IntoIterator<Item = Attr>,
    {
        let bg = bg.unwrap_or(BLACK);
        let pair = registry.resolve(terminal, fg, bg)?;
        Ok(Self {
            fg,
            bg,
            attrs: attrs.into_iter().collect(),
            pair,
        })
    }

    pub fn fg(&self) -> u8 {
        self.fg
    }

    pub fn bg(&self) -> u8 {
        self.bg
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    pub fn pair(&self) -> ColorPairId {
        self.pair
    }

    /// Turn the style on for the given target
    pub fn activate<T: Terminal + ?Sized>(&self, target: &mut T) -> term::Result<()> {
        target.color_pair_on(self.pair)?;
        for attr in &self.attrs {
            target.attr_on(*attr)?;
        }
        Ok(())
    }

    /// Turn the style off for the given target.
    ///
    /// Every part is turned off even when an earlier one fails; the first
    /// error is returned.
    pub fn deactivate<T: Terminal + ?Sized>(&self, target: &mut T) -> term::Result<()> {
        let mut result = target.color_pair_off(self.pair);
        for attr in &self.attrs {
            let off = target.attr_off(*attr);
            if result.is_ok() {
                result = off;
            }
        }
        result
    }

    /// Run `f` with the style active; the style is turned off again even
    /// if `f` fails.
    pub fn apply<T, R, F>(&self, target: &mut T, f: F) -> anyhow::Result<R>
    where
        T: Terminal + ?Sized,
        F: FnOnce(&mut T) -> anyhow::Result<R>,
    {
        if let Err(e) = self.activate(target) {
            // Undo whatever part of the style did get turned on
            if let Err(undo) = self.deactivate(target) {
                warn!("Failed to roll back partial style: {}", undo);
            }
            return Err(e.into());
        }
        let result = f(target);
        let off = self.deactivate(target);
        let value = result?;
        off?;
        Ok(value)
    }
}

/// A style as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSpec {
    pub fg: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<Attr>,
}

impl StyleSpec {
    pub fn build<T: Terminal + ?Sized>(
        &self,
        registry: &mut ColorRegistry,
        terminal: &mut T,
    ) -> Result<Style, ColorError> {
        Style::new(registry, terminal, self.fg, self.bg, self.attrs.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLUE, WHITE};
    use crate::term::recording::{Call, RecordingTerminal};
    use crate::term::Rendition;

    const NO_ATTRS: [Attr; 0] = [];

    fn setup() -> (RecordingTerminal, ColorRegistry) {
        let term = RecordingTerminal::with_colors();
        let registry = ColorRegistry::for_terminal(&term);
        (term, registry)
    }

    #[test]
    fn test_default_background() {
        let (mut term, mut registry) = setup();
        let style = Style::new(&mut registry, &mut term, WHITE, None, NO_ATTRS).unwrap();
        assert_eq!(style.bg(), BLACK);
        assert_eq!(term.calls, vec![Call::InitPair(ColorPairId(256), WHITE, BLACK)]);
    }

    #[test]
    fn test_styles_share_pairs() {
        let (mut term, mut registry) = setup();
        let plain = Style::new(&mut registry, &mut term, WHITE, Some(BLUE), NO_ATTRS).unwrap();
        let bold = Style::new(&mut registry, &mut term, WHITE, Some(BLUE), [Attr::Bold]).unwrap();
        assert_eq!(plain.pair(), bold.pair());
        assert_eq!(term.init_pair_calls(), 1);
    }

    #[test]
    fn test_activate_order() {
        let (mut term, mut registry) = setup();
        let style = Style::new(
            &mut registry,
            &mut term,
            WHITE,
            Some(BLUE),
            [Attr::Underline, Attr::Bold],
        )
        .unwrap();
        term.calls.clear();

        style.activate(&mut term).unwrap();
        style.deactivate(&mut term).unwrap();
        assert_eq!(
            term.calls,
            vec![
                Call::ColorPairOn(style.pair()),
                Call::AttrOn(Attr::Underline),
                Call::AttrOn(Attr::Bold),
                Call::ColorPairOff(style.pair()),
                Call::AttrOff(Attr::Underline),
                Call::AttrOff(Attr::Bold),
            ]
        );
    }

    #[test]
    fn test_deactivate_restores_rendition() {
        let (mut term, mut registry) = setup();
        let style = Style::new(&mut registry, &mut term, 15, Some(4), [Attr::Bold, Attr::Reverse])
            .unwrap();

        let before = term.rendition();
        assert_eq!(before, Rendition::default());

        style.activate(&mut term).unwrap();
        assert_eq!(term.rendition().pair, Some(style.pair()));
        assert!(term.rendition().has(Attr::Bold));
        assert!(term.rendition().has(Attr::Reverse));

        style.deactivate(&mut term).unwrap();
        assert_eq!(term.rendition(), before);
    }

    #[test]
    fn test_activate_twice_is_additive() {
        let (mut term, mut registry) = setup();
        let bold = Style::new(&mut registry, &mut term, 15, Some(4), [Attr::Bold]).unwrap();
        let underline = Style::new(&mut registry, &mut term, 2, None, [Attr::Underline]).unwrap();

        bold.activate(&mut term).unwrap();
        underline.activate(&mut term).unwrap();
        let r = term.rendition();
        assert_eq!(r.pair, Some(underline.pair()));
        assert!(r.has(Attr::Bold) && r.has(Attr::Underline));
    }

    #[test]
    fn test_apply_turns_style_off_on_error() {
        let (mut term, mut registry) = setup();
        let style = Style::new(&mut registry, &mut term, 15, Some(4), [Attr::Bold]).unwrap();

        let result: anyhow::Result<()> = style.apply(&mut term, |t| {
            t.add_str("partial")?;
            anyhow::bail!("draw failed")
        });
        assert!(result.is_err());
        assert_eq!(term.rendition(), Rendition::default());
        assert_eq!(term.calls.last(), Some(&Call::AttrOff(Attr::Bold)));
    }

    #[test]
    fn test_apply_rolls_back_partial_activate() {
        let (mut term, mut registry) = setup();
        let style = Style::new(
            &mut registry,
            &mut term,
            15,
            Some(4),
            [Attr::Underline, Attr::Bold],
        )
        .unwrap();
        term.fail_on = Some(Call::AttrOn(Attr::Bold));

        let mut ran = false;
        let result: anyhow::Result<()> = style.apply(&mut term, |_| {
            ran = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!ran);
        assert_eq!(term.rendition(), Rendition::default());
    }

    #[test]
    fn test_deactivate_continues_past_failure() {
        let (mut term, mut registry) = setup();
        let style = Style::new(&mut registry, &mut term, 15, Some(4), [Attr::Bold]).unwrap();
        style.activate(&mut term).unwrap();
        term.fail_on = Some(Call::ColorPairOff(style.pair()));

        assert!(style.deactivate(&mut term).is_err());
        assert!(!term.rendition().has(Attr::Bold));
    }

    #[test]
    fn test_style_spec_build() {
        let (mut term, mut registry) = setup();
        let spec = StyleSpec {
            fg: 15,
            bg: Some(4),
            attrs: vec![Attr::Bold],
        };
        let style = spec.build(&mut registry, &mut term).unwrap();
        assert_eq!(style.pair(), ColorPairId(256));
        assert_eq!(style.attrs(), &[Attr::Bold]);
    }
}
