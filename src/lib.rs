//! unicguard - color pairs and scoped sessions for terminal UIs
//!
//! A small convenience layer over a curses-style terminal binding:
//!
//! - **ColorRegistry**: hands out one color pair id per distinct
//!   (foreground, background) combination and binds it on the terminal
//! - **Style**: a color pair plus extra attributes, switched on and off
//!   around text output
//! - **SessionGuard**: initializes the terminal on entry and always
//!   restores it on exit, including on errors and panics
//!
//! # Quick Start
//!
//! ```no_run
//! use unicguard::{guard, Attr, ColorRegistry, GuardOptions, Style, Terminal, TtyTerminal};
//! use unicguard::color::{BLUE, WHITE};
//!
//! let _outcome = guard::run(TtyTerminal::new(), GuardOptions::default(), |screen| {
//!     let mut registry = ColorRegistry::for_terminal(&*screen);
//!     let style = Style::new(&mut registry, screen, WHITE, Some(BLUE), [Attr::Bold])?;
//!     style.activate(screen)?;
//!     screen.add_str("Hello, World!")?;
//!     style.deactivate(screen)?;
//!     screen.refresh()?;
//!     Ok(())
//! })?;
//! # Ok::<(), unicguard::GuardError>(())
//! ```
//!
//! # Module Hierarchy
//!
//! ```text
//! term/      - Terminal binding trait, crossterm implementation
//! color.rs   - ColorRegistry and pair ids
//! style.rs   - Style and configured StyleSpec
//! guard.rs   - SessionGuard and the scope runner
//! config.rs  - ~/.unicguard/config.toml
//! ```

pub mod color;
pub mod config;
pub mod guard;
pub mod style;
pub mod term;

pub use color::{ColorError, ColorPairId, ColorPairKey, ColorRegistry};
pub use config::{Config, ConfigError};
pub use guard::{GuardError, GuardOptions, ScopeFailure, ScopeOutcome, SessionGuard};
pub use style::{Style, StyleSpec};
pub use term::{Attr, AttrFlags, Rendition, Terminal, TerminalError, TtyTerminal};
