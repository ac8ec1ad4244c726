//! Scoped terminal session.
//!
//! [`SessionGuard`] owns the terminal while a session is active. Entering it
//! initializes the screen and applies the configured toggles; dropping or
//! leaving it always restores the terminal, whatever the exit path.
//!
//! ```text
//! INACTIVE ──enter()──▶ ACTIVE ──leave() / drop──▶ INACTIVE
//!             init_screen                end_screen
//!             start_color?
//!             set_echo(false)?
//!             set_cursor_visible(false)?
//!             set_keypad(true)?
//! ```
//!
//! [`run`] wraps a closure in a guard and turns whatever ended the closure
//! (a value, an error or a panic) into a [`ScopeOutcome`], after the
//! terminal has been restored.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::term::{self, Terminal, TerminalError};

#[derive(Error, Debug)]
pub enum GuardError {
    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("Guarded scope failed: {0}")]
    Failed(ScopeFailure),
}

/// Session setup toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardOptions {
    /// Enable custom color pairs
    pub start_color: bool,
    /// Suppress echoing of typed keys
    pub noecho: bool,
    pub hide_cursor: bool,
    /// Decode special and function keys
    pub keypad: bool,
    /// Print failure details to stdout when a scope fails
    pub show_exceptions: bool,
    /// Hand scope failures back to the caller instead of suppressing them
    pub propagate_failures: bool,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            start_color: true,
            noecho: true,
            hide_cursor: true,
            keypad: true,
            show_exceptions: false,
            propagate_failures: false,
        }
    }
}

/// Active terminal session; restores the terminal when dropped.
pub struct SessionGuard<T: Terminal> {
    /// `None` only while leaving
    terminal: Option<T>,
    options: GuardOptions,
}

impl<T: Terminal> SessionGuard<T> {
    /// Initialize the terminal and apply the enabled toggles in order.
    ///
    /// If a toggle fails the screen is torn down again before the error is
    /// returned.
    pub fn enter(mut terminal: T, options: GuardOptions) -> Result<Self, GuardError> {
        terminal.init_screen()?;

        if let Err(e) = Self::setup(&mut terminal, &options) {
            if let Err(teardown) = terminal.end_screen() {
                warn!("Teardown after failed setup also failed: {}", teardown);
            }
            return Err(e.into());
        }

        info!(
            "Session entered (color: {}, noecho: {}, hide_cursor: {}, keypad: {})",
            options.start_color, options.noecho, options.hide_cursor, options.keypad
        );
        Ok(Self {
            terminal: Some(terminal),
            options,
        })
    }

    fn setup(terminal: &mut T, options: &GuardOptions) -> term::Result<()> {
        if options.start_color {
            terminal.start_color()?;
        }
        if options.noecho {
            terminal.set_echo(false)?;
        }
        if options.hide_cursor {
            terminal.set_cursor_visible(false)?;
        }
        if options.keypad {
            terminal.set_keypad(true)?;
        }
        Ok(())
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    /// Handle to the active screen
    pub fn screen(&self) -> &T {
        self.terminal.as_ref().expect("session guard already left")
    }

    pub fn screen_mut(&mut self) -> &mut T {
        self.terminal.as_mut().expect("session guard already left")
    }

    /// Restore the terminal now and hand it back.
    pub fn leave(mut self) -> term::Result<T> {
        let mut terminal = self.terminal.take().expect("session guard already left");
        terminal.end_screen()?;
        info!("Session left");
        Ok(terminal)
    }
}

impl<T: Terminal> Deref for SessionGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.screen()
    }
}

impl<T: Terminal> DerefMut for SessionGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.screen_mut()
    }
}

impl<T: Terminal> Drop for SessionGuard<T> {
    fn drop(&mut self) {
        if let Some(terminal) = &mut self.terminal {
            match terminal.end_screen() {
                Ok(()) => info!("Session left"),
                Err(e) => error!("Failed to restore terminal: {}", e),
            }
        }
    }
}

/// What ended a failed scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Error,
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Error => write!(f, "error"),
            FailureKind::Panic => write!(f, "panic"),
        }
    }
}

/// Details of a failure that ended a guarded scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Underlying causes, outermost first
    pub context: Vec<String>,
    pub backtrace: Option<String>,
}

impl ScopeFailure {
    pub fn from_error(err: &anyhow::Error) -> Self {
        let backtrace = err.backtrace();
        Self {
            kind: FailureKind::Error,
            message: err.to_string(),
            context: err.chain().skip(1).map(|cause| cause.to_string()).collect(),
            backtrace: (backtrace.status() == BacktraceStatus::Captured)
                .then(|| backtrace.to_string()),
        }
    }

    /// Build a failure from a caught panic and, when the panic hook saw
    /// it, where it happened.
    pub fn from_panic(payload: &(dyn Any + Send), origin: Option<PanicOrigin>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        let (context, backtrace) = match origin {
            Some(origin) => (
                origin
                    .location
                    .map(|location| vec![format!("panicked at {}", location)])
                    .unwrap_or_default(),
                origin.backtrace,
            ),
            None => (Vec::new(), None),
        };

        Self {
            kind: FailureKind::Panic,
            message,
            context,
            backtrace,
        }
    }

    /// Write a human-readable report of the failure
    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Session guard exited because of a failure:")?;
        writeln!(out)?;
        writeln!(out, "{}", self.kind)?;
        writeln!(out)?;
        writeln!(out, " - {}", self.message)?;
        for cause in &self.context {
            writeln!(out, "   caused by: {}", cause)?;
        }
        if let Some(backtrace) = &self.backtrace {
            writeln!(out)?;
            writeln!(out, "{}", backtrace)?;
        }
        writeln!(out)?;
        Ok(())
    }
}

impl fmt::Display for ScopeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Where a panic inside a guarded scope was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicOrigin {
    /// `file:line:column`
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

thread_local! {
    /// `Some` while a guarded scope runs on this thread; filled by the hook
    static PANIC_ORIGIN: RefCell<Option<Option<PanicOrigin>>> = RefCell::new(None);
}

static PANIC_HOOK: Once = Once::new();

/// Install the process-wide hook once. Panics on a thread running a guarded
/// scope are recorded (and kept off the screen); all others go to the
/// previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let recorded = PANIC_ORIGIN.try_with(|slot| match slot.borrow_mut().as_mut() {
                Some(origin) => {
                    let backtrace = Backtrace::capture();
                    *origin = Some(PanicOrigin {
                        location: info.location().map(|l| l.to_string()),
                        backtrace: (backtrace.status() == BacktraceStatus::Captured)
                            .then(|| backtrace.to_string()),
                    });
                    true
                }
                None => false,
            });
            if !recorded.unwrap_or(false) {
                previous(info);
            }
        }));
    });
}

/// Run `f`, catching a panic together with its origin
fn catch_with_origin<R>(
    f: impl FnOnce() -> R,
) -> Result<R, (Box<dyn Any + Send + 'static>, Option<PanicOrigin>)> {
    install_panic_hook();
    // Nested scopes keep the outer slot intact
    let outer = PANIC_ORIGIN.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), Some(None)));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    let origin = PANIC_ORIGIN.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), outer));
    result.map_err(|payload| (payload, origin.flatten()))
}

/// How a guarded scope ended
#[derive(Debug)]
pub enum ScopeOutcome<R> {
    Completed(R),
    Failed(ScopeFailure),
}

impl<R> ScopeOutcome<R> {
    pub fn is_completed(&self) -> bool {
        matches!(self, ScopeOutcome::Completed(_))
    }

    pub fn failure(&self) -> Option<&ScopeFailure> {
        match self {
            ScopeOutcome::Completed(_) => None,
            ScopeOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<R, ScopeFailure> {
        match self {
            ScopeOutcome::Completed(value) => Ok(value),
            ScopeOutcome::Failed(failure) => Err(failure),
        }
    }
}

/// Log a scope failure, and write its report to `out` when `show` is set
pub fn report_failure<W: Write>(failure: &ScopeFailure, show: bool, out: &mut W) {
    error!(
        "Guarded scope failed ({}): {} {:?}",
        failure.kind, failure.message, failure.context
    );

    if show {
        if let Err(e) = failure.write_report(out).and_then(|_| out.flush()) {
            warn!("Could not print failure report: {}", e);
        }
    }
}

/// Run `body` inside a session guard.
///
/// The terminal is restored before anything else happens to the result.
/// A failure of `body` (error or panic) is logged and, with
/// `show_exceptions`, printed. Without `propagate_failures` it is then
/// returned as [`ScopeOutcome::Failed`]; with it, errors come back as
/// [`GuardError::Failed`] and panics resume unwinding.
pub fn run<T, R, F>(terminal: T, options: GuardOptions, body: F) -> Result<ScopeOutcome<R>, GuardError>
where
    T: Terminal,
    F: FnOnce(&mut T) -> anyhow::Result<R>,
{
    run_with_report(terminal, options, &mut io::stdout(), body)
}

/// [`run`], writing the failure report to `report` instead of stdout
pub fn run_with_report<T, R, F, W>(
    terminal: T,
    options: GuardOptions,
    report: &mut W,
    body: F,
) -> Result<ScopeOutcome<R>, GuardError>
where
    T: Terminal,
    F: FnOnce(&mut T) -> anyhow::Result<R>,
    W: Write,
{
    let mut guard = SessionGuard::enter(terminal, options)?;
    let result = catch_with_origin(|| body(guard.screen_mut()));
    let teardown = guard.leave();

    let (failure, payload) = match result {
        Ok(Ok(value)) => {
            teardown?;
            return Ok(ScopeOutcome::Completed(value));
        }
        Ok(Err(err)) => (ScopeFailure::from_error(&err), None),
        Err((payload, origin)) => (
            ScopeFailure::from_panic(payload.as_ref(), origin),
            Some(payload),
        ),
    };

    if let Err(e) = teardown {
        error!("Failed to restore terminal: {}", e);
    }
    report_failure(&failure, options.show_exceptions, report);

    if !options.propagate_failures {
        return Ok(ScopeOutcome::Failed(failure));
    }
    match payload {
        Some(payload) => panic::resume_unwind(payload),
        None => Err(GuardError::Failed(failure)),
    }
}
