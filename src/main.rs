//! unicguard demo - draws a styled greeting inside a guarded session
//!
//! # Quick Start
//!
//! ```text
//! unicguard                    # Greeting, press any key to exit
//! unicguard --fail -s          # Fail inside the session and print the report
//! unicguard --fail --propagate # Fail and hand the error back to the shell
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use unicode_width::UnicodeWidthStr;

use unicguard::color::{BLUE, WHITE};
use unicguard::guard::{self, ScopeOutcome};
use unicguard::{Attr, Config, Style, Terminal, TtyTerminal};

const GREETING: &str = "Hello, World!";

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line overrides
#[derive(Default)]
struct Cli {
    show_exceptions: bool,
    propagate: bool,
    no_color: bool,
    /// Fail on purpose inside the session
    fail: bool,
}

fn print_version() {
    eprintln!("unicguard {}", VERSION);
}

fn print_help() {
    eprintln!("unicguard {} - Styled greeting inside a guarded terminal session", VERSION);
    eprintln!();
    eprintln!("Usage: unicguard [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --show-exceptions Print failure details after the session ends");
    eprintln!("      --propagate       Return failures to the caller instead of suppressing them");
    eprintln!("      --no-color        Do not start color support");
    eprintln!("      --fail            Fail inside the session (demonstrates reporting)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.unicguard/config.toml");
    eprintln!("Log file:      ~/.unicguard/unicguard.log (level from UNICGUARD_LOG)");
}

fn parse_args() -> Result<Cli, String> {
    let mut cli = Cli::default();

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--show-exceptions" => cli.show_exceptions = true,
            "--propagate" => cli.propagate = true,
            "--no-color" => cli.no_color = true,
            "--fail" => cli.fail = true,
            other => return Err(format!("Unknown option: {}", other)),
        }
    }

    Ok(cli)
}

/// Log to a file so nothing lands on the screen being drawn
fn init_logging() {
    let log_path = Config::get_config_dir()
        .map(|dir| dir.join("unicguard.log"))
        .unwrap_or_else(|| PathBuf::from("unicguard.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("UNICGUARD_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Block until a key is pressed
fn wait_for_key() -> std::io::Result<()> {
    loop {
        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("unicguard starting...");

    // Command line overrides the config file
    let config = Config::load();
    let mut options = config.guard;
    options.show_exceptions |= cli.show_exceptions;
    options.propagate_failures |= cli.propagate;
    if cli.no_color {
        options.start_color = false;
    }

    let outcome = guard::run(TtyTerminal::new(), options, |screen| {
        let mut registry = config.colors.registry(&*screen);

        let title = if options.start_color {
            let style = match config.styles.get("title") {
                Some(spec) => spec.build(&mut registry, screen)?,
                None => Style::new(&mut registry, screen, WHITE, Some(BLUE), [Attr::Bold])?,
            };
            Some(style)
        } else {
            None
        };

        match &title {
            Some(style) => style.apply(screen, |s| Ok(s.add_str(GREETING)?))?,
            None => screen.add_str(GREETING)?,
        }
        screen.add_str("\r\n")?;
        screen.add_str(&"─".repeat(GREETING.width()))?;

        if cli.fail {
            anyhow::bail!("Demo failure requested with --fail");
        }

        screen.add_str("\r\n\r\nPress any key to exit...\r\n")?;
        screen.refresh()?;
        wait_for_key()?;
        Ok(registry.len())
    })?;

    match outcome {
        ScopeOutcome::Completed(pairs) => {
            info!("unicguard finished ({} color pairs allocated)", pairs);
            Ok(())
        }
        ScopeOutcome::Failed(failure) => {
            if !options.show_exceptions {
                eprintln!("unicguard: {}", failure);
            }
            std::process::exit(1);
        }
    }
}
