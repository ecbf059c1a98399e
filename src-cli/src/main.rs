//! FE2CM Command Line Interface
//!
//! Inspect the key tables, check accelerators, edit the preferences file,
//! record a hotkey from the live keyboard and run the hotkey engine in the
//! foreground.

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fe2cm_common::config::{Config, CONFIG_KEYS};
use fe2cm_common::{keymap, Accelerator, HotkeyAction};
use fe2cm_engine::config::{load_config_for_update, load_config_from, save_config_to};
use fe2cm_engine::hotkey::{
    check_accessibility_permission, request_accessibility_permission, CapturedHotkey,
    HotkeyEngine, HotkeyService,
};
use fe2cm_engine::{EventBroadcaster, UiEvent};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fe2cm")]
#[command(author = "FE2CM")]
#[command(version)]
#[command(about = "Global hotkeys for FE2CM volume control", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Preferences file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List every key name with its keycodes
    Keys,

    /// Parse an accelerator such as "Ctrl+Shift+F5"
    Parse {
        /// Accelerator string
        accelerator: String,
    },

    /// Read or write persisted configuration values
    #[command(alias = "cfg")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Record the next key combination pressed anywhere on the system
    Capture {
        /// Store the result as the hotkey for this action
        #[arg(long, value_name = "ACTION")]
        save: Option<ActionArg>,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 30, value_name = "SECS")]
        timeout: u64,
    },

    /// Run the configured hotkeys and print what they do until Ctrl+C
    Listen,

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display all configuration values
    Show,

    /// Get the value of a configuration key
    Get {
        /// Configuration key (volume, onDeath, onLeave, hotkeys.mute, hotkeys.volUp, hotkeys.volDown)
        key: String,
    },

    /// Set the value of a configuration key
    Set {
        /// Configuration key (volume, onDeath, onLeave, hotkeys.mute, hotkeys.volUp, hotkeys.volDown)
        key: String,

        /// Value to set; "none" unbinds a hotkey
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Mute,
    VolUp,
    VolDown,
}

impl From<ActionArg> for HotkeyAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Mute => HotkeyAction::Mute,
            ActionArg::VolUp => HotkeyAction::VolUp,
            ActionArg::VolDown => HotkeyAction::VolDown,
        }
    }
}

/// Error with an associated exit code.
struct CliError {
    message: String,
    exit_code: i32,
}

impl CliError {
    fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    fn general(message: impl Into<String>) -> Self {
        Self::new(message, 1)
    }

    fn usage(message: impl Into<String>) -> Self {
        Self::new(message, 64)
    }
}

impl From<String> for CliError {
    fn from(message: String) -> Self {
        Self::general(message)
    }
}

impl From<&str> for CliError {
    fn from(message: &str) -> Self {
        Self::general(message.to_string())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The long-running engine logs like the GUI does; one-shot commands log to stderr.
    let log_guard = match cli.command {
        Commands::Listen => fe2cm_engine::logging::init_logging(),
        _ => {
            init_logging(cli.verbose);
            None
        }
    };

    let result = run(cli).await;
    drop(log_guard);

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e.message);
        std::process::exit(e.exit_code);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Error for a keyboard hook that could not be installed.
///
/// On macOS a missing Accessibility grant also brings up the system prompt.
fn hook_error(context: &str, reason: impl std::fmt::Display) -> CliError {
    let mut message = format!("{}: {}", context, reason);
    if !check_accessibility_permission() {
        request_accessibility_permission();
        message.push_str(
            "\nGrant Accessibility access in System Settings > Privacy & Security, then run again",
        );
    }
    CliError::general(message)
}

/// Ctrl+C interrupts the CLI, so it is never recorded as a hotkey.
fn is_cancel_chord(accel: &str) -> bool {
    accel == "Ctrl+C"
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::Version => {
            println!("fe2cm {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Keys => handle_keys(&cli),
        Commands::Parse { accelerator } => handle_parse(accelerator, &cli),
        Commands::Config { action } => handle_config(action, &cli),
        Commands::Capture { save, timeout } => handle_capture(*save, *timeout, &cli).await,
        Commands::Listen => handle_listen(&cli).await,
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(Config::config_path)
}

fn is_json(cli: &Cli) -> bool {
    matches!(cli.format, OutputFormat::Json)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

/// Handle `keys` -- list the key tables.
fn handle_keys(cli: &Cli) -> Result<(), CliError> {
    let tables = keymap::tables();

    if is_json(cli) {
        let keys: Vec<_> = tables
            .names()
            .map(|name| {
                json!({
                    "name": name,
                    "keycode": tables.keycode(name),
                    "numlockOffKeycode": tables.numpad_alt_keycode(name),
                })
            })
            .collect();
        return print_json(&keys);
    }

    for name in tables.names() {
        let Some(keycode) = tables.keycode(name) else {
            continue;
        };
        match tables.numpad_alt_keycode(name) {
            Some(alt) => println!(
                "  {:<16} {}  {}",
                name.bold(),
                keycode,
                format!("(NumLock off: {})", alt).dimmed()
            ),
            None => println!("  {:<16} {}", name.bold(), keycode),
        }
    }
    Ok(())
}

/// Handle `parse <accelerator>` -- show what an accelerator binds.
fn handle_parse(accelerator: &str, cli: &Cli) -> Result<(), CliError> {
    let parsed = Accelerator::parse(accelerator).map_err(|e| CliError::usage(e.to_string()))?;

    if is_json(cli) {
        return print_json(&json!({ "accelerator": accelerator, "binding": parsed }));
    }

    let Some(accel) = parsed else {
        println!("{}", "(unbound)".dimmed());
        return Ok(());
    };

    println!("{}: {}", "canonical".bold(), accel.to_string().green());
    println!("{}: {}", "key".bold(), accel.key);
    println!("{}: {}", "keycode".bold(), accel.keycode);
    if let Some(alt) = accel.alt_keycode {
        println!("{}: {}", "numlock-off keycode".bold(), alt);
    }
    let mods = accel.modifiers;
    println!(
        "{}: ctrl={} alt={} shift={} meta={}",
        "modifiers".bold(),
        mods.ctrl,
        mods.alt,
        mods.shift,
        mods.meta
    );
    Ok(())
}

fn handle_config(action: &ConfigAction, cli: &Cli) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => handle_config_show(cli),
        ConfigAction::Get { key } => handle_config_get(key, cli),
        ConfigAction::Set { key, value } => handle_config_set(key, value, cli),
    }
}

/// Validate that a config key name is recognized.
fn validate_config_key(key: &str) -> Result<(), CliError> {
    if CONFIG_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(CliError::usage(format!(
            "Unknown configuration key '{}'. Valid keys: {}",
            key,
            CONFIG_KEYS.join(", ")
        )))
    }
}

fn display_value(key: &str, value: &str) -> String {
    if key.starts_with("hotkeys.") && value.is_empty() {
        "(none)".to_string()
    } else {
        value.to_string()
    }
}

/// Handle `config show` -- display all config values.
fn handle_config_show(cli: &Cli) -> Result<(), CliError> {
    let config = load_config_from(&config_path(cli));

    if is_json(cli) {
        return print_json(&config);
    }

    for key in CONFIG_KEYS {
        let value = config.get(key).unwrap_or_default();
        println!("{}: {}", key.bold(), display_value(key, &value));
    }
    Ok(())
}

/// Handle `config get <key>` -- display a single config value.
fn handle_config_get(key: &str, cli: &Cli) -> Result<(), CliError> {
    validate_config_key(key)?;
    let config = load_config_from(&config_path(cli));
    let value = config.get(key).unwrap_or_default();

    if is_json(cli) {
        return print_json(&json!({ key: value }));
    }
    println!("{}", display_value(key, &value));
    Ok(())
}

/// Handle `config set <key> <value>` -- update a config value.
fn handle_config_set(key: &str, value: &str, cli: &Cli) -> Result<(), CliError> {
    validate_config_key(key)?;
    let path = config_path(cli);
    let mut config = load_config_for_update(&path)
        .map_err(|e| format!("Cannot update {}: {}", path.display(), e))?;
    config.set(key, value).map_err(CliError::usage)?;
    save_config_to(&config, &path)
        .map_err(|e| format!("Failed to save config to {}: {}", path.display(), e))?;

    let stored = config.get(key).unwrap_or_default();
    if is_json(cli) {
        return print_json(&json!({ key: stored }));
    }
    if !cli.quiet {
        println!(
            "{} {} = {}",
            "Set".green(),
            key.bold(),
            display_value(key, &stored)
        );
    }
    Ok(())
}

/// Handle `capture` -- record one accelerator from the live keyboard.
async fn handle_capture(
    save: Option<ActionArg>,
    timeout: u64,
    cli: &Cli,
) -> Result<(), CliError> {
    let engine = Arc::new(HotkeyEngine::new());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    engine.set_capture_sink(Arc::new(move |accel: String| {
        if !is_cancel_chord(&accel) {
            let _ = tx.send(accel);
        }
    }));
    engine.start_capture();

    let mut service = HotkeyService::new(engine.clone());
    service
        .start()
        .map_err(|e| hook_error("Cannot capture hotkeys", e))?;

    if !cli.quiet {
        eprintln!(
            "Press a key combination ({} clears, {} to cancel)...",
            "Backspace/Delete/Esc".cyan(),
            "Ctrl+C".cyan()
        );
    }

    let outcome = tokio::select! {
        accel = rx.recv() => accel.ok_or_else(|| CliError::general("Capture ended unexpectedly")),
        _ = tokio::time::sleep(Duration::from_secs(timeout)) => {
            Err(CliError::general(format!("No key pressed within {}s", timeout)))
        }
        _ = tokio::signal::ctrl_c() => Err(CliError::general("Interrupted")),
    };

    engine.stop_capture();
    service.stop();

    let captured = CapturedHotkey::from_accelerator(&outcome?);

    let saved_to = match save {
        Some(action) => {
            let action = HotkeyAction::from(action);
            let path = config_path(cli);
            let mut config = load_config_for_update(&path)
                .map_err(|e| format!("Cannot update {}: {}", path.display(), e))?;
            config.settings.hotkeys.set(action, captured.value());
            save_config_to(&config, &path)
                .map_err(|e| format!("Failed to save config to {}: {}", path.display(), e))?;
            Some((action, path))
        }
        None => None,
    };

    if is_json(cli) {
        return print_json(&json!({
            "accelerator": captured.value(),
            "clear": captured == CapturedHotkey::Clear,
            "action": saved_to.as_ref().map(|(action, _)| action.config_key()),
        }));
    }

    match &captured {
        CapturedHotkey::Set(accel) => println!("{}", accel),
        CapturedHotkey::Clear => println!("{}", "(none)".dimmed()),
    }
    if let Some((action, path)) = saved_to {
        if !cli.quiet {
            eprintln!(
                "{} {} in {}",
                "Saved".green(),
                action.display_name(),
                path.display()
            );
        }
    }
    Ok(())
}

/// Handle `listen` -- run the hotkeys in the foreground.
async fn handle_listen(cli: &Cli) -> Result<(), CliError> {
    let events = EventBroadcaster::new();
    let mut rx = events.subscribe();
    let mut engine = fe2cm_engine::init(&config_path(cli), events);

    if !engine.service.is_listening() {
        let reason = engine
            .service
            .last_error()
            .map(str::to_string)
            .or_else(|| engine.service.unavailable_reason())
            .unwrap_or_else(|| "Global hotkeys are unavailable".to_string());
        return Err(hook_error("Cannot listen for hotkeys", reason));
    }

    if !cli.quiet && !is_json(cli) {
        let config = engine.controls.config();
        for (action, accel) in config.settings.hotkeys.bindings() {
            let accel = if accel.is_empty() { "(none)" } else { accel };
            eprintln!("  {:<12} {}", action.display_name().bold(), accel);
        }
        eprintln!("Listening for hotkeys, press {} to stop", "Ctrl+C".cyan());
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                if !cli.quiet {
                    eprintln!("\n{}", "Interrupted".yellow());
                }
                break;
            }
            event = rx.recv() => match event {
                Ok(event) => print_event(&event, cli)?,
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Skipped {} UI events", n);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.service.stop();
    Ok(())
}

fn print_event(event: &UiEvent, cli: &Cli) -> Result<(), CliError> {
    if is_json(cli) {
        let line = serde_json::to_string(event).map_err(|e| e.to_string())?;
        println!("{}", line);
        return Ok(());
    }

    match event {
        UiEvent::ToggleMute => println!("{}", "mute toggled".yellow()),
        UiEvent::UpdateVolume(volume) => println!("volume {}", volume.to_string().green()),
        UiEvent::HotkeyCaptured(accel) => println!("captured {}", accel),
        UiEvent::StateRestored => {
            if cli.verbose {
                eprintln!("{}", "[preferences loaded]".dimmed());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe2cm_common::{KeyEvent, ModifierState};

    #[test]
    fn test_cancel_chord_is_not_captured() {
        assert!(is_cancel_chord("Ctrl+C"));
        assert!(!is_cancel_chord("Ctrl+Shift+C"));
        assert!(!is_cancel_chord("Alt+C"));
        assert!(!is_cancel_chord("C"));
    }

    #[test]
    fn test_capture_skips_ctrl_c_and_keeps_recording() {
        let engine = HotkeyEngine::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        engine.set_capture_sink(Arc::new(move |accel: String| {
            if !is_cancel_chord(&accel) {
                let _ = tx.send(accel);
            }
        }));
        engine.start_capture();

        let c = keymap::keycode_for("C").unwrap();
        engine.handle(&KeyEvent::down(c, ModifierState::ctrl()));
        assert!(rx.try_recv().is_err());

        let f5 = keymap::keycode_for("F5").unwrap();
        engine.handle(&KeyEvent::down(f5, ModifierState::ctrl()));
        assert_eq!(rx.try_recv().unwrap(), "Ctrl+F5");
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_hook_error_without_permission_hint() {
        let err = hook_error("Cannot listen for hotkeys", "no backend");
        assert_eq!(err.message, "Cannot listen for hotkeys: no backend");
        assert_eq!(err.exit_code, 1);
    }
}
