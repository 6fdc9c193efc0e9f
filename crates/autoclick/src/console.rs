//! Interactive `run` loop: commands from stdin drive the engine, engine
//! events are printed as they arrive.

use std::sync::Arc;

use autoclick_engine::{Engine, HttpBackend, Shortcut, TriggerOutcome};
use autoclick_protocol::{
    NotifyKind, UiEvent,
    ipc::{UiRx, ui_channel},
};
use config::{ConfigStore, IntervalSpec, SessionMode};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    signal,
};
use tracing::{debug, info, warn};

use crate::{cli::RunArgs, error::Result};

const HELP: &str = "\
commands:
  s, start          start a session with the current configuration
  x, stop           stop the session
  t, <enter>        trigger one pass of the plan (KEY/MOUSE/MANUAL)
  c, click          count one manual click
  r, reset          reset the counter
  f1 | f2 | f3      keyboard shortcuts
  title <TEXT>      change the target window title
  mode <MODE>       change the mode (KEY, MOUSE, AUTO, MANUAL)
  interval <N>      change the interval, keeping its unit
  status            show session state and counter
  q, quit           exit";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a session.
    Start,
    /// Stop the session.
    Stop,
    /// Trigger a one-shot run.
    Trigger,
    /// Count a manual click.
    Click,
    /// Reset the counter.
    Reset,
    /// Simulated keyboard shortcut.
    Shortcut(Shortcut),
    /// Set the target window title.
    Title(String),
    /// Set the session mode.
    Mode(SessionMode),
    /// Set the raw interval text.
    Interval(String),
    /// Print status.
    Status,
    /// Print help.
    Help,
    /// Leave the loop.
    Quit,
}

/// Parse one console line; `None` for anything unrecognized.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "" | "t" | "trigger" => Command::Trigger,
        "s" | "start" => Command::Start,
        "x" | "stop" => Command::Stop,
        "c" | "click" => Command::Click,
        "r" | "reset" => Command::Reset,
        "f1" => Command::Shortcut(Shortcut::Execute),
        "f2" => Command::Shortcut(Shortcut::Stop),
        "f3" => Command::Shortcut(Shortcut::SaveCoordinates),
        "title" if !rest.is_empty() => Command::Title(rest.to_string()),
        "mode" => Command::Mode(rest.parse().ok()?),
        "interval" if !rest.is_empty() => Command::Interval(rest.to_string()),
        "status" => Command::Status,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// Console rendering of an engine event; `None` for high-frequency events.
pub fn render_event(event: &UiEvent) -> Option<String> {
    match event {
        UiEvent::Counter { .. } | UiEvent::StepStarted { .. } => None,
        UiEvent::Cps { cps } => Some(format!("cps: {cps:.1}")),
        UiEvent::Status { status, text } => Some(format!("[{status:?}] {text}")),
        UiEvent::Notify { kind, text } => {
            let label = match kind {
                NotifyKind::Info => "info",
                NotifyKind::Warn => "warning",
                NotifyKind::Error => "error",
                NotifyKind::Success => "ok",
            };
            Some(format!("{label}: {text}"))
        }
        UiEvent::CycleCompleted { cycles } => Some(format!("cycle {cycles} completed")),
        UiEvent::RunFinished { clicks } => Some(format!("run finished after {clicks} click(s)")),
        UiEvent::RestartRequired => Some("press start to apply the new settings".to_string()),
    }
}

/// Run the interactive console until `quit`, end of input or Ctrl-C.
pub async fn run(store: Arc<dyn ConfigStore>, args: &RunArgs) -> Result<()> {
    let settings = args.engine_config();
    let backend = HttpBackend::new(settings.backend_url.clone(), settings.backend_timeout)?;
    info!(url = %backend.base_url(), "backend_configured");
    let (tx, mut rx) = ui_channel();
    let engine = Engine::new(Arc::new(backend), store, tx, settings);
    engine.start_autosave();

    println!("{HELP}");
    if args.start {
        report(engine.start_current().await);
    }

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = rx.recv() => print_event(&event),
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(cmd) = parse_command(&line) else {
                        println!("unknown command '{}'; type 'help'", line.trim());
                        continue;
                    };
                    if cmd == Command::Quit {
                        break;
                    }
                    execute(&engine, cmd).await;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin_read_failed");
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                debug!("ctrl_c");
                break;
            }
        }
    }

    if engine.status().can_stop() {
        report(engine.stop().await);
    }
    engine.shutdown().await;
    flush_events(&mut rx);
    Ok(())
}

async fn execute(engine: &Engine, cmd: Command) {
    match cmd {
        Command::Start => report(engine.start_current().await),
        Command::Stop => report(engine.stop().await),
        Command::Trigger => match engine.trigger() {
            TriggerOutcome::Started => {}
            TriggerOutcome::NotActive => println!("no active session; 'start' first"),
            TriggerOutcome::Automatic => println!("AUTO mode runs without triggers"),
        },
        Command::Click => {
            engine.click();
        }
        Command::Reset => engine.reset_counter(),
        Command::Shortcut(shortcut) => report(engine.handle_shortcut(shortcut).await),
        Command::Title(title) => {
            let mut config = engine.configuration();
            config.window_title = title;
            report(engine.on_configuration_changed(config).await);
        }
        Command::Mode(mode) => {
            let mut config = engine.configuration();
            config.mode = mode;
            report(engine.on_configuration_changed(config).await);
        }
        Command::Interval(text) => {
            let mut config = engine.configuration();
            config.interval.raw = IntervalSpec::parse_raw(Some(&text));
            report(engine.on_configuration_changed(config).await);
        }
        Command::Status => {
            let snap = engine.tracker().snapshot();
            let config = engine.configuration();
            println!(
                "{:?} | mode {} | interval {} | clicks {} | cps {:.1}",
                engine.status(),
                config.mode,
                config.interval,
                snap.count,
                snap.cps
            );
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn report(result: autoclick_engine::Result<()>) {
    if let Err(e) = result {
        eprintln!("error: {e}");
    }
}

fn print_event(event: &UiEvent) {
    if let Some(text) = render_event(event) {
        println!("{text}");
    }
}

fn flush_events(rx: &mut UiRx) {
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }
}
