//! `config` and `resolve` subcommands: offline inspection and editing of the
//! persisted snapshot.

use autoclick_engine::{TimingAdvisory, interval};
use config::{
    ConfigStore, Configuration, DelayClickSequence, IntervalSpec, Snapshot, load_snapshot,
    save_snapshot,
};
use tracing::info;

use crate::{
    cli::{ConfigCommand, ResolveArgs, SetArgs},
    error::Result,
};

/// Execute a `config` subcommand against `store` and return what to print.
pub fn run(cmd: &ConfigCommand, store: &dyn ConfigStore) -> Result<String> {
    let mut snapshot = load_snapshot(store);
    match cmd {
        ConfigCommand::Show => return Ok(render(&snapshot)),
        ConfigCommand::Set(args) => apply(args, &mut snapshot.config),
        ConfigCommand::AddStep { delay, count } => {
            snapshot.config.sequence = snapshot.config.sequence.with_step(*delay, *count);
        }
        ConfigCommand::RemoveStep { index } => {
            snapshot.config.sequence = snapshot.config.sequence.without_step(*index)?;
        }
        ConfigCommand::ResetCounter => snapshot.click_counter = 0,
    }
    save_snapshot(store, &snapshot)?;
    info!(command = ?cmd, "config_updated");
    Ok(render(&snapshot))
}

fn apply(args: &SetArgs, config: &mut Configuration) {
    if let Some(title) = &args.window_title {
        config.window_title = title.trim().to_string();
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(unit) = args.speed_mode {
        config.interval.unit = unit;
    }
    if let Some(text) = &args.interval {
        config.interval.raw = IntervalSpec::parse_raw(Some(text));
    }
    if !args.steps.is_empty()
        && let Ok(sequence) = DelayClickSequence::new(args.steps.clone())
    {
        config.sequence = sequence;
    }
}

/// Describe how an interval resolves, with any timing advisory.
pub fn describe_interval(spec: IntervalSpec) -> String {
    let effective = interval::effective_ms(spec);
    match TimingAdvisory::check(spec) {
        Some(advisory) => format!("{spec} -> {effective} ms\nwarning: {}", advisory.message()),
        None => format!("{spec} -> {effective} ms"),
    }
}

/// Output of the `resolve` subcommand.
pub fn resolve(args: &ResolveArgs) -> String {
    describe_interval(IntervalSpec::from_text(Some(&args.interval), args.speed_mode))
}

/// Human-readable rendering of a snapshot.
pub fn render(snapshot: &Snapshot) -> String {
    let c = &snapshot.config;
    let title = if c.window_title.is_empty() {
        "(not set)"
    } else {
        c.window_title.as_str()
    };
    let mut lines = vec![
        format!("window title : {title}"),
        format!("mode         : {} ({})", c.mode, c.mode.code()),
        format!("interval     : {}", describe_interval(c.interval)),
        format!(
            "plan         : {} step(s), {} click(s) per pass",
            c.sequence.len(),
            c.sequence.total_clicks()
        ),
    ];
    lines.extend(c.sequence.iter().enumerate().map(|(i, step)| {
        format!(
            "  [{i}] wait {}ms, then {} click(s)",
            step.delay_ms(),
            step.count()
        )
    }));
    lines.push(format!("click counter: {}", snapshot.click_counter));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use config::{DelayClickStep, FileStore, MemoryStore, SessionMode, SpeedUnit};

    use super::*;

    #[test]
    fn set_updates_only_given_fields() {
        let store = MemoryStore::new();
        let args = SetArgs {
            window_title: Some("  Game ".into()),
            mode: Some(SessionMode::Auto),
            ..SetArgs::default()
        };
        run(&ConfigCommand::Set(args), &store).expect("set");
        let snap = store.snapshot().expect("saved");
        assert_eq!(snap.config.window_title, "Game");
        assert_eq!(snap.config.mode, SessionMode::Auto);
        assert_eq!(snap.config.interval, IntervalSpec::default());

        let args = SetArgs {
            interval: Some("-3".into()),
            speed_mode: Some(SpeedUnit::Nanoseconds),
            steps: vec![DelayClickStep::new(5, 2)],
            ..SetArgs::default()
        };
        run(&ConfigCommand::Set(args), &store).expect("set");
        let snap = store.snapshot().expect("saved");
        assert_eq!(snap.config.window_title, "Game");
        assert_eq!(
            snap.config.interval,
            IntervalSpec::new(100, SpeedUnit::Nanoseconds)
        );
        assert_eq!(snap.config.sequence.steps(), &[DelayClickStep::new(5, 2)]);
    }

    #[test]
    fn last_step_cannot_be_removed() {
        let store = MemoryStore::new();
        let err = run(&ConfigCommand::RemoveStep { index: 0 }, &store).expect_err("last step");
        assert!(err.to_string().contains("Must keep at least one DelayClick"));

        run(&ConfigCommand::AddStep { delay: 50, count: 4 }, &store).expect("add");
        run(&ConfigCommand::RemoveStep { index: 0 }, &store).expect("remove");
        let snap = store.snapshot().expect("saved");
        assert_eq!(snap.config.sequence.steps(), &[DelayClickStep::new(50, 4)]);
    }

    #[test]
    fn edits_persist_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("nested").join("config.json"));
        run(&ConfigCommand::AddStep { delay: 0, count: 1 }, &store).expect("add");
        let shown = run(&ConfigCommand::Show, &store).expect("show");
        assert!(shown.contains("plan         : 2 step(s), 11 click(s) per pass"), "{shown}");
    }

    #[test]
    fn describe_warns_below_floor() {
        let text = describe_interval(IntervalSpec::new(500, SpeedUnit::Microseconds));
        assert!(text.starts_with("500"), "{text}");
        assert!(text.contains("warning: Scheduler timing is limited to ~1ms precision"));
        assert!(!describe_interval(IntervalSpec::default()).contains("warning"));
    }
}
