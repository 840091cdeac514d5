//! Colorful console output for solver and orchestrator events.
//!
//! Provides a custom `tracing` layer that formats holefit events with colors.
//!
//! ## Log Levels
//!
//! - **INFO**: Lifecycle events (solve/phase start and end, puzzle state
//!   transitions, submissions)
//! - **DEBUG**: Progress updates (1/sec with speed and score), new best
//!   poses, reheats, retries
//! - **TRACE**: Individual annealing iterations

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();
static SOLVE_START_NANOS: AtomicU64 = AtomicU64::new(0);

/// Package version for banner display.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Target prefix shared by every holefit crate.
const TARGET_PREFIX: &str = "holefit";

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect.
/// Prints the banner and sets up tracing with `RUST_LOG` taking precedence
/// over the default `holefit=info`.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();
        install(LevelFilter::INFO);
    });
}

/// Like [`init`] without the banner, at the given default level.
pub fn init_quiet(level: LevelFilter) {
    INIT.get_or_init(|| install(level));
}

fn install(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let filter = match format!("{}={}", TARGET_PREFIX, level).parse() {
        Ok(directive) if std::env::var_os("RUST_LOG").is_none() => filter.add_directive(directive),
        _ => filter,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(HoleFitConsoleLayer)
        .try_init();
}

// Marks the start of solving for elapsed time tracking.
fn mark_solve_start() {
    let epoch = EPOCH.get_or_init(Instant::now);
    let nanos = epoch.elapsed().as_nanos() as u64;
    SOLVE_START_NANOS.store(nanos, Ordering::Relaxed);
}

// Returns elapsed time since solve start.
fn elapsed_secs() -> f64 {
    let Some(epoch) = EPOCH.get() else {
        return 0.0;
    };
    let start_nanos = SOLVE_START_NANOS.load(Ordering::Relaxed);
    let now_nanos = epoch.elapsed().as_nanos() as u64;
    now_nanos.saturating_sub(start_nanos) as f64 / 1_000_000_000.0
}

fn print_banner() {
    let banner = r#"
 _           _       __ _ _
| |__   ___ | | ___ / _(_) |_
| '_ \ / _ \| |/ _ \ |_| | __|
| | | | (_) | |  __/  _| | |_
|_| |_|\___/|_|\___|_| |_|\__|
"#;

    let version_line = format!("        v{} - Lattice Pose Annealer\n", VERSION);

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", banner.bright_cyan());
    let _ = writeln!(stdout, "{}", version_line.bright_white().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats holefit events with colors.
pub struct HoleFitConsoleLayer;

impl<S: Subscriber> Layer<S> for HoleFitConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(TARGET_PREFIX) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let level = *metadata.level();
        let output = format_event(&visitor, level);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    phase: Option<String>,
    status: Option<String>,
    score: Option<String>,
    puzzle: Option<String>,
    from: Option<String>,
    to: Option<String>,
    kind: Option<String>,
    target: Option<String>,
    donor: Option<String>,
    error: Option<String>,
    mode: Option<String>,
    steps: Option<u64>,
    speed: Option<u64>,
    step: Option<u64>,
    duration_ms: Option<u64>,
    vertices: Option<u64>,
    edges: Option<u64>,
    reheats: Option<u64>,
    attempts: Option<u64>,
    round: Option<u64>,
    pending: Option<u64>,
    waves: Option<u64>,
    solved: Option<u64>,
    failed: Option<u64>,
    submitted: Option<u64>,
    dislikes: Option<u64>,
    accepted: Option<bool>,
    feasible: Option<bool>,
    temperature: Option<f64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value).trim_matches('"').to_string();
        self.record_text(field, s);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "steps" => self.steps = Some(value),
            "speed" => self.speed = Some(value),
            "step" => self.step = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            "vertices" => self.vertices = Some(value),
            "edges" => self.edges = Some(value),
            "reheats" | "reheat" => self.reheats = Some(value),
            "attempts" => self.attempts = Some(value),
            "round" => self.round = Some(value),
            "pending" => self.pending = Some(value),
            "waves" => self.waves = Some(value),
            "solved" => self.solved = Some(value),
            "failed" => self.failed = Some(value),
            "submitted" => self.submitted = Some(value),
            "dislikes" => self.dislikes = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "temperature" {
            self.temperature = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "accepted" => self.accepted = Some(value),
            "feasible" => self.feasible = Some(value),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }
}

impl EventVisitor {
    fn record_text(&mut self, field: &Field, value: String) {
        let slot = match field.name() {
            "event" => &mut self.event,
            "phase" => &mut self.phase,
            "status" => &mut self.status,
            "score" => &mut self.score,
            "puzzle" => &mut self.puzzle,
            "from" => &mut self.from,
            "to" => &mut self.to,
            "kind" => &mut self.kind,
            "target" => &mut self.target,
            "donor" => &mut self.donor,
            "error" => &mut self.error,
            "mode" => &mut self.mode,
            _ => return,
        };
        *slot = Some(value);
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    let event = v.event.as_deref().unwrap_or("");

    match event {
        "solve_start" => format_solve_start(v),
        "solve_end" => format_solve_end(v),
        "phase_start" => format_phase_start(v),
        "phase_end" => format_phase_end(v),
        "progress" => format_progress(v),
        "reheat" => format_reheat(v),
        "step" => format_step(v, level),
        "puzzle_state" => format_puzzle_state(v),
        "round_start" => format_round_start(v),
        "bonus_unlocked" => format_bonus_unlocked(v),
        "bonus_cycle" | "bonus_cycle_fallback" => format_warning(v, event),
        "submission_accepted" | "submission_rejected" | "submission_gave_up" => {
            format_submission(v, event)
        }
        "run_end" => format_run_end(v),
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs())
        .bright_black()
        .to_string()
}

fn count(n: Option<u64>) -> String {
    n.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_solve_start(v: &EventVisitor) -> String {
    mark_solve_start();
    format!(
        "{} {} Solving {} │ {} vertices │ {} edges │ {}",
        format_elapsed(),
        "▶".bright_green().bold(),
        v.puzzle.as_deref().unwrap_or("puzzle").bright_white().bold(),
        count(v.vertices).bright_yellow(),
        count(v.edges).bright_yellow(),
        v.mode.as_deref().unwrap_or("ScoreMaximizer").bright_magenta()
    )
}

fn format_solve_end(v: &EventVisitor) -> String {
    let score = v.score.as_deref().unwrap_or("N/A");
    let is_feasible = v
        .feasible
        .unwrap_or_else(|| score.starts_with("0violation"));

    let status = if is_feasible {
        "VALID".bright_green().bold().to_string()
    } else {
        "INVALID".bright_red().bold().to_string()
    };

    format!(
        "{} {} Solving complete │ {} │ {} │ {} │ {} steps",
        format_elapsed(),
        "■".bright_cyan().bold(),
        v.status.as_deref().unwrap_or("-").white(),
        format_score(score),
        status,
        count(v.steps).white()
    )
}

fn format_phase_start(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("Unknown");

    format!(
        "{} {} {} started",
        format_elapsed(),
        "▶".bright_blue(),
        phase.white().bold()
    )
}

fn format_phase_end(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("Unknown");
    let score = v.score.as_deref().unwrap_or("N/A");
    let duration = v.duration_ms.unwrap_or(0);

    let mut output = format!(
        "{} {} {} ended │ {} │ {} steps │ {} moves/s",
        format_elapsed(),
        "◀".bright_blue(),
        phase.white().bold(),
        format_duration_ms(duration).yellow(),
        count(v.steps).white(),
        count(v.speed).bright_magenta().bold(),
    );

    if let Some(reheats) = v.reheats.filter(|&r| r > 0) {
        output.push_str(&format!(" │ {} reheats", reheats.bright_yellow()));
    }

    output.push_str(&format!(" │ {}", format_score(score)));

    output
}

fn format_progress(v: &EventVisitor) -> String {
    let score = v.score.as_deref().unwrap_or("N/A");

    format!(
        "{} {} {:>10} steps │ {:>12}/s │ T={:<10.3} │ {}",
        format_elapsed(),
        "⚡".bright_cyan(),
        count(v.steps).white(),
        count(v.speed).bright_magenta().bold(),
        v.temperature.unwrap_or(0.0),
        format_score(score)
    )
}

fn format_reheat(v: &EventVisitor) -> String {
    format!(
        "{} {} Reheat {} │ T={:.3} │ {} steps",
        format_elapsed(),
        "♨".bright_yellow(),
        count(v.reheats).bright_yellow(),
        v.temperature.unwrap_or(0.0),
        count(v.steps).white()
    )
}

fn format_step(v: &EventVisitor, level: Level) -> String {
    if level != Level::TRACE {
        return String::new();
    }

    let score = v.score.as_deref().unwrap_or("N/A");
    let icon = if v.accepted.unwrap_or(false) {
        "✓".bright_green().to_string()
    } else {
        "✗".bright_red().to_string()
    };

    format!(
        "{} {} Step {:>10} │ {}",
        format_elapsed(),
        icon,
        count(v.step).bright_black(),
        format_score(score).bright_black()
    )
}

fn format_puzzle_state(v: &EventVisitor) -> String {
    let to = v.to.as_deref().unwrap_or("?");
    let colored = match to {
        "SUBMITTED" | "SOLVED" => to.bright_green().bold().to_string(),
        "FAILED" => to.bright_red().bold().to_string(),
        _ => to.white().to_string(),
    };
    format!(
        "{} {} Puzzle {} │ {} → {}",
        format_elapsed(),
        "●".bright_blue(),
        v.puzzle.as_deref().unwrap_or("?").bright_white().bold(),
        v.from.as_deref().unwrap_or("?").bright_black(),
        colored
    )
}

fn format_round_start(v: &EventVisitor) -> String {
    format!(
        "{} {} Round {} │ {} pending │ {} waves",
        format_elapsed(),
        "↻".bright_cyan().bold(),
        count(v.round).bright_white().bold(),
        count(v.pending).bright_yellow(),
        count(v.waves).bright_yellow()
    )
}

fn format_bonus_unlocked(v: &EventVisitor) -> String {
    format!(
        "{} {} {} unlocked │ {} → {}",
        format_elapsed(),
        "★".bright_yellow().bold(),
        v.kind.as_deref().unwrap_or("BONUS").bright_magenta().bold(),
        v.donor.as_deref().unwrap_or("?").white(),
        v.target.as_deref().unwrap_or("?").white()
    )
}

fn format_warning(v: &EventVisitor, event: &str) -> String {
    let what = if event == "bonus_cycle" {
        "Bonus cycle broken"
    } else {
        "Bonus cycle abandoned"
    };
    format!(
        "{} {} {} │ {}",
        format_elapsed(),
        "⚠".bright_yellow().bold(),
        what.yellow(),
        v.puzzle.as_deref().unwrap_or("").white()
    )
}

fn format_submission(v: &EventVisitor, event: &str) -> String {
    let puzzle = v.puzzle.as_deref().unwrap_or("?");
    let attempts = count(v.attempts);
    match event {
        "submission_accepted" => format!(
            "{} {} Submitted {} │ {} attempts",
            format_elapsed(),
            "✓".bright_green().bold(),
            puzzle.bright_white().bold(),
            attempts
        ),
        "submission_rejected" => format!(
            "{} {} Rejected {} │ {}",
            format_elapsed(),
            "✗".bright_red().bold(),
            puzzle.bright_white().bold(),
            v.error.as_deref().unwrap_or("").bright_red()
        ),
        _ => format!(
            "{} {} Submission of {} deferred after {} attempts │ {}",
            format_elapsed(),
            "…".yellow(),
            puzzle.bright_white().bold(),
            attempts,
            v.error.as_deref().unwrap_or("").yellow()
        ),
    }
}

fn format_run_end(v: &EventVisitor) -> String {
    let mut output = String::from("\n");
    output.push_str(
        &"╔══════════════════════════════════════════════════════════╗"
            .bright_cyan()
            .to_string(),
    );
    output.push('\n');
    for (label, value) in [
        ("Attempts:", v.attempts),
        ("Solved:", v.solved),
        ("Failed:", v.failed),
        ("Submitted:", v.submitted),
    ] {
        output.push_str(&format!(
            "{}  {:<18}{:>36}  {}",
            "║".bright_cyan(),
            label,
            count(value),
            "║".bright_cyan()
        ));
        output.push('\n');
    }
    output.push_str(
        &"╚══════════════════════════════════════════════════════════╝"
            .bright_cyan()
            .to_string(),
    );
    output
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Colors `"<v>violation/<d>dislikes"`: red while violating, green at zero
/// dislikes.
fn format_score(score: &str) -> String {
    let Some((violation, dislikes)) = score.split_once('/') else {
        return score.white().to_string();
    };
    let violation_num: u64 = violation
        .trim_end_matches("violation")
        .parse()
        .unwrap_or(0);
    let dislikes_num: u64 = dislikes.trim_end_matches("dislikes").parse().unwrap_or(0);

    let violation_str = if violation_num > 0 {
        violation.bright_red().to_string()
    } else {
        violation.bright_green().to_string()
    };
    let dislikes_str = if dislikes_num == 0 {
        dislikes.bright_green().to_string()
    } else {
        dislikes.yellow().to_string()
    };
    format!("{}/{}", violation_str, dislikes_str)
}

#[cfg(test)]
mod tests;
