//! holefit command-line interface

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use holefit_autonomous::{
    load_puzzle_set, HttpSubmitter, Orchestrator, OrchestratorError, RunSummary,
    SubmissionReceipt, Submitter,
};
use holefit_config::{OperatingModeConfig, SolverConfig};
use holefit_core::{io, validate, Pose, ProblemId, Validation};
use holefit_solver::{InitialPose, PoseSolver};
use owo_colors::OwoColorize;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "holefit")]
#[command(about = "Fits lattice figures into holes by simulated annealing")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or YAML); defaults apply when absent
    #[arg(short, long, global = true, default_value = "holefit.toml")]
    config: PathBuf,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one problem and write the best pose
    Anneal {
        /// Problem file
        problem: PathBuf,

        /// Output pose file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start from this pose instead of a random placement
        #[arg(short, long)]
        initial: Option<PathBuf>,

        /// Operating mode
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Puzzle whose bonus to collect (bonus-collector mode)
        #[arg(long)]
        target: Option<u32>,

        /// Time limit in milliseconds
        #[arg(short, long)]
        time_limit: Option<u64>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Greedy improvement only, no uphill moves
        #[arg(long)]
        polish: bool,
    },

    /// Validate a pose and print its dislikes or violations
    Score {
        /// Problem file
        problem: PathBuf,

        /// Pose file
        pose: PathBuf,
    },

    /// Solve and submit every problem in a directory
    Autonomous {
        /// Directory of problem files
        problems: PathBuf,

        /// Persisted state file (overrides the config)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Submission endpoint (overrides the config)
        #[arg(long)]
        endpoint: Option<String>,

        /// API token for the submission endpoint
        #[arg(long, env = "HOLEFIT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Write poses to this directory instead of submitting
        #[arg(long)]
        dry_run: Option<PathBuf>,
    },

    /// Print which puzzles grant bonuses to which
    BonusTable {
        /// Directory of problem files
        problems: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    ScoreMaximizer,
    BonusCollector,
    BonusHunter,
    ZeroHunter,
}

fn operating_mode(mode: ModeArg, target: Option<u32>) -> Result<OperatingModeConfig> {
    Ok(match mode {
        ModeArg::ScoreMaximizer => OperatingModeConfig::ScoreMaximizer,
        ModeArg::BonusCollector => {
            let Some(target) = target else {
                bail!("bonus-collector mode needs --target");
            };
            OperatingModeConfig::BonusCollector {
                target: ProblemId(target),
            }
        }
        ModeArg::BonusHunter => OperatingModeConfig::BonusHunter,
        ModeArg::ZeroHunter => OperatingModeConfig::ZeroHunter,
    })
}

fn load_config(path: &Path) -> Result<SolverConfig> {
    if !path.exists() {
        return Ok(SolverConfig::default());
    }
    SolverConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.quiet {
        holefit_console::init_quiet(tracing::level_filters::LevelFilter::WARN);
    } else {
        holefit_console::init();
    }
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Anneal {
            problem,
            output,
            initial,
            mode,
            target,
            time_limit,
            seed,
            polish,
        } => {
            let mut config = config;
            if let Some(mode) = mode {
                config = config.with_operating_mode(operating_mode(mode, target)?);
            }
            if let Some(millis) = time_limit {
                config = config.with_time_limit_millis(millis);
            }
            if let Some(seed) = seed {
                config = config.with_random_seed(seed);
            }
            anneal(&problem, output.as_deref(), initial.as_deref(), config, polish)
        }
        Commands::Score { problem, pose } => score(&problem, &pose),
        Commands::Autonomous {
            problems,
            state,
            endpoint,
            token,
            dry_run,
        } => {
            let mut config = config;
            if state.is_some() {
                config.orchestrator.state_file = state;
            }
            if endpoint.is_some() {
                config.submission.endpoint = endpoint;
            }
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime.block_on(autonomous(&problems, config, token, dry_run))
        }
        Commands::BonusTable { problems } => bonus_table(&problems),
    }
}

fn anneal(
    problem_path: &Path,
    output: Option<&Path>,
    initial: Option<&Path>,
    config: SolverConfig,
    polish: bool,
) -> Result<()> {
    let problem = Arc::new(
        io::load_problem(problem_path)
            .with_context(|| format!("loading problem {}", problem_path.display()))?,
    );
    let initial = match initial {
        Some(path) => InitialPose::Given(
            io::load_pose(path).with_context(|| format!("loading pose {}", path.display()))?,
        ),
        None => InitialPose::default(),
    };

    let solver = PoseSolver::new(Arc::clone(&problem), config).with_initial_pose(initial);
    let result = if polish { solver.polish()? } else { solver.solve()? };

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| problem_path.with_extension("pose.json"));
    io::write_pose(&output, result.output_pose())
        .with_context(|| format!("writing pose {}", output.display()))?;

    match result.best.as_ref() {
        Some(best) => println!(
            "{} {} dislikes │ {} │ {}",
            "✓".bright_green().bold(),
            best.score.dislikes(),
            result.status,
            output.display()
        ),
        None => {
            warn!(event = "no_valid_pose", status = %result.status);
            println!(
                "{} best effort, no valid pose │ {} │ {}",
                "✗".bright_red().bold(),
                result.status,
                output.display()
            );
            for violation in &result.final_evaluation.violations {
                println!("  {:?}", violation);
            }
        }
    }
    for spec in &result.granted {
        println!(
            "  {} {} for {}",
            "★".bright_yellow(),
            spec.kind,
            spec.target.or(problem.id()).map_or("-".to_string(), |id| id.to_string())
        );
    }
    Ok(())
}

fn score(problem_path: &Path, pose_path: &Path) -> Result<()> {
    let problem = io::load_problem(problem_path)
        .with_context(|| format!("loading problem {}", problem_path.display()))?;
    let pose = io::load_pose(pose_path)
        .with_context(|| format!("loading pose {}", pose_path.display()))?;

    match validate(&problem, &pose) {
        Validation::Valid(dislikes) => {
            println!("{} valid │ {} dislikes", "✓".bright_green().bold(), dislikes);
            Ok(())
        }
        Validation::Invalid(violations) => {
            println!("{} invalid", "✗".bright_red().bold());
            for violation in &violations {
                println!("  {:?}", violation);
            }
            std::process::exit(1);
        }
    }
}

/// Writes each pose to `<dir>/<id>.pose.json` instead of submitting.
struct DirectorySubmitter {
    dir: PathBuf,
}

impl Submitter for DirectorySubmitter {
    async fn submit(
        &self,
        puzzle: ProblemId,
        pose: &Pose,
    ) -> holefit_autonomous::Result<SubmissionReceipt> {
        let path = self.dir.join(format!("{}.pose.json", puzzle.0));
        io::write_pose(&path, pose).map_err(OrchestratorError::Problem)?;
        Ok(SubmissionReceipt {
            id: Some(path.display().to_string()),
            dislikes: None,
        })
    }
}

async fn autonomous(
    problems: &Path,
    config: SolverConfig,
    token: Option<String>,
    dry_run: Option<PathBuf>,
) -> Result<()> {
    let puzzles = load_puzzle_set(problems)
        .with_context(|| format!("loading problems from {}", problems.display()))?;
    if puzzles.is_empty() {
        bail!("no problems found in {}", problems.display());
    }

    let summary = match (dry_run, config.submission.endpoint.clone()) {
        (Some(dir), _) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            run(Orchestrator::new(config, puzzles, DirectorySubmitter { dir })).await?
        }
        (None, Some(endpoint)) => {
            let Some(token) = token else {
                bail!("submitting to {} needs --token or HOLEFIT_TOKEN", endpoint);
            };
            run(Orchestrator::new(config, puzzles, HttpSubmitter::new(endpoint, token))).await?
        }
        (None, None) => bail!("no submission endpoint configured; use --endpoint or --dry-run"),
    };

    println!(
        "{} {} rounds │ {} solved │ {} failed │ {} submitted │ {} rejected",
        "■".bright_cyan().bold(),
        summary.rounds,
        summary.solved,
        summary.failed,
        summary.submitted,
        summary.rejected
    );
    Ok(())
}

async fn run<S: Submitter>(orchestrator: Orchestrator<S>) -> Result<RunSummary> {
    let mut orchestrator = orchestrator.resume()?;
    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(event = "interrupt");
            cancel.store(true, Ordering::SeqCst);
        }
    });
    Ok(orchestrator.run().await?)
}

fn bonus_table(problems: &Path) -> Result<()> {
    let puzzles = load_puzzle_set(problems)
        .with_context(|| format!("loading problems from {}", problems.display()))?;
    let graph = holefit_autonomous::BonusGraph::from_problems(
        puzzles.problems.values().map(|p| p.as_ref()),
    );

    let mark = |unlocked: bool| if unlocked { "*" } else { "" };
    for row in graph.bonus_table() {
        let gives: Vec<String> = row
            .gives
            .iter()
            .map(|(kind, target, unlocked)| format!("{}→{}{}", kind, target, mark(*unlocked)))
            .collect();
        let receives: Vec<String> = row
            .receives
            .iter()
            .map(|(kind, donor, unlocked)| format!("{}←{}{}", kind, donor, mark(*unlocked)))
            .collect();
        println!(
            "{:>6} │ gives {:<40} │ receives {}",
            row.puzzle.bright_white().bold(),
            gives.join(", "),
            receives.join(", ")
        );
    }
    for cycle in graph.cycles() {
        let members: Vec<String> = cycle.iter().map(ProblemId::to_string).collect();
        println!("{} cycle: {}", "⚠".bright_yellow(), members.join(" → "));
    }
    Ok(())
}
