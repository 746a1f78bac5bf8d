use anyhow::{Context, Result};
use arcade_artifact::Artifact;
use arcade_core::{
    ArcadeConfig, ArtifactId, JsonFileRepository, Orchestrator, Repository, ScriptedAgent,
    WorkflowState,
};
use arcade_sandbox::{InputFuzzer, Validator};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file")
}

fn store_arg(required: bool) -> Arg {
    Arg::new("store")
        .long("store")
        .required(required)
        .value_parser(value_parser!(PathBuf))
        .help("JSON artifact store")
}

fn cli() -> Command {
    Command::new("arcade")
        .version(arcade_core::VERSION)
        .about("Generate, validate and repair small interactive programs")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("validate")
                .about("Run one artifact through the headless validator")
                .arg(
                    Arg::new("artifact")
                        .long("artifact")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Artifact JSON file (fenced model output is accepted)"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Fuzzer seed for a reproducible run"),
                )
                .arg(
                    Arg::new("frames")
                        .long("frames")
                        .value_parser(value_parser!(u32))
                        .help("Frames to simulate"),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Run the full workflow against recorded model responses")
                .arg(
                    Arg::new("topic")
                        .long("topic")
                        .required(true)
                        .help("Topic handed to the generator"),
                )
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of recorded responses"),
                )
                .arg(config_arg())
                .arg(store_arg(false)),
        )
        .subcommand(
            Command::new("leaderboard")
                .about("List stored artifacts by likes")
                .arg(store_arg(true)),
        )
        .subcommand(
            Command::new("like")
                .about("Like a stored artifact")
                .arg(store_arg(true))
                .arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .help("Artifact id"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("validate", args)) => validate(args).await,
        Some(("replay", args)) => replay(args).await,
        Some(("leaderboard", args)) => leaderboard(args).await,
        Some(("like", args)) => like(args).await,
        _ => Ok(ExitCode::FAILURE),
    }
}

async fn load_config(args: &ArgMatches) -> Result<ArcadeConfig> {
    let path = args.get_one::<PathBuf>("config");
    ArcadeConfig::load_or_default(path.map(PathBuf::as_path))
        .await
        .context("loading configuration")
}

fn store(args: &ArgMatches) -> Result<JsonFileRepository> {
    let path = args.get_one::<PathBuf>("store").context("--store is required")?;
    Ok(JsonFileRepository::new(path))
}

async fn validate(args: &ArgMatches) -> Result<ExitCode> {
    let path = args.get_one::<PathBuf>("artifact").context("--artifact is required")?;
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let artifact = Artifact::from_model_response(&text).context("parsing artifact")?;

    let mut config = load_config(args).await?.sandbox;
    if let Some(seed) = args.get_one::<u64>("seed") {
        config = config.with_seed(*seed);
    }
    if let Some(frames) = args.get_one::<u32>("frames") {
        config = config.with_frames(*frames);
    }

    let validator = Validator::new(config).context("invalid watched path")?;
    let mut fuzzer = InputFuzzer::from_sandbox_config(validator.config());
    let seed = fuzzer.seed();
    let report = tokio::task::spawn_blocking(move || validator.run(&artifact, &mut fuzzer))
        .await
        .context("validator aborted")?;

    let output = serde_json::json!({
        "passed": report.verdict.passed,
        "error": report.verdict.error,
        "frames_run": report.frames_run,
        "detector_checks": report.detector_checks,
        "seed": seed,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if report.verdict.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn replay(args: &ArgMatches) -> Result<ExitCode> {
    let topic = args.get_one::<String>("topic").context("--topic is required")?;
    let script = args.get_one::<PathBuf>("script").context("--script is required")?;
    let config = load_config(args).await?;

    let agent = Arc::new(ScriptedAgent::from_file(script).await?);
    let validator = Validator::new(config.sandbox).context("invalid watched path")?;
    let mut orchestrator = Orchestrator::new(
        agent.clone(),
        agent,
        Arc::new(validator),
        config.workflow,
    );

    let outcome = orchestrator.run(topic).await;
    for entry in orchestrator.log().entries() {
        println!(
            "[{}] {:<8} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.agent,
            entry.message
        );
    }
    println!("State: {}", orchestrator.state());

    match outcome {
        Ok(artifact) => {
            if args.contains_id("store") {
                let saved = store(args)?.save(artifact).await?;
                println!("Saved as {} ({} likes)", saved.id, saved.likes);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("Error: {err}");
            Ok(if orchestrator.state() == WorkflowState::Failed {
                ExitCode::FAILURE
            } else {
                ExitCode::from(2)
            })
        }
    }
}

async fn leaderboard(args: &ArgMatches) -> Result<ExitCode> {
    let entries = store(args)?.get_all().await?;
    if entries.is_empty() {
        println!("No artifacts stored");
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}. {:<32} {:>4} likes  {}",
            rank + 1,
            entry.artifact.title(),
            entry.likes,
            entry.id
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn like(args: &ArgMatches) -> Result<ExitCode> {
    let id: ArtifactId = args
        .get_one::<String>("id")
        .context("--id is required")?
        .parse()
        .context("invalid artifact id")?;
    store(args)?.like(id).await?;
    println!("Liked {id}");
    Ok(ExitCode::SUCCESS)
}
