//! CLI binary for running and submitting learning platform CLI lessons.

mod render;
mod theme;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use stepcheck_client::{ApiClient, LessonSource, SubmissionSink, DEFAULT_API_URL};
use stepcheck_engine::{replay_verdict, EventEmitter, EventSink, RunConfig, RunEvent, Runner};
use stepcheck_types::{CliData, SubmissionVerdict};
use tracing_subscriber::EnvFilter;

use crate::render::RenderModel;
use crate::theme::{Theme, DEFAULT_GRAY, DEFAULT_GREEN, DEFAULT_RED};

#[derive(Parser)]
#[command(name = "stepcheck", version, about = "Run and submit CLI lessons from your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Args, Debug)]
struct Settings {
    /// Lesson API root
    #[arg(long, global = true, env = "STEPCHECK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Access token for the lesson API
    #[arg(long, global = true, env = "STEPCHECK_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Colour for passing output: ANSI index or #rrggbb
    #[arg(long, global = true, env = "STEPCHECK_COLOR_GREEN", default_value = DEFAULT_GREEN)]
    color_green: String,

    /// Colour for failing output
    #[arg(long, global = true, env = "STEPCHECK_COLOR_RED", default_value = DEFAULT_RED)]
    color_red: String,

    /// Colour for secondary output
    #[arg(long, global = true, env = "STEPCHECK_COLOR_GRAY", default_value = DEFAULT_GRAY)]
    color_gray: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a lesson's steps locally without grading
    Run {
        /// Lesson UUID to fetch from the API
        #[arg(required_unless_present = "file")]
        lesson_id: Option<String>,

        /// Read the lesson's CLI data from a local JSON file instead
        #[arg(short, long, conflicts_with = "lesson_id")]
        file: Option<PathBuf>,

        /// Base URL for HTTP steps, replacing the lesson default
        #[arg(short, long, env = "STEPCHECK_BASE_URL")]
        base_url: Option<String>,
    },

    /// Run a lesson's steps and submit the results for grading
    Submit {
        /// Lesson UUID
        lesson_id: String,

        /// Base URL for HTTP steps, replacing the lesson default
        #[arg(short, long, env = "STEPCHECK_BASE_URL")]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the report.
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = cli.settings;
    let theme = Theme::from_strings(
        &settings.color_green,
        &settings.color_red,
        &settings.color_gray,
    );

    match cli.command {
        Commands::Run {
            lesson_id,
            file,
            base_url,
        } => {
            let data = match (file, lesson_id) {
                (Some(path), _) => load_lesson_file(&path)?,
                (None, Some(id)) => fetch_cli_data(&api_client(&settings)?, &id).await?,
                (None, None) => bail!("pass a lesson id or --file"),
            };
            execute(&data, None, run_config(base_url), theme, std::io::stdout()).await?;
        }
        Commands::Submit {
            lesson_id,
            base_url,
        } => {
            let client = api_client(&settings)?;
            let data = fetch_cli_data(&client, &lesson_id).await?;
            execute(
                &data,
                Some((&client as &dyn SubmissionSink, lesson_id.as_str())),
                run_config(base_url),
                theme,
                std::io::stdout(),
            )
            .await?;
        }
    }

    Ok(())
}

fn api_client(settings: &Settings) -> anyhow::Result<ApiClient> {
    let Some(token) = settings.access_token.as_deref().filter(|t| !t.is_empty()) else {
        bail!("no access token: pass --access-token or set STEPCHECK_ACCESS_TOKEN");
    };
    Ok(ApiClient::new(token).with_api_url(&settings.api_url))
}

fn run_config(base_url: Option<String>) -> RunConfig {
    match base_url {
        Some(url) => RunConfig::default().with_base_url_override(url),
        None => RunConfig::default(),
    }
}

fn validate_lesson_id(lesson_id: &str) -> anyhow::Result<()> {
    uuid::Uuid::parse_str(lesson_id)
        .with_context(|| format!("'{}' is not a valid lesson id", lesson_id))?;
    Ok(())
}

fn load_lesson_file(path: &Path) -> anyhow::Result<CliData> {
    CliData::load(path).with_context(|| format!("failed to load lesson from {}", path.display()))
}

async fn fetch_cli_data(source: &dyn LessonSource, lesson_id: &str) -> anyhow::Result<CliData> {
    validate_lesson_id(lesson_id)?;
    tracing::debug!(lesson_id = %lesson_id, "Fetching lesson");
    let lesson = source
        .fetch_lesson(lesson_id)
        .await
        .context("failed to fetch lesson")?;
    Ok(lesson.into_cli_data()?)
}

/// Run the lesson with a renderer attached. With a submission target the
/// results are graded and the verdict replayed onto the rendered steps.
async fn execute<W: Write + Send + 'static>(
    data: &CliData,
    submission: Option<(&dyn SubmissionSink, &str)>,
    config: RunConfig,
    theme: Theme,
    out: W,
) -> anyhow::Result<RenderModel> {
    data.check_operating_system(std::env::consts::OS)?;

    let runner = Runner::new(config);
    let (emitter, events) = EventEmitter::channel();
    let renderer = tokio::spawn(render::render_events(events, theme, out));

    let verdict = match run_and_grade(&runner, data, submission, &emitter).await {
        Ok(verdict) => verdict,
        Err(e) => {
            renderer.abort();
            return Err(e);
        }
    };

    emitter.emit(RunEvent::RunDone {
        verdict,
        is_submit: submission.is_some(),
    });
    drop(emitter);

    let model = renderer.await.context("renderer task failed")??;
    Ok(model)
}

async fn run_and_grade(
    runner: &Runner,
    data: &CliData,
    submission: Option<(&dyn SubmissionSink, &str)>,
    emitter: &EventEmitter,
) -> anyhow::Result<Option<SubmissionVerdict>> {
    let results = runner.run_steps(data, emitter).await?;
    let Some((sink, lesson_id)) = submission else {
        return Ok(None);
    };

    let verdict = sink
        .submit(lesson_id, &results)
        .await
        .context("failed to submit results")?;
    replay_verdict(data, &results, verdict.as_ref(), emitter);
    Ok(verdict)
}
