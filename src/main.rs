use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use concert_notes::catalog::{ConcertCatalog, ConcertDetail};
use concert_notes::concert_store::{
    BlockingStore, Concert, ConcertDate, ConcertId, ConcertQuery, ConcertStore, DateOrder,
    DescriptionId, SqliteConcertStore, TrackId,
};
use concert_notes::config::{AppConfig, CliConfig, FileConfig};
use concert_notes::generation::{BatchDescriptionPipeline, DescriptionGenerator, LogProgress};
use concert_notes::ingestion::{
    parse_track_lines, ConcertDraft, ConcertIngestionWorkflow, IngestOptions, IngestionReport,
    RegenerateTarget, TrackDraft,
};
use concert_notes::llm::LlmProvider;
use concert_notes::templates::{parse_template_file, TemplateRegistry};
use concert_notes::user::{hash_password, Authenticator, ConfiguredAuthenticator, Credentials, Session};
use concert_notes::Error;

mod cli_style;
use cli_style::get_styles;

const PASSWORD_ENV_VAR: &str = "CONCERT_NOTES_PASSWORD";
const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version, about = "Concert listings with generated track descriptions")]
struct CliArgs {
    /// Path to the SQLite database file.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Values in it override command line arguments.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the OpenAI-compatible API.
    #[clap(long, global = true)]
    pub llm_base_url: Option<String>,

    #[clap(long, global = true)]
    pub llm_model: Option<String>,

    /// System-wide limit on outstanding generation calls.
    #[clap(long, global = true)]
    pub max_concurrency: Option<usize>,

    /// Per-call generation timeout.
    #[clap(long, global = true)]
    pub generation_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            llm_base_url: self.llm_base_url.clone(),
            llm_model: self.llm_model.clone(),
            api_key: std::env::var(API_KEY_ENV_VAR).ok().filter(|k| !k.is_empty()),
            max_concurrency: self.max_concurrency,
            generation_timeout_secs: self.generation_timeout_secs,
        }
    }
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Email of a configured admin user.
    #[clap(long)]
    email: String,

    /// Read from CONCERT_NOTES_PASSWORD when omitted.
    #[clap(long)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct GenerationArgs {
    /// Template to generate with; repeat for several. Defaults to every
    /// registered template.
    #[clap(long = "template")]
    templates: Vec<String>,

    /// Run one template at a time instead of concurrently.
    #[clap(long)]
    sequential: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Registers a concert with its tracks and generates their descriptions.
    Ingest {
        #[command(flatten)]
        login: LoginArgs,

        #[clap(long)]
        title: String,

        #[clap(long)]
        venue: String,

        /// YYYY-MM-DD, or YYYY-MM-DD..YYYY-MM-DD for a multi-day concert.
        #[clap(long)]
        date: String,

        #[clap(long, default_value = "")]
        description: String,

        /// File with one "Title - Composer" per line.
        #[clap(long, value_parser = parse_path)]
        tracks: Option<PathBuf>,

        /// A single "Title - Composer" entry; may be repeated.
        #[clap(long = "track")]
        track_lines: Vec<String>,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Generates descriptions again for a concert or a single track.
    Regenerate {
        #[command(flatten)]
        login: LoginArgs,

        #[clap(long, conflicts_with = "track", required_unless_present = "track")]
        concert: Option<String>,

        #[clap(long)]
        track: Option<String>,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Concert listing, search and deletion.
    Concerts {
        #[command(subcommand)]
        command: ConcertsCommand,
    },

    Tracks {
        #[command(subcommand)]
        command: TracksCommand,
    },

    Descriptions {
        #[command(subcommand)]
        command: DescriptionsCommand,
    },

    /// Prompt template management.
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },

    /// Prints an argon2 hash to paste into the [[users]] config section.
    HashPassword { password: String },

    /// Checks that the configured LLM endpoint answers with the current key.
    CheckLlm,
}

#[derive(Subcommand, Debug)]
enum ConcertsCommand {
    /// Upcoming concerts first, or most recent first with --recent.
    List {
        #[clap(long)]
        recent: bool,

        #[clap(long)]
        limit: Option<usize>,
    },

    Search {
        /// Matches title, venue, description or a track's composer.
        text: Option<String>,

        #[clap(long)]
        title: Option<String>,

        #[clap(long)]
        venue: Option<String>,

        #[clap(long)]
        composer: Option<String>,

        #[clap(long)]
        from: Option<NaiveDate>,

        #[clap(long)]
        to: Option<NaiveDate>,

        #[clap(long)]
        recent: bool,
    },

    /// Shows a concert with every track and description.
    Show { id: String },

    /// Deletes a concert with its tracks and descriptions.
    Delete {
        #[command(flatten)]
        login: LoginArgs,
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum TracksCommand {
    /// Deletes a track with its descriptions.
    Delete {
        #[command(flatten)]
        login: LoginArgs,
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum DescriptionsCommand {
    Delete {
        #[command(flatten)]
        login: LoginArgs,
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    List,

    Show { name: String },

    /// Restores the built-in template set.
    Reset {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Replaces every template with the [[templates]] tables of a TOML file.
    Import {
        #[command(flatten)]
        login: LoginArgs,

        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },
}

/// Everything a command may need, built once and shared.
struct App {
    config: AppConfig,
    provider: Arc<dyn LlmProvider>,
    generator: Arc<DescriptionGenerator>,
    registry: Arc<TemplateRegistry>,
    catalog: ConcertCatalog,
    workflow: ConcertIngestionWorkflow,
    authenticator: ConfiguredAuthenticator,
}

impl App {
    async fn build(config: AppConfig) -> Result<Self> {
        info!("Opening SQLite database at {:?}...", config.db_path);
        let sqlite_store: Arc<dyn ConcertStore> = Arc::new(SqliteConcertStore::new(&config.db_path)?);
        let store = BlockingStore::new(sqlite_store, config.store_timeout);

        let registry = Arc::new(TemplateRegistry::load(store.clone()).await?);

        info!(
            "Using model {} at {} (max {} concurrent generations)",
            config.llm.model, config.llm.base_url, config.generation.max_concurrency
        );
        let provider = config.llm.create_provider();
        let generator = Arc::new(DescriptionGenerator::new(
            provider.clone(),
            config.llm.generator_settings(),
        ));
        let pipeline = Arc::new(BatchDescriptionPipeline::new(
            registry.clone(),
            generator.clone(),
            config.generation.max_concurrency,
        ));
        let workflow =
            ConcertIngestionWorkflow::new(store.clone(), pipeline).with_progress(Arc::new(LogProgress));
        let catalog = ConcertCatalog::new(store);

        if config.users.is_empty() {
            warn!("No users configured; administrative commands will be refused");
        }
        let authenticator =
            ConfiguredAuthenticator::new(config.users.clone(), config.admin_email.clone());

        Ok(Self {
            config,
            provider,
            generator,
            registry,
            catalog,
            workflow,
            authenticator,
        })
    }

    fn admin_session(&self, login: &LoginArgs) -> Result<Session> {
        let password = match &login.password {
            Some(password) => password.clone(),
            None => std::env::var(PASSWORD_ENV_VAR)
                .with_context(|| format!("--password or {} is required", PASSWORD_ENV_VAR))?,
        };
        let session = self.authenticator.authenticate(&Credentials {
            email: login.email.clone(),
            password,
        })?;
        session.require_admin()?;
        Ok(session)
    }

    /// Warns before a run whose descriptions would all fall back.
    async fn preflight_llm(&self) {
        if let Err(e) = self.provider.health_check().await {
            warn!(
                provider = self.provider.name(),
                model = self.provider.model(),
                "LLM endpoint is not healthy, descriptions may fall back to placeholders: {}",
                e
            );
        }
    }

    fn ingest_options(&self, generation: &GenerationArgs) -> IngestOptions {
        IngestOptions {
            parallel: self.config.generation.parallel && !generation.sequential,
            max_concurrency: self.config.generation.max_concurrency,
        }
    }

    fn selected_templates(&self, generation: &GenerationArgs) -> Vec<String> {
        if generation.templates.is_empty() {
            self.registry.list_names()
        } else {
            generation.templates.clone()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    if let Command::HashPassword { password } = &cli_args.command {
        println!("{}", hash_password(password)?);
        return Ok(());
    }

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let app = App::build(config).await?;

    run_command(&app, cli_args.command).await
}

async fn run_command(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Ingest {
            login,
            title,
            venue,
            date,
            description,
            tracks,
            track_lines,
            generation,
        } => {
            let session = app.admin_session(&login)?;
            let draft = ConcertDraft {
                title,
                venue,
                date: ConcertDate::parse(&date)?,
                description,
            };
            let track_drafts = read_track_drafts(tracks, &track_lines)?;
            let templates = app.selected_templates(&generation);
            let options = app.ingest_options(&generation);
            app.preflight_llm().await;

            let result = app
                .workflow
                .ingest(&session, draft, track_drafts, &templates, &options)
                .await;
            if let Err(Error::DescriptionsPending { concert_id, .. }) = &result {
                error!(
                    "Run `concert-notes regenerate --concert {}` once the store is reachable",
                    concert_id
                );
            }
            print_report(&result?, app.generator.tokens_used());
            Ok(())
        }

        Command::Regenerate {
            login,
            concert,
            track,
            generation,
        } => {
            let session = app.admin_session(&login)?;
            let target = match (concert, track) {
                (Some(id), _) => RegenerateTarget::Concert(ConcertId::from(id)),
                (None, Some(id)) => RegenerateTarget::Track(TrackId::from(id)),
                (None, None) => bail!("either --concert or --track is required"),
            };
            let templates = app.selected_templates(&generation);
            app.preflight_llm().await;
            let report = app
                .workflow
                .regenerate_descriptions(&session, target, &templates, &app.ingest_options(&generation))
                .await?;
            print_report(&report, app.generator.tokens_used());
            Ok(())
        }

        Command::Concerts { command } => run_concerts_command(app, command).await,

        Command::Tracks {
            command: TracksCommand::Delete { login, id },
        } => {
            let session = app.admin_session(&login)?;
            let report = app.catalog.delete_track(&session, &TrackId::from(id)).await?;
            println!("Deleted 1 track and {} descriptions", report.descriptions);
            Ok(())
        }

        Command::Descriptions {
            command: DescriptionsCommand::Delete { login, id },
        } => {
            let session = app.admin_session(&login)?;
            app.catalog
                .delete_description(&session, &DescriptionId::from(id))
                .await?;
            println!("Description deleted");
            Ok(())
        }

        Command::Templates { command } => run_templates_command(app, command).await,

        Command::CheckLlm => {
            app.provider
                .health_check()
                .await
                .with_context(|| format!("LLM endpoint {} is not reachable", app.config.llm.base_url))?;
            println!(
                "{} ({}) at {} is reachable",
                app.provider.name(),
                app.provider.model(),
                app.config.llm.base_url
            );
            Ok(())
        }

        // Handled before the store is opened.
        Command::HashPassword { .. } => Ok(()),
    }
}

async fn run_concerts_command(app: &App, command: ConcertsCommand) -> Result<()> {
    match command {
        ConcertsCommand::List { recent, limit } => {
            if recent {
                for summary in app.catalog.concert_summaries(limit).await? {
                    println!(
                        "{}  ({} tracks, {} descriptions)",
                        concert_line(&summary.concert),
                        summary.track_count,
                        summary.description_count
                    );
                }
            } else {
                for concert in app.catalog.list_concerts(DateOrder::Ascending, limit).await? {
                    println!("{}", concert_line(&concert));
                }
            }
        }
        ConcertsCommand::Search {
            text,
            title,
            venue,
            composer,
            from,
            to,
            recent,
        } => {
            let query = ConcertQuery {
                text,
                title,
                venue,
                composer,
                from,
                to,
                order: if recent {
                    DateOrder::Descending
                } else {
                    DateOrder::Ascending
                },
            };
            let concerts = app.catalog.search(query).await?;
            if concerts.is_empty() {
                println!("No concerts found");
            }
            for concert in concerts {
                println!("{}", concert_line(&concert));
            }
        }
        ConcertsCommand::Show { id } => {
            let detail = app.catalog.concert_detail(&ConcertId::from(id)).await?;
            print_detail(&detail);
        }
        ConcertsCommand::Delete { login, id } => {
            let session = app.admin_session(&login)?;
            let report = app.catalog.delete_concert(&session, &ConcertId::from(id)).await?;
            println!(
                "Deleted concert, {} tracks and {} descriptions",
                report.tracks, report.descriptions
            );
        }
    }
    Ok(())
}

async fn run_templates_command(app: &App, command: TemplatesCommand) -> Result<()> {
    match command {
        TemplatesCommand::List => {
            for name in app.registry.list_names() {
                println!("{}", name);
            }
        }
        TemplatesCommand::Show { name } => {
            let template = app.registry.resolve(&name)?;
            println!("# {}\n", template.name);
            println!("[system]\n{}\n", template.system_instruction);
            println!("{}", template.body);
        }
        TemplatesCommand::Reset { login } => {
            app.admin_session(&login)?;
            app.registry.reset_to_defaults().await?;
            println!("Templates reset to defaults");
        }
        TemplatesCommand::Import { login, file } => {
            app.admin_session(&login)?;
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read template file: {:?}", file))?;
            let templates = parse_template_file(&contents)?;
            let count = templates.len();
            app.registry.upsert_all(templates).await?;
            println!("Imported {} templates", count);
        }
    }
    Ok(())
}

fn read_track_drafts(file: Option<PathBuf>, lines: &[String]) -> Result<Vec<TrackDraft>> {
    let mut drafts = Vec::new();
    if let Some(path) = file {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read track list: {:?}", path))?;
        drafts.extend(parse_track_lines(&contents));
    }
    drafts.extend(parse_track_lines(&lines.join("\n")));
    if drafts.is_empty() {
        bail!("No tracks given; use --tracks FILE or --track \"Title - Composer\"");
    }
    Ok(drafts)
}

fn concert_line(concert: &Concert) -> String {
    format!(
        "{}  {}  {} @ {}",
        concert.id, concert.date, concert.title, concert.venue
    )
}

fn print_detail(detail: &ConcertDetail) {
    println!("{}", concert_line(&detail.concert));
    if !detail.concert.description.is_empty() {
        println!("{}", detail.concert.description);
    }
    for entry in &detail.tracks {
        println!("\n{}. {} ({})", entry.track.position + 1, entry.track.label(), entry.track.id);
        for description in &entry.descriptions {
            println!("  [{}] ({})", description.prompt_type, description.id);
            for line in description.text.lines() {
                println!("    {}", line);
            }
        }
    }
}

fn print_report(report: &IngestionReport, tokens_used: u64) {
    println!(
        "Concert {}: {} tracks, {} descriptions",
        report.concert_id, report.track_count, report.description_count
    );
    for (name, tally) in &report.per_template {
        if tally.kept > 0 {
            println!(
                "  {}: {} generated, {} failed, {} kept previous text",
                name, tally.generated, tally.failed, tally.kept
            );
        } else {
            println!("  {}: {} generated, {} failed", name, tally.generated, tally.failed);
        }
    }
    if tokens_used > 0 {
        println!("LLM tokens used: {}", tokens_used);
    }
    if !report.skipped_templates.is_empty() {
        println!("Unknown templates skipped: {}", report.skipped_templates.join(", "));
    }
    let retry = report.templates_needing_regeneration();
    if !retry.is_empty() {
        println!(
            "Generation failed for: {}. Run `regenerate` to try again.",
            retry.join(", ")
        );
    }
}
