mod commands;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scribe", version, about = "Generate media and publish notes")]
struct Args {
    /// Config file (defaults to ./scribe.yaml, then ~/.scribe/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish an article through the web editor
    Publish(PublishArgs),
    /// Submit a generation job and wait for its result
    #[command(subcommand)]
    Generate(GenerateCommand),
    /// Query a generation task once
    Status {
        #[arg(long)]
        task_id: String,
        #[arg(long, value_enum, default_value_t = Api::Jobs)]
        api: Api,
    },
    /// Log in with a visible browser and store the session
    Login {
        /// Actually open the browser (otherwise only report the stored session)
        #[arg(long)]
        post: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct PublishArgs {
    #[arg(long)]
    title: String,
    #[arg(long, conflicts_with = "body_file", required_unless_present = "body_file")]
    body: Option<String>,
    #[arg(long)]
    body_file: Option<PathBuf>,
    #[arg(long)]
    header_image: Option<PathBuf>,
    #[arg(long)]
    body_image: Option<PathBuf>,
    /// Launch the browser in visible mode (not headless)
    #[arg(long)]
    visible: bool,
    /// Actually publish (otherwise validate and print a summary)
    #[arg(long)]
    post: bool,
}

#[derive(Subcommand, Debug)]
enum GenerateCommand {
    Image {
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        aspect: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        post: bool,
    },
    Video {
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, value_enum, default_value_t = Api::Jobs)]
        api: Api,
        #[arg(long)]
        post: bool,
    },
    /// Extend an existing Veo video task
    Extend {
        #[arg(long)]
        origin_task: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        post: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Api {
    Jobs,
    Veo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = commands::load_config(args.config.as_deref()).await?;

    match args.command {
        Command::Publish(publish) => commands::publish(config, publish).await,
        Command::Generate(generate) => commands::generate(&config, generate).await,
        Command::Status { task_id, api } => commands::status(&config, &task_id, api).await,
        Command::Login { post } => commands::login(config, post).await,
    }
}
