use anyhow::Result;
use clap::Parser;
use ironlog::{
    OutputFmt, Repository,
    cli::{Cli, Commands},
    clock::{Clock, SystemClock},
    commands,
    config::{Backend, Config, Overrides, Settings},
    db::SqliteStore,
    storage::{CollectionStore, FileStore},
    utils,
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);
    let fmt = OutputFmt::from_flag(cli.json);

    let config_path = Config::default_path()?;
    if let Commands::Config(cmd) = cli.cmd {
        return commands::config::handle(cmd, &config_path).await;
    }

    let cfg = Config::load(&config_path)?;
    let overrides = Overrides {
        data_dir: cli.data_dir,
        backend: cli.backend,
    };
    let settings = Settings::resolve(&cfg, &overrides)?;
    debug!(?settings, "settings resolved");

    match settings.backend {
        Backend::File => {
            let repo = Repository::new(FileStore::new(&settings.data_dir), SystemClock);
            run(cli.cmd, &repo, &settings, fmt).await
        }
        Backend::Sqlite => {
            let store = SqliteStore::open(settings.data_dir.join("ironlog.db")).await?;
            let repo = Repository::new(store, SystemClock);
            run(cli.cmd, &repo, &settings, fmt).await
        }
    }
}

async fn run<S: CollectionStore, C: Clock>(
    cmd: Commands,
    repo: &Repository<S, C>,
    settings: &Settings,
    fmt: OutputFmt,
) -> Result<()> {
    match cmd {
        Commands::Exercise(cmd) => commands::exercise::handle(cmd, repo, settings, fmt).await?,
        Commands::Workout(cmd) => commands::workout::handle(cmd, repo, fmt).await?,
        Commands::Session(cmd) => commands::session::handle(cmd, repo, fmt).await?,
        Commands::Stats { resolve_body_parts } => {
            let resolve = resolve_body_parts || settings.resolve_body_parts;
            commands::stats::handle(repo, resolve, fmt).await?
        }
        Commands::Config(_) => unreachable!("config is handled before the store opens"),
    }

    Ok(())
}
