pub mod output;
pub mod shell;
pub mod shutdown;

use std::{future::Future, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::{render_projects, TerminalSink};
use shell::{run_shell, run_tracking};
use shutdown::detect_shutdown;
use tokio::io::{stdin, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;

use crate::{
    store::project_store::JsonProjectStore,
    timer::{session::SessionTimer, TimerConfig},
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::enable_logging,
        runtime::single_thread_runtime,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Hourswasted", version, long_about = None)]
#[command(about = "Tracks hours spent on projects", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Project file. By default it's projects.json inside the application directory"
    )]
    file: Option<PathBuf>,
    #[arg(long, global = true, help = "Mirror trace logs into stderr")]
    log: bool,
    #[arg(long = "log-filter", global = true, help = "Level of logs written into files")]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Create a new project")]
    New { name: String },
    #[command(about = "Show all projects with their hours")]
    List {},
    #[command(about = "Track a project until Ctrl-C. Uses the first project if none is given")]
    Track { name: Option<String> },
    #[command(about = "Interactive session for loading, starting and stopping projects")]
    Shell {},
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;
    enable_logging(&app_dir, args.log_filter, args.log)?;

    let store = match args.file {
        Some(file) => JsonProjectStore::new(file),
        None => JsonProjectStore::in_dir(&app_dir),
    };

    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_command(args.commands, store));
    // Stdin is read on a blocking thread that can't be interrupted, so don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run_command(command: Commands, store: JsonProjectStore) -> Result<()> {
    let inline = matches!(command, Commands::Track { .. });
    let mut timer = SessionTimer::new(
        store,
        Arc::new(DefaultClock),
        Box::new(TerminalSink::new(inline)),
        TimerConfig::default(),
    )
    .await;

    match command {
        Commands::New { name } => {
            timer.create(&name).await?;
            println!("Created {}", name.trim());
            Ok(())
        }
        Commands::List {} => {
            print!("{}", render_projects(timer.projects(), None));
            Ok(())
        }
        Commands::Track { name } => {
            let shutdown = CancellationToken::new();
            until_shutdown(
                shutdown.clone(),
                run_tracking(&mut timer, name, shutdown),
            )
            .await
        }
        Commands::Shell {} => {
            let shutdown = CancellationToken::new();
            until_shutdown(
                shutdown.clone(),
                run_shell(&mut timer, BufReader::new(stdin()), shutdown),
            )
            .await
        }
    }
}

/// Runs `work` next to Ctrl-C detection. Whichever finishes first ends the other.
async fn until_shutdown(
    shutdown_token: CancellationToken,
    work: impl Future<Output = Result<()>>,
) -> Result<()> {
    let (_, result) = tokio::join!(detect_shutdown(shutdown_token.clone()), async {
        let result = work.await;
        shutdown_token.cancel();
        result
    });
    result
}
