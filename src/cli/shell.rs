use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    select,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::TrackerError,
    store::project_store::ProjectStore,
    timer::{format_hours, session::SessionTimer, state::TimerState},
};

use super::output::render_projects;

const HELP: &str = "\
Commands:
  new <name>   create a project
  load <name>  select a project, stopping the running one
  start        start the timer for the selected project
  stop         stop the timer and save the time
  list         show all projects
  status       show the selected project and its total
  help         show this message
  quit         stop the timer and exit";

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    New(String),
    Load(String),
    Start,
    Stop,
    List,
    Status,
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (command, argument) = match s.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (s, ""),
        };

        let with_name = |f: fn(String) -> ShellCommand| {
            if argument.is_empty() {
                Err(anyhow!("`{command}` needs a project name"))
            } else {
                Ok(f(argument.to_owned()))
            }
        };

        match command.to_lowercase().as_str() {
            "new" | "create" => with_name(ShellCommand::New),
            "load" | "select" => with_name(ShellCommand::Load),
            "start" => Ok(ShellCommand::Start),
            "stop" => Ok(ShellCommand::Stop),
            "list" | "ls" => Ok(ShellCommand::List),
            "status" => Ok(ShellCommand::Status),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
            other => Err(anyhow!("Unknown command `{other}`. Type `help` for the list")),
        }
    }
}

fn describe(state: &TimerState, displayed_total: f64) -> String {
    match state {
        TimerState::Idle => "No project selected".into(),
        TimerState::Loaded { project } => {
            format!("{project} (stopped) {}", format_hours(displayed_total))
        }
        TimerState::Running(session) => {
            format!("{} (running) {}", session.project, format_hours(displayed_total))
        }
    }
}

async fn execute<S: ProjectStore>(
    timer: &mut SessionTimer<S>,
    command: ShellCommand,
) -> Result<(), TrackerError> {
    match command {
        ShellCommand::New(name) => {
            timer.create(&name).await?;
            println!("Created {}", name.trim());
        }
        ShellCommand::Load(name) => timer.load(&name).await?,
        ShellCommand::Start => timer.start().await?,
        ShellCommand::Stop => timer.stop().await?,
        ShellCommand::List => print!(
            "{}",
            render_projects(timer.projects(), timer.state().project())
        ),
        ShellCommand::Status => println!("{}", describe(timer.state(), timer.displayed_total())),
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit => (),
    }
    Ok(())
}

/// Stops a running session before leaving, so its time isn't lost.
async fn finish<S: ProjectStore>(timer: &mut SessionTimer<S>) -> Result<()> {
    if timer.state().is_running() {
        info!("Stopping running session before exit");
        timer.stop().await?;
    }
    Ok(())
}

/// Interactive shell. Reads commands line by line from `input`, while ticking the timer in
/// between. Ends on `quit`, end of input or `shutdown`.
pub async fn run_shell<S: ProjectStore>(
    timer: &mut SessionTimer<S>,
    input: impl AsyncBufRead + Unpin,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut lines = input.lines();
    println!("{HELP}");

    loop {
        select! {
            _ = shutdown.cancelled() => break,
            _ = timer.wait_for_tick() => {
                if let Err(e) = timer.tick().await {
                    timer.sink().show_error(&e);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ShellCommand>() {
                    Ok(ShellCommand::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = execute(timer, command).await {
                            timer.sink().show_error(&e);
                        }
                    }
                    Err(e) => {
                        warn!("Couldn't parse {line:?}: {e}");
                        eprintln!("{e}");
                    }
                }
            }
        }
    }

    finish(timer).await
}

/// Tracks a single project until `shutdown`. Without a name the first stored project is used.
pub async fn run_tracking<S: ProjectStore>(
    timer: &mut SessionTimer<S>,
    project: Option<String>,
    shutdown: CancellationToken,
) -> Result<()> {
    let project = match project {
        Some(v) => v,
        None => match timer.projects().first() {
            Some(v) => v.to_owned(),
            None => bail!("There are no projects yet. Create one with `hourswasted new <name>`"),
        },
    };

    timer.load(&project).await?;
    timer.start().await?;
    info!("Tracking {project}");

    loop {
        select! {
            _ = shutdown.cancelled() => break,
            _ = timer.wait_for_tick() => {
                if let Err(e) = timer.tick().await {
                    timer.sink().show_error(&e);
                }
            }
        }
    }

    finish(timer).await?;
    println!();
    Ok(())
}
