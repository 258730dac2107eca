//! Interactive console over a [`SessionController`]
//!
//! Reads one command per line from stdin. Only commands the current
//! affordances allow are dispatched; create, go-live and stop run as
//! background tasks so the console keeps rendering notices and comments
//! while they are in flight.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use livecast_core::comments::CommentPoller;
use livecast_core::models::Comment;
use livecast_core::{Action, Phase, SessionController, SessionNotice, SessionSnapshot};

const HELP: &str = "\
Commands:
  start     create a broadcast and show its ingest credentials
  golive    start the created broadcast
  stop      end the live broadcast and archive it
  comments  show or hide viewer comments (while live)
  logout    end the session and exit
  status    show the current session
  help      show this help
  quit      stop any live broadcast and exit";

/// Comments replayed when the overlay is switched on
const REPLAY_COMMENTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    GoLive,
    Stop,
    Comments,
    Logout,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Affordance gating this command; `None` for commands always available
    #[must_use]
    pub const fn action(self) -> Option<Action> {
        match self {
            Self::Start => Some(Action::Create),
            Self::GoLive => Some(Action::GoLive),
            Self::Stop => Some(Action::Stop),
            Self::Comments => Some(Action::ToggleComments),
            Self::Logout => Some(Action::Logout),
            Self::Status | Self::Help | Self::Quit => None,
        }
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "create" => Ok(Self::Start),
            "golive" | "go-live" | "live" => Ok(Self::GoLive),
            "stop" | "end" => Ok(Self::Stop),
            "comments" | "c" => Ok(Self::Comments),
            "logout" => Ok(Self::Logout),
            "status" | "s" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("Unknown command: {other} (try 'help')")),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::GoLive => "golive",
            Self::Stop => "stop",
            Self::Comments => "comments",
            Self::Logout => "logout",
            Self::Status => "status",
            Self::Help => "help",
            Self::Quit => "quit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct Console {
    controller: Arc<SessionController>,
    poller: Arc<CommentPoller>,
}

impl Console {
    pub const fn new(controller: Arc<SessionController>, poller: Arc<CommentPoller>) -> Self {
        Self { controller, poller }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut notices = self.controller.subscribe();
        let mut comments = self.poller.subscribe();

        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(interrupted);

        println!("{HELP}");
        println!("{}", render_status(&self.controller.snapshot()));

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("stdin closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if self.handle_line(&line).await == Flow::Exit {
                        break;
                    }
                }
                notice = notices.recv() => match notice {
                    Ok(notice) => {
                        if let Some(text) = render_notice(&notice) {
                            println!("{text}");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Session notices dropped"),
                    Err(RecvError::Closed) => break,
                },
                comment = comments.recv() => match comment {
                    Ok(comment) => {
                        if self.controller.snapshot().comments_visible {
                            println!("{}", render_comment(&comment));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Comments dropped from display");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut interrupted => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Flow {
        match line.parse::<Command>() {
            Ok(command) => self.dispatch(command).await,
            Err(e) => {
                println!("{e}");
                Flow::Continue
            }
        }
    }

    async fn dispatch(&self, command: Command) -> Flow {
        let snapshot = self.controller.snapshot();
        if let Some(action) = command.action() {
            if !snapshot.affordances.allows(action) {
                println!("'{command}' is not available while {}", describe(&snapshot));
                return Flow::Continue;
            }
        }

        match command {
            Command::Help => println!("{HELP}"),
            Command::Status => println!("{}", render_status(&snapshot)),
            Command::Quit => return Flow::Exit,
            Command::Comments => self.toggle_comments(),
            Command::Logout => {
                return match self.controller.logout().await {
                    Ok(_) => {
                        println!("Logged out.");
                        Flow::Exit
                    }
                    Err(e) => {
                        println!("logout failed: {e}");
                        Flow::Continue
                    }
                };
            }
            Command::Start | Command::GoLive | Command::Stop => self.spawn_transition(command),
        }

        Flow::Continue
    }

    fn spawn_transition(&self, command: Command) {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            let result = match command {
                Command::Start => controller.create().await,
                Command::GoLive => controller.go_live().await,
                Command::Stop => controller.stop().await,
                _ => return,
            };
            match result {
                Ok(_) => println!("{}", render_status(&controller.snapshot())),
                Err(e) => println!("{command} failed: {e}"),
            }
        });
    }

    fn toggle_comments(&self) {
        match self.controller.toggle_comments() {
            Ok(true) => {
                println!("Comments shown.");
                let buffered = self.poller.buffer().snapshot();
                let skip = buffered.len().saturating_sub(REPLAY_COMMENTS);
                for comment in buffered.iter().skip(skip) {
                    println!("{}", render_comment(comment));
                }
            }
            Ok(false) => println!("Comments hidden."),
            Err(e) => println!("comments: {e}"),
        }
    }
}

/// Resolve once no session operation is in flight
pub async fn wait_idle(controller: &SessionController) {
    while controller.is_loading() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn describe(snapshot: &SessionSnapshot) -> String {
    if snapshot.is_loading {
        format!("{} (busy)", snapshot.phase)
    } else {
        snapshot.phase.to_string()
    }
}

fn render_status(snapshot: &SessionSnapshot) -> String {
    let mut out = format!("[{}]", describe(snapshot));

    if let Some(ref id) = snapshot.broadcast_id {
        out.push_str(&format!(" broadcast {id}"));
    }
    if snapshot.phase == Phase::Live {
        let state = if snapshot.comments_visible { "shown" } else { "hidden" };
        out.push_str(&format!(", comments {state}"));
    }

    if snapshot.affordances.show_credentials {
        if let Some(ref creds) = snapshot.credentials {
            out.push_str(&format!("\n  Stream URL: {}\n  Stream Key: {}", creds.url, creds.key));
        }
    }

    let available: Vec<String> = snapshot
        .affordances
        .available()
        .into_iter()
        .filter_map(|action| command_for(action).map(|c| c.to_string()))
        .collect();
    if !available.is_empty() {
        out.push_str(&format!("\n  Available: {}", available.join(", ")));
    }

    out
}

const fn command_for(action: Action) -> Option<Command> {
    match action {
        Action::Create => Some(Command::Start),
        Action::GoLive => Some(Command::GoLive),
        Action::Stop => Some(Command::Stop),
        Action::ToggleComments => Some(Command::Comments),
        Action::Logout => Some(Command::Logout),
    }
}

fn render_notice(notice: &SessionNotice) -> Option<String> {
    match notice {
        SessionNotice::PhaseChanged { to, .. } if *to == Phase::Live => {
            Some("You are live.".to_string())
        }
        SessionNotice::PhaseChanged { .. } => None,
        SessionNotice::TeardownFailed {
            step,
            broadcast_id,
            error,
        } => Some(format!(
            "warning: {step:?} failed for broadcast {broadcast_id}: {error}"
        )),
        SessionNotice::LogoutFailed { reason } => {
            Some(format!("warning: logout incomplete: {reason}"))
        }
    }
}

fn render_comment(comment: &Comment) -> String {
    let time = comment
        .created_at_utc()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    format!("  {time} @{}: {}", comment.username, comment.text)
}
