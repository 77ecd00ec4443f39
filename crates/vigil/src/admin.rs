//! # Admin Commands
//!
//! Text commands an operator can run against a live engine. Parsing and
//! execution only; the host owns the transport and decides who may run them.
//!
//! ```text
//! status                 engine counters, detectors, top violators
//! violations <uuid>      one actor's score by category
//! reset <uuid>           zero one actor's score
//! version                build version and detector count
//! help                   this list
//! ```

use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;
use vigil_core::Engine;
use vigil_shared::ActorId;

/// How many actors `status` lists.
const TOP_VIOLATORS: usize = 5;

const HELP: &str = "\
status               engine counters, detectors, top violators
violations <uuid>    one actor's score by category
reset <uuid>         zero one actor's score
version              build version and detector count
help                 this list";

/// Command parse failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminError {
    /// Nothing was typed.
    #[error("empty command; try `help`")]
    Empty,

    /// First word names no command.
    #[error("unknown command `{0}`; try `help`")]
    UnknownCommand(String),

    /// Wrong number of arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Argument is not a UUID.
    #[error("`{0}` is not an actor id")]
    InvalidActor(String),
}

/// A parsed admin command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    /// Engine overview.
    Status,
    /// One actor's violations.
    Violations(ActorId),
    /// Zero one actor's violations.
    Reset(ActorId),
    /// Build version.
    Version,
    /// Command list.
    Help,
}

fn actor_arg(args: &[&str], usage: &'static str) -> Result<ActorId, AdminError> {
    match args {
        [id] => ActorId::from_str(id).map_err(|_| AdminError::InvalidActor((*id).to_owned())),
        _ => Err(AdminError::Usage(usage)),
    }
}

impl FromStr for AdminCommand {
    type Err = AdminError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(AdminError::Empty);
        };
        let args: Vec<&str> = words.collect();

        match name.to_ascii_lowercase().as_str() {
            "status" if args.is_empty() => Ok(Self::Status),
            "status" => Err(AdminError::Usage("status")),
            "help" => Ok(Self::Help),
            "version" if args.is_empty() => Ok(Self::Version),
            "version" => Err(AdminError::Usage("version")),
            "violations" => actor_arg(&args, "violations <uuid>").map(Self::Violations),
            "reset" => actor_arg(&args, "reset <uuid>").map(Self::Reset),
            _ => Err(AdminError::UnknownCommand(name.to_owned())),
        }
    }
}

impl AdminCommand {
    /// Runs the command and returns the reply text.
    #[must_use]
    pub fn execute(self, engine: &Engine) -> String {
        match self {
            Self::Status => status(engine),
            Self::Violations(actor) => violations(engine, actor),
            Self::Reset(actor) => {
                tracing::info!(actor = %actor, "violations reset by admin");
                if engine.reset_violations(actor) {
                    format!("violations of {actor} reset")
                } else {
                    format!("{actor} has no violations")
                }
            }
            Self::Version => format!(
                "vigil {}, {} detectors",
                env!("CARGO_PKG_VERSION"),
                engine.detector_ids().len()
            ),
            Self::Help => HELP.to_owned(),
        }
    }
}

fn status(engine: &Engine) -> String {
    let stats = engine.stats();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "events {} (malformed {}), verdicts {}, punishments {}",
        stats.events, stats.malformed, stats.verdicts, stats.punishments
    );
    let _ = writeln!(
        out,
        "actors {}, pending tasks {}, stale tasks {}, faults {}",
        stats.tracked_actors, stats.pending_tasks, stats.stale_tasks, stats.faults
    );
    let _ = writeln!(out, "detectors: {}", engine.detector_ids().join(", "));

    let top = engine.top_violators(TOP_VIOLATORS);
    if top.is_empty() {
        out.push_str("no violations");
    } else {
        out.push_str("top violators:");
        for (actor, total) in top {
            let _ = write!(out, "\n  {actor} {total}");
        }
    }
    out
}

fn violations(engine: &Engine, actor: ActorId) -> String {
    let Some(record) = engine.violations(actor).filter(|r| r.total() > 0) else {
        return format!("{actor} has no violations");
    };
    let mut out = format!(
        "{actor}: {} / {}",
        record.total(),
        engine.config().escalation.threshold
    );
    for (check, score) in record.categories() {
        let _ = write!(out, "\n  {check} {score}");
    }
    out
}
