//! Line-oriented session against a single engine
//!
//! One command per line, one JSON object printed per command. A failing
//! command prints `{"error": ...}` and the session carries on.

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use switchboard_core::{DispatchError, RoutingEngine};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// `create [id] <priority> <type>`; a fresh id is generated when omitted
    Create {
        id: Option<String>,
        priority: String,
        ticket_type: String,
    },
    Close {
        id: String,
    },
    Status,
    Agents,
    Ticket {
        id: String,
    },
    Classify {
        priority: String,
        ticket_type: String,
    },
    Drain,
    Reset,
}

impl FromStr for SessionCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((verb, args)) = parts.split_first() else {
            bail!("empty command");
        };

        let cmd = match (verb.to_ascii_lowercase().as_str(), args) {
            ("create", [id, priority, ticket_type]) => Self::Create {
                id: Some(id.to_string()),
                priority: priority.to_string(),
                ticket_type: ticket_type.to_string(),
            },
            ("create", [priority, ticket_type]) => Self::Create {
                id: None,
                priority: priority.to_string(),
                ticket_type: ticket_type.to_string(),
            },
            ("close", [id]) => Self::Close { id: id.to_string() },
            ("status", []) => Self::Status,
            ("agents", []) => Self::Agents,
            ("ticket", [id]) => Self::Ticket { id: id.to_string() },
            ("classify", [priority, ticket_type]) => Self::Classify {
                priority: priority.to_string(),
                ticket_type: ticket_type.to_string(),
            },
            ("drain", []) => Self::Drain,
            ("reset", []) => Self::Reset,
            ("create" | "close" | "ticket" | "classify" | "status" | "agents" | "drain"
            | "reset", _) => {
                bail!("wrong number of arguments for '{}'", verb)
            }
            _ => bail!("unknown command '{}'", verb),
        };
        Ok(cmd)
    }
}

/// Parse one input line; `None` for blank lines and `#` comments
pub fn parse_line(line: &str) -> Option<Result<SessionCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.parse())
}

pub fn execute(engine: &RoutingEngine, cmd: SessionCommand) -> Result<Value> {
    let value = match cmd {
        SessionCommand::Create {
            id,
            priority,
            ticket_type,
        } => {
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            serde_json::to_value(engine.create_ticket(&id, &priority, &ticket_type)?)?
        }
        SessionCommand::Close { id } => serde_json::to_value(engine.close_ticket(&id)?)?,
        SessionCommand::Status => serde_json::to_value(engine.status())?,
        SessionCommand::Agents => json!({
            "agents": engine.status().agents,
            "available": engine.available_agents(),
        }),
        SessionCommand::Ticket { id } => serde_json::to_value(engine.ticket(&id)?)?,
        SessionCommand::Classify {
            priority,
            ticket_type,
        } => serde_json::to_value(engine.classify_only(&priority, &ticket_type)?)?,
        SessionCommand::Drain => json!({ "newly_assigned": engine.drain_queues() }),
        SessionCommand::Reset => {
            engine.reset();
            json!({ "reset": true })
        }
    };
    Ok(value)
}

fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<DispatchError>() {
        Some(DispatchError::Validation(_)) => "validation",
        Some(DispatchError::NotFound(_)) => "not_found",
        Some(DispatchError::ModelUnavailable) => "model_unavailable",
        Some(DispatchError::Model(_)) => "model",
        Some(DispatchError::Policy(_)) => "policy",
        None => "command",
    }
}

/// Counts reported when a session ends
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub commands: usize,
    pub errors: usize,
}

/// Read commands until EOF, writing one JSON line per command
pub async fn run<R, W>(engine: &RoutingEngine, reader: R, mut writer: W) -> Result<SessionSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut summary = SessionSummary::default();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let Some(parsed) = parse_line(&line) else {
            continue;
        };
        summary.commands += 1;

        let output = match parsed.and_then(|cmd| execute(engine, cmd)) {
            Ok(value) => value,
            Err(e) => {
                summary.errors += 1;
                debug!("Line {}: {}", line_no, e);
                json!({ "error": e.to_string(), "kind": error_kind(&e), "line": line_no })
            }
        };

        let mut rendered = serde_json::to_string(&output)?;
        rendered.push('\n');
        writer
            .write_all(rendered.as_bytes())
            .await
            .map_err(|e| anyhow!("Failed to write session output: {}", e))?;
    }

    writer.flush().await?;
    Ok(summary)
}
