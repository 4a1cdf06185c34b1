//! Slash commands understood by the interactive prompt.
//!
//! Anything that does not start with `/` is a user line for the kernel.

use noema_core::Focus;

const DEFAULT_GOAL_PRIORITY: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain input for the next tick.
    Say(String),
    Sleep,
    Wake,
    Goal { description: String, priority: f64 },
    Done(String),
    /// `None` clears the current focus.
    Focus(Option<Focus>),
    Act(String),
    State,
    Usage,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  /sleep                      stop replying until /wake
  /wake                       resume replying
  /goal [0.0-1.0] <text>      add an active goal
  /done <goal-id>             complete a goal
  /focus <domain> <id> <label> set the current focus (no args clears it)
  /act <ACTION>               request an autonomy action (e.g. REFLECT)
  /state                      print the kernel state as JSON
  /usage                      print token usage totals
  /quit                       exit";

/// Parse one trimmed, non-empty prompt line.
pub fn parse(line: &str) -> Result<Command, String> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "sleep" => Ok(Command::Sleep),
        "wake" => Ok(Command::Wake),
        "goal" => parse_goal(args),
        "done" if !args.is_empty() => Ok(Command::Done(args.to_string())),
        "done" => Err("usage: /done <goal-id>".into()),
        "focus" => parse_focus(args),
        "act" if !args.is_empty() => Ok(Command::Act(args.to_string())),
        "act" => Err("usage: /act <ACTION>".into()),
        "state" => Ok(Command::State),
        "usage" => Ok(Command::Usage),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: /{} (try /help)", other)),
    }
}

fn parse_goal(args: &str) -> Result<Command, String> {
    let (priority, description) = match args.split_once(char::is_whitespace) {
        Some((first, tail)) => match first.parse::<f64>() {
            Ok(p) if p.is_finite() => (p.clamp(0.0, 1.0), tail.trim()),
            _ => (DEFAULT_GOAL_PRIORITY, args),
        },
        None => (DEFAULT_GOAL_PRIORITY, args),
    };
    if description.is_empty() {
        return Err("usage: /goal [priority] <description>".into());
    }
    Ok(Command::Goal { description: description.to_string(), priority })
}

fn parse_focus(args: &str) -> Result<Command, String> {
    if args.is_empty() {
        return Ok(Command::Focus(None));
    }
    let mut parts = args.splitn(3, char::is_whitespace);
    let (domain, id, label) = (parts.next(), parts.next(), parts.next());
    Focus::from_parts(domain, id, label)
        .map(|f| Command::Focus(Some(f)))
        .ok_or_else(|| "usage: /focus <domain> <id> <label>".to_string())
}
