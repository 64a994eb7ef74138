//! Interactive console over an `AppContext`.
//!
//! Each input line parses into a `Command`; `execute` runs it against the context and
//! returns the text to print, which keeps the command layer testable without a terminal.

pub mod outputformatter;

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use crate::companies::Company;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::export::export_csv_file;
use crate::identity::Identity;

pub const HELP: &str = "\
Commands:
  login <email> <name> <token> [ttl_minutes]   sign in (default ttl 60 minutes) and go to your landing page
  logout                                       sign out
  idle                                         forced sign-out after inactivity
  whoami                                       show the signed-in operator
  status                                       session, directory and navigation summary
  go <path>                                    navigate (guarded)
  routes                                       list routes
  refresh                                      reload the authorization directory
  tab save <name> <json>                       keep view state for a tab
  tab show <name>                              show view state for a tab
  companies load <file.json>                   replace the company list from a JSON array
  export <file.csv>                            export the company list as CSV
  help                                         show this help
  quit | exit                                  leave the console";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String, name: String, token: String, ttl_minutes: i64 },
    Logout,
    Idle,
    WhoAmI,
    Status,
    Go(String),
    Routes,
    Refresh,
    TabSave { name: String, data: Value },
    TabShow(String),
    CompaniesLoad(PathBuf),
    Export(PathBuf),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> AppResult<Command> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();
    let usage = |u: &str| AppError::user("usage".to_string(), format!("usage: {}", u));
    match head.as_str() {
        "login" => {
            if args.len() < 3 || args.len() > 4 { return Err(usage("login <email> <name> <token> [ttl_minutes]")); }
            let ttl_minutes = match args.get(3) {
                Some(v) => v.parse::<i64>().map_err(|_| usage("login <email> <name> <token> [ttl_minutes]"))?,
                None => 60,
            };
            expiry_after(ttl_minutes)?;
            Ok(Command::Login { email: args[0].into(), name: args[1].into(), token: args[2].into(), ttl_minutes })
        }
        "logout" => Ok(Command::Logout),
        "idle" => Ok(Command::Idle),
        "whoami" => Ok(Command::WhoAmI),
        "status" => Ok(Command::Status),
        "go" => match args.as_slice() {
            [p] => Ok(Command::Go(p.to_string())),
            _ => Err(usage("go <path>")),
        },
        "routes" => Ok(Command::Routes),
        "refresh" => Ok(Command::Refresh),
        "tab" => match args.first().copied() {
            Some("save") if args.len() >= 3 => {
                // JSON may contain spaces; take everything after the tab name.
                let data: Value = serde_json::from_str(rest_after(line, 3))?;
                Ok(Command::TabSave { name: args[1].into(), data })
            }
            Some("show") if args.len() == 2 => Ok(Command::TabShow(args[1].into())),
            _ => Err(usage("tab save <name> <json> | tab show <name>")),
        },
        "companies" => match args.as_slice() {
            ["load", p] => Ok(Command::CompaniesLoad(PathBuf::from(*p))),
            _ => Err(usage("companies load <file.json>")),
        },
        "export" => match args.as_slice() {
            [p] => Ok(Command::Export(PathBuf::from(*p))),
            _ => Err(usage("export <file.csv>")),
        },
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err(AppError::user("empty", "empty command")),
        other => Err(AppError::user("unknown_command".to_string(), format!("unknown command '{}'; type 'help'", other))),
    }
}

pub async fn execute(ctx: &AppContext, cmd: Command) -> AppResult<String> {
    match cmd {
        Command::Login { email, name, token, ttl_minutes } => {
            let identity = Identity::new(token, email, name, expiry_after(ttl_minutes)?);
            ctx.session.sign_in(identity).await;
            let outcome = ctx.router.push(&ctx.config.landing.login).await?;
            Ok(format!("signed in as {:?}; {}", ctx.session.access_state(), outcome_text(&outcome)))
        }
        Command::Logout => {
            ctx.session.sign_out().await;
            let outcome = ctx.router.push(&ctx.config.landing.login).await?;
            Ok(format!("signed out; {}", outcome_text(&outcome)))
        }
        Command::Idle => {
            if ctx.session.force_sign_out_due_to_inactivity(ctx.router.as_ref()).await {
                Ok(format!("signed out for inactivity; at {}", ctx.router.current().unwrap_or_default()))
            } else {
                Ok("not signed in".to_string())
            }
        }
        Command::WhoAmI => {
            ctx.session.hydrate().await;
            Ok(outputformatter::render_whoami(ctx.session.identity().as_ref(), &ctx.session.snapshot()))
        }
        Command::Status => {
            ctx.session.hydrate().await;
            let dir = ctx.session.directory();
            let rows = vec![
                vec!["state".to_string(), format!("{:?}", ctx.session.access_state())],
                vec!["signing_out".to_string(), ctx.session.is_signing_out().to_string()],
                vec!["directory".to_string(), ctx.session.directory_source()],
                vec!["admins".to_string(), dir.admin_count().to_string()],
                vec!["blacklist".to_string(), dir.blacklist_count().map(|n| n.to_string()).unwrap_or_else(|| "* (admins only)".to_string())],
                vec!["fetches".to_string(), ctx.session.directory_fetches().to_string()],
                vec!["current".to_string(), ctx.router.current().unwrap_or_else(|| "-".to_string())],
            ];
            Ok(outputformatter::render_table(&["key", "value"], &rows))
        }
        Command::Go(path) => {
            let outcome = ctx.router.push(&path).await?;
            Ok(outcome_text(&outcome))
        }
        Command::Routes => Ok(outputformatter::render_routes(ctx.router.routes().routes())),
        Command::Refresh => {
            let dir = ctx.session.refresh_directory().await;
            Ok(format!("directory: {} admins, wildcard={}", dir.admin_count(), dir.is_wildcard()))
        }
        Command::TabSave { name, data } => {
            ctx.tabs.save_tab_data(&name, data);
            Ok(format!("saved tab {}", name))
        }
        Command::TabShow(name) => Ok(serde_json::to_string_pretty(&ctx.tabs.get_tab_data(&name))?),
        Command::CompaniesLoad(path) => {
            let bytes = tokio::fs::read(&path).await?;
            let list: Vec<Company> = serde_json::from_slice(&bytes)?;
            let n = list.len();
            ctx.companies.set_companies(list);
            Ok(format!("loaded {} companies", n))
        }
        Command::Export(path) => {
            let rows: Vec<Map<String, Value>> = ctx
                .companies
                .companies()
                .into_iter()
                .map(|c| {
                    let mut m = Map::new();
                    m.insert("carrier_id".to_string(), c.carrier_id);
                    m.extend(c.fields);
                    m
                })
                .collect();
            export_csv_file(&rows, &path)?;
            Ok(format!("exported {} rows to {}", rows.len(), path.display()))
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

// Token expiry `ttl_minutes` from now; out-of-range values are a usage error.
fn expiry_after(ttl_minutes: i64) -> AppResult<DateTime<Utc>> {
    Duration::try_minutes(ttl_minutes)
        .and_then(|d| Utc::now().checked_add_signed(d))
        .ok_or_else(|| AppError::user("usage".to_string(), format!("ttl_minutes {} is out of range", ttl_minutes)))
}

// Text after the first `n` whitespace-separated tokens.
fn rest_after(line: &str, n: usize) -> &str {
    let mut s = line.trim_start();
    for _ in 0..n {
        s = s[s.find(char::is_whitespace).unwrap_or(s.len())..].trim_start();
    }
    s.trim_end()
}

fn outcome_text(outcome: &crate::router::NavigationOutcome) -> String { outputformatter::render_navigation(outcome) }

/// Line-editing loop. Blocks the calling thread; async work runs on `rt`.
pub fn run_repl(rt: &tokio::runtime::Runtime, ctx: &AppContext) -> anyhow::Result<()> {
    use rustyline::error::ReadlineError;

    let mut rl = rustyline::DefaultEditor::new()?;
    println!("opsdesk console. Type 'help' for commands.");
    rt.block_on(ctx.session.hydrate());
    loop {
        let line = match rl.readline("opsdesk> ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() { continue; }
        let _ = rl.add_history_entry(line.as_str());
        let cmd = match parse_command(&line) {
            Ok(c) => c,
            Err(e) => { eprintln!("{}", e.message()); continue; }
        };
        if cmd == Command::Quit { break; }
        match rt.block_on(execute(ctx, cmd)) {
            Ok(text) if text.is_empty() => {}
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_login_with_default_ttl() {
        let c = parse_command("login ops@corp.io Ops tok123").unwrap();
        assert_eq!(c, Command::Login { email: "ops@corp.io".into(), name: "Ops".into(), token: "tok123".into(), ttl_minutes: 60 });
        let c = parse_command("LOGIN ops@corp.io Ops tok123 5").unwrap();
        assert!(matches!(c, Command::Login { ttl_minutes: 5, .. }));
    }

    #[test]
    fn tab_save_keeps_json_with_spaces() {
        let c = parse_command("tab save runFiles {\"filter\": \"daily runs\"}").unwrap();
        assert_eq!(c, Command::TabSave { name: "runFiles".into(), data: json!({"filter": "daily runs"}) });
        let c = parse_command("tab  save   runFiles   [1, 2]").unwrap();
        assert_eq!(c, Command::TabSave { name: "runFiles".into(), data: json!([1, 2]) });
    }

    #[test]
    fn usage_errors() {
        assert_eq!(parse_command("go").unwrap_err().code_str(), "usage");
        assert_eq!(parse_command("login a b").unwrap_err().code_str(), "usage");
        assert_eq!(parse_command("login a b c x").unwrap_err().code_str(), "usage");
        assert_eq!(parse_command("frobnicate").unwrap_err().code_str(), "unknown_command");
        assert!(parse_command("tab save x {bad").is_err());
    }

    #[test]
    fn out_of_range_ttl_is_usage_error() {
        let err = parse_command("login a@x.io A tok 9223372036854775807").unwrap_err();
        assert_eq!(err.code_str(), "usage");
        assert!(parse_command("login a@x.io A tok -9223372036854775808").is_err());
        assert!(expiry_after(i64::MAX / 60).is_err());
        assert!(expiry_after(-5).is_ok());
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command(" go /home ").unwrap(), Command::Go("/home".into()));
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
        assert_eq!(parse_command("companies load c.json").unwrap(), Command::CompaniesLoad(PathBuf::from("c.json")));
    }
}
