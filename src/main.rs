use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use opsdesk::cli;
use opsdesk::config::AppConfig;
use opsdesk::context::AppContext;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <file.json>]            # interactive console\n  {program} [--config <file.json>] --go <path>  # evaluate one navigation and exit\n\nEnvironment:\n  OPSDESK_DATA_DIR, OPSDESK_DIRECTORY_URL, OPSDESK_DIRECTORY_PATH, OPSDESK_DIRECTORY_FILE,\n  OPSDESK_FUNCTION_KEY, OPSDESK_SIGNOUT_MS, OPSDESK_LOGIN_PATH, OPSDESK_ADMIN_LANDING,\n  OPSDESK_DEFAULT_LANDING, OPSDESK_WILDCARD_AUTO_SIGNOUT, OPSDESK_WILDCARD_GRACE_SECS, RUST_LOG\n\n{}",
        cli::HELP
    );
}

fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "opsdesk".to_string());
    let mut config_path: Option<PathBuf> = None;
    let mut go: Option<String> = None;
    while let Some(a) = args.next() {
        match a.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "--go" => go = args.next(),
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            other => {
                eprintln!("unknown argument: {}", other);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    let config = match AppConfig::resolve(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => { eprintln!("configuration error: {}", e); std::process::exit(e.exit_code()); }
    };
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "startup", "opsdesk starting: RUST_LOG='{}', config={:?}", rust_log, config_path);

    let rt = tokio::runtime::Runtime::new()?;
    let ctx = match AppContext::from_config(config) {
        Ok(c) => c,
        Err(e) => { eprintln!("startup error: {}", e); std::process::exit(e.exit_code()); }
    };

    if let Some(path) = go {
        match rt.block_on(cli::execute(&ctx, cli::Command::Go(path))) {
            Ok(text) => { println!("{}", text); return Ok(()); }
            Err(e) => { eprintln!("error: {}", e); std::process::exit(e.exit_code()); }
        }
    }
    cli::run_repl(&rt, &ctx)
}
