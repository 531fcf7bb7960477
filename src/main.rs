use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use montague::error::Result;
use montague::grammar::{Grammar, load_grammar};
use montague::interface::{BUILTIN_GRAMMAR, HELP, Session};
use montague::persist::{PersistenceMode, Persistor};
use montague::settings::{LOCAL_FILE, Loader, Settings};

fn load(settings: &Settings) -> Result<Session> {
    let grammar: Grammar = match &settings.grammar.path {
        Some(path) => load_grammar(&fs::read_to_string(path)?)?,
        None => load_grammar(BUILTIN_GRAMMAR)?,
    };
    info!(rules = grammar.len(), start = %settings.grammar.start, "grammar ready");
    let mode = PersistenceMode::from_path(settings.database.path.as_deref());
    let persistor = Persistor::new(&mode)?;
    Ok(Session::with_settings(Arc::new(grammar), persistor, settings))
}

/// Reads commands until the input runs dry. A script is echoed line by
/// line, the way it would have been typed.
fn command_loop(session: &mut Session, input: Box<dyn BufRead>, interactive: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if interactive {
        writeln!(out, "{}", HELP)?;
    }
    let mut lines = input.lines();
    loop {
        if interactive {
            write!(out, ">> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().starts_with('#') {
            continue;
        }
        if !interactive {
            writeln!(out, "{}", line)?;
        }
        match session.execute(&line) {
            Ok(reply) => {
                for text in &reply.lines {
                    writeln!(out, "{}", text)?;
                }
                if !reply.lines.is_empty() {
                    writeln!(out)?;
                }
            }
            Err(e) => {
                error!(error = %e, "command failed");
                writeln!(out, "(!) {}", e)?;
            }
        }
    }
    writeln!(out)?;
    writeln!(out, "Ciao!")?;
    Ok(())
}

fn run() -> Result<()> {
    let settings = Loader::new()
        .with_optional_file(LOCAL_FILE)
        .with_environment()
        .build()?;
    let mut session = load(&settings)?;

    if settings.server.enabled {
        let runtime = tokio::runtime::Runtime::new()?;
        return runtime.block_on(montague::server::serve(&settings.server.address, session));
    }

    match std::env::args().nth(1) {
        Some(script) => {
            let file = fs::File::open(&script)?;
            command_loop(&mut session, Box::new(BufReader::new(file)), false)
        }
        None => command_loop(&mut session, Box::new(io::stdin().lock()), true),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "montague=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "montague stopped");
            ExitCode::FAILURE
        }
    }
}
