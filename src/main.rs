use anyhow::Context;
use clap::Parser;
use small_kv::utils::{logger, validation::Validate};
use small_kv::{console, open_dao, CliConfig, Console, KvError};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = CliConfig::parse();

    let config = match cli.resolve().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose, None);
            return Ok(fail(&e));
        }
    };

    logger::init_cli_logger(cli.verbose, config.logging.level.as_deref());
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    let data_dir = config.data_dir();
    let dao = match open_dao(&config) {
        Ok(dao) => dao,
        Err(e) => return Ok(fail(&e)),
    };
    let absolute = std::fs::canonicalize(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
    tracing::info!("Storing data in {}", absolute.display());

    println!("{}", console::banner(config.storage.engine.name()));

    let mut console = Console::new(dao);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    let interrupted = tokio::select! {
        result = console.run(stdin, &mut stdout) => {
            result.context("Console session failed")?;
            false
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, closing store");
            true
        }
    };

    let mut dao = console.into_inner();
    if let Err(e) = dao.close() {
        return Ok(fail(&e));
    }

    if interrupted {
        // the blocking stdin read cannot be cancelled, so runtime shutdown would wait on it
        std::process::exit(0);
    }
    Ok(ExitCode::SUCCESS)
}

fn fail(e: &KvError) -> ExitCode {
    tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    ExitCode::from(e.exit_code())
}
