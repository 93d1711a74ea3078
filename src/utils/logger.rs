use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "small_kv=info";
const VERBOSE_DIRECTIVE: &str = "small_kv=debug,info";

/// Picks the filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool, configured: Option<&str>) -> String {
    if verbose {
        VERBOSE_DIRECTIVE.to_string()
    } else if let Some(level) = configured {
        format!("small_kv={}", level)
    } else {
        DEFAULT_DIRECTIVE.to_string()
    }
}

/// Logs go to stderr; stdout is reserved for command output.
pub fn init_cli_logger(verbose: bool, configured: Option<&str>) {
    let directive = default_directive(verbose, configured);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false, None), "small_kv=info");
        assert_eq!(default_directive(true, Some("warn")), "small_kv=debug,info");
        assert_eq!(default_directive(false, Some("warn")), "small_kv=warn");
    }
}
