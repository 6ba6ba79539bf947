//! Log filter selection shared by every front end.

pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingInitOptions {
    pub verbose: u8,
    pub cli_log_filter: Option<String>,
    pub rust_log_env: Option<String>,
    pub config_log_filter: Option<String>,
    pub default_log_filter: String,
}

impl Default for LoggingInitOptions {
    fn default() -> Self {
        Self {
            verbose: 0,
            cli_log_filter: None,
            rust_log_env: None,
            config_log_filter: None,
            default_log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Pick the filter directive string, highest precedence first:
/// `--log-filter`, `-v`/`-vv`, `RUST_LOG`, config file, default.
pub fn select_log_filter(options: &LoggingInitOptions) -> String {
    if let Some(filter) = non_blank(options.cli_log_filter.as_deref()) {
        filter.to_string()
    } else if options.verbose >= 2 {
        "trace".to_string()
    } else if options.verbose == 1 {
        "debug".to_string()
    } else if let Some(filter) = non_blank(options.rust_log_env.as_deref()) {
        filter.to_string()
    } else if let Some(filter) = non_blank(options.config_log_filter.as_deref()) {
        filter.to_string()
    } else {
        options.default_log_filter.clone()
    }
}

fn non_blank(filter: Option<&str>) -> Option<&str> {
    filter.map(str::trim).filter(|filter| !filter.is_empty())
}
