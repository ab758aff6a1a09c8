use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub symbol: String,
    pub company: String,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub skip_health: bool,
    pub auto_retry: bool,
    pub no_prompt: bool,
}

impl CliArgs {
    /// `None` when a required flag or its value is missing.
    pub fn parse(args: &[String]) -> Option<Self> {
        let value = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .filter(|v| !v.starts_with("--"))
                .cloned()
        };
        let has = |flag: &str| args.iter().any(|a| a == flag);

        Some(Self {
            symbol: value("--symbol")?,
            company: value("--company")?,
            output: value("--output").map(PathBuf::from),
            json: has("--json"),
            skip_health: has("--skip-health"),
            auto_retry: has("--auto-retry"),
            no_prompt: has("--no-prompt"),
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  analyst-report --symbol TSLA --company \"Tesla Inc.\" [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --output DIR     Write the report download into DIR");
    eprintln!("  --json           Print the raw report payload instead of the text view");
    eprintln!("  --skip-health    Do not probe the service before submitting");
    eprintln!("  --auto-retry     Retry failed runs automatically (same cap as manual retry)");
    eprintln!("  --no-prompt      Never ask whether to retry a failed run");
    eprintln!();
    eprintln!("Environment: ANALYST_API_URL, ANALYSIS_POLL_INTERVAL_SECS, ANALYSIS_DEADLINE_SECS,");
    eprintln!("  ANALYSIS_MAX_ATTEMPTS, ANALYSIS_RETRY_DELAY_SECS, ANALYSIS_AUTO_RETRY, RUST_LOG");
}
