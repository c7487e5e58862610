use acm_loopback::config::{Config, ConfigLoader, LogFormat, Profile};
use acm_loopback::logging::init_tracing;
use acm_loopback::loopback::LoopbackVerifier;
use acm_loopback::port::SystemPortOpener;
use acm_loopback::report::ConsoleReporter;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

// Command-line arguments. Every flag overrides the config file and environment.
#[derive(Parser, Debug)]
#[command(
    name = "acm-loopback",
    version,
    about = "Verify two cross-connected CDC-ACM serial ports with random payloads.",
    long_about = "Writes a random block to the data and console ports each trial, reads back the same \
                  amount from both, and checks that each port received what was sent to the other one. \
                  Mismatches are dumped in hex and counted per direction."
)]
struct Args {
    /// Configuration file (defaults: $ACM_LOOPBACK_CONFIG, ./acm-loopback.toml, user config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Named preset for the trial loop.
    #[arg(short, long, value_enum)]
    profile: Option<Profile>,

    /// Device path of the data port.
    #[arg(long)]
    data_port: Option<String>,

    /// Device path of the console port.
    #[arg(long)]
    console_port: Option<String>,

    /// Baud rate for both ports.
    #[arg(short, long)]
    baud: Option<u32>,

    /// Read timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of trials to attempt.
    #[arg(short = 'n', long)]
    trials: Option<u32>,

    /// Bytes written to each port per trial.
    #[arg(short = 's', long)]
    payload_size: Option<usize>,

    /// Pause before each trial's writes, in microseconds.
    #[arg(long)]
    delay_us: Option<u64>,

    /// Stop after the first trial with a mismatch.
    #[arg(long)]
    stop_on_first_error: bool,

    /// Run every trial even if the profile would stop early.
    #[arg(long, conflicts_with = "stop_on_first_error")]
    keep_going: bool,

    /// Discard bytes already buffered on both ports before the first trial.
    #[arg(long)]
    clear_on_open: bool,

    /// Exit with status 1 when any mismatch was counted.
    #[arg(long)]
    fail_on_mismatch: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,

    /// Log level (overridden by RUST_LOG).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(profile) = self.profile {
            config.run.profile = profile;
        }
        if let Some(ref path) = self.data_port {
            config.ports.data = path.clone();
        }
        if let Some(ref path) = self.console_port {
            config.ports.console = path.clone();
        }
        if let Some(baud) = self.baud {
            config.ports.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.ports.timeout_ms = timeout_ms;
        }
        if self.clear_on_open {
            config.ports.clear_on_open = true;
        }
        if let Some(trials) = self.trials {
            config.run.trials = Some(trials);
        }
        if let Some(size) = self.payload_size {
            config.run.payload_size = Some(size);
        }
        if let Some(delay) = self.delay_us {
            config.run.inter_trial_delay_us = Some(delay);
        }
        if self.stop_on_first_error {
            config.run.stop_on_first_error = Some(true);
        }
        if self.keep_going {
            config.run.stop_on_first_error = Some(false);
        }
        if self.fail_on_mismatch {
            config.run.fail_on_mismatch = true;
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match args.config {
        Some(ref path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config_path = loader.config_path.clone();
    let mut config = loader.into_config();
    args.apply(&mut config);

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    init_tracing(&config.logging);
    if let Some(path) = config_path {
        tracing::debug!(path = %path.display(), "loaded configuration file");
    }

    let run_config = config.resolve()?;
    let mut reporter = ConsoleReporter::stdout().with_json_summary(args.json);
    let mut verifier = LoopbackVerifier::new(run_config);

    let summary = verifier
        .run(&mut SystemPortOpener, &mut reporter)
        .map_err(|e| {
            tracing::error!(error = %e, setup = e.is_setup(), "loopback run aborted");
            e
        })?;

    if config.run.fail_on_mismatch && !summary.is_clean() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "acm-loopback",
            "--profile",
            "fail-fast",
            "--data-port",
            "/dev/ttyACM4",
            "-n",
            "10",
            "--keep-going",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.data_port, "/dev/ttyACM4");
        assert_eq!(resolved.trial_count, 10);
        assert!(!resolved.stop_on_first_error);
        assert_eq!(resolved.payload_size, 64);
    }
}
