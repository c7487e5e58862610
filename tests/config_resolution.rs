//! Configuration file discovery, environment overrides and validation.

use acm_loopback::config::{resolve_config_path, Config, ConfigLoader, LogFormat, Profile};
use acm_loopback::ConfigError;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const OVERRIDE_VARS: &[&str] = &[
    "ACM_LOOPBACK_CONFIG",
    "ACM_LOOPBACK_PORTS_DATA",
    "ACM_LOOPBACK_PORTS_TIMEOUT_MS",
    "ACM_LOOPBACK_RUN_TRIALS",
    "ACM_LOOPBACK_RUN_STOP_ON_FIRST_ERROR",
    "ACM_LOOPBACK_LOGGING_FORMAT",
];

fn clear_env() {
    for var in OVERRIDE_VARS {
        env::remove_var(var);
    }
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
#[serial]
fn explicit_env_path_is_loaded() {
    clear_env();
    let file = config_file(
        r#"
[ports]
data = "/dev/ttyACM2"
console = "/dev/ttyACM3"
baud_rate = 921600

[run]
profile = "fail-fast"
trials = 50
"#,
    );
    env::set_var("ACM_LOOPBACK_CONFIG", file.path());

    let found = resolve_config_path();
    let loader = ConfigLoader::load();
    clear_env();

    assert_eq!(found.as_deref(), Some(file.path()));
    let loader = loader.unwrap();
    assert_eq!(loader.config_path.as_deref(), Some(file.path()));

    let resolved = loader.config().resolve().unwrap();
    assert_eq!(resolved.data_port, "/dev/ttyACM2");
    assert_eq!(resolved.console_port, "/dev/ttyACM3");
    assert_eq!(resolved.baud_rate, 921_600);
    assert_eq!(resolved.trial_count, 50);
    assert!(resolved.stop_on_first_error);
    assert_eq!(resolved.payload_size, Profile::FailFast.preset().payload_size);
}

#[test]
#[serial]
fn environment_beats_file_values() {
    clear_env();
    let file = config_file(
        r#"
[ports]
data = "/dev/ttyUSB0"
timeout_ms = 250

[run]
trials = 10
stop_on_first_error = true

[logging]
format = "pretty"
"#,
    );
    env::set_var("ACM_LOOPBACK_PORTS_DATA", "/dev/ttyACM9");
    env::set_var("ACM_LOOPBACK_RUN_STOP_ON_FIRST_ERROR", "off");
    env::set_var("ACM_LOOPBACK_LOGGING_FORMAT", "json");

    let loader = ConfigLoader::load_from(file.path());
    clear_env();

    let config = loader.unwrap().into_config();
    assert_eq!(config.ports.data, "/dev/ttyACM9");
    assert_eq!(config.ports.timeout(), Duration::from_millis(250));
    assert_eq!(config.run.trials, Some(10));
    assert_eq!(config.run.stop_on_first_error, Some(false));
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
#[serial]
fn missing_explicit_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    match ConfigLoader::load_from(&path) {
        Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
#[serial]
fn malformed_file_reports_a_parse_error() {
    clear_env();
    let file = config_file("[ports\ndata = 3");

    assert!(matches!(
        ConfigLoader::load_from(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
#[serial]
fn unknown_profile_in_file_is_rejected() {
    clear_env();
    let file = config_file("[run]\nprofile = \"turbo\"\n");

    assert!(matches!(
        ConfigLoader::load_from(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
#[serial]
fn bad_numeric_override_names_the_variable() {
    clear_env();
    env::set_var("ACM_LOOPBACK_RUN_TRIALS", "-4");
    let result = ConfigLoader::with_defaults();
    clear_env();

    match result {
        Err(ConfigError::EnvParseError { var, .. }) => {
            assert_eq!(var, "ACM_LOOPBACK_RUN_TRIALS")
        }
        other => panic!("expected EnvParseError, got {other:?}"),
    }
}

#[test]
fn partial_file_falls_back_to_stress_defaults() {
    let config: Config = toml::from_str("[ports]\nconsole = \"/dev/ttyACM5\"\n").unwrap();
    let resolved = config.resolve().unwrap();

    assert_eq!(resolved.data_port, "/dev/ttyACM0");
    assert_eq!(resolved.console_port, "/dev/ttyACM5");
    assert_eq!(resolved.baud_rate, 115_200);
    assert_eq!(resolved.read_timeout, Duration::from_secs(1));
    assert_eq!(resolved.trial_count, 2000);
    assert_eq!(resolved.payload_size, 150);
    assert_eq!(resolved.inter_trial_delay, Duration::from_micros(100));
    assert!(!resolved.stop_on_first_error);
}

#[test]
fn same_path_for_both_ports_is_rejected() {
    let mut config = Config::default();
    config.ports.console = config.ports.data.clone();

    match config.resolve() {
        Err(ConfigError::ValidationError { key, .. }) => assert_eq!(key, "ports.console"),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn printed_config_loads_back_unchanged() {
    let mut config = Config::default();
    config.run.profile = Profile::FailFast;
    config.run.trials = Some(7);
    config.logging.format = LogFormat::Compact;

    let text = toml::to_string_pretty(&config).unwrap();
    let reloaded: Config = toml::from_str(&text).unwrap();

    assert_eq!(reloaded, config);
}
