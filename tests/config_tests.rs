use clap::Parser;
use rpcgate::cli::Cli;
use rpcgate::config::{Settings, DEFAULT_HTTP_ADDR};
use rpcgate::logging::LogFormat;
use std::io::Write;

fn write_settings(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("rpcgate_settings_")
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_settings_file() {
    let file = write_settings(
        "gateway:\n  verbose: true\nhttp:\n  addr: \"127.0.0.1:9191\"\nlog:\n  level: warn\n  format: json\nruntime:\n  stack_size: 0x8000\n",
    );
    let settings = Settings::load(file.path()).unwrap();
    assert!(settings.gateway.verbose);
    assert_eq!(settings.http_addr(), "127.0.0.1:9191");
    assert_eq!(settings.log.format, Some(LogFormat::Json));
    assert_eq!(settings.log_config().log_level, "warn");
    assert_eq!(settings.runtime_config().stack_size, 0x8000);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Settings::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read settings file"));
}

#[test]
fn test_invalid_file_is_an_error() {
    let file = write_settings("http: [not, a, map]\n");
    let err = Settings::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse settings file"));
}

#[test]
fn test_cli_reads_config_and_overrides_verbose() {
    let file = write_settings("http:\n  addr: \"0.0.0.0:7000\"\n");
    let path = file.path().to_str().unwrap();

    let cli = Cli::try_parse_from(["rpcgate", "--config", path, "--verbose", "methods"]).unwrap();
    let settings = cli.settings().unwrap();
    assert_eq!(settings.http_addr(), "0.0.0.0:7000");
    assert!(cli.gateway_config(&settings).verbose);

    let cli = Cli::try_parse_from(["rpcgate", "methods"]).unwrap();
    let settings = cli.settings().unwrap();
    assert_eq!(settings.http_addr(), DEFAULT_HTTP_ADDR);
}
