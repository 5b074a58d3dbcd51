//! Configuration files and their effect on dispatch.

use std::io::Write;

use metime::{App, AppConfig, DispatchError, RequestContext};

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_yaml() {
    let file = write_config(
        ".yaml",
        "base_url: http://127.0.0.1/app/\naction_key: do\ndefault_action: start\ndebug: false\n",
    );
    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1/app/"));
    assert_eq!(config.action_key, "do");
    assert_eq!(config.default_action, "start");
    assert!(!config.debug);
}

#[test]
fn test_load_toml_by_extension() {
    let file = write_config(".toml", "base_url = \"http://x/\"\ndebug = false\n");
    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.base_url(), "http://x/");
    assert_eq!(config.action_key, "_");
}

#[test]
fn test_load_reports_parse_errors() {
    let file = write_config(".yaml", "debug: [not, a, bool]\n");
    let err = AppConfig::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AppConfig::load(dir.path().join("absent.yaml")).is_err());
}

#[test]
fn test_validate_reports_configuration_errors() {
    let config = AppConfig {
        base_url: Some("not a url".to_string()),
        ..AppConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, DispatchError::Configuration(_)));
    assert!(err.to_string().contains("Invalid base URL"));
}

#[test]
fn test_loaded_config_drives_dispatch() {
    let file = write_config(
        ".yaml",
        "base_url: http://example.test/\naction_key: page\ndefault_action: welcome\n",
    );
    let app = App::from_config(AppConfig::load(file.path()).unwrap());
    let sent = app.run(RequestContext::default().with_query("ref", "mail"));
    assert_eq!(
        sent.header("Location"),
        Some("http://example.test/?ref=mail&page=welcome")
    );
}
