use std::io::Write;

use crate::cli::{demo_router, load_config, Cli, Commands};
use crate::request::RequestContext;
use crate::App;
use clap::Parser;

#[test]
fn test_serve_defaults() {
    let cli = Cli::try_parse_from(["metime", "serve"]).unwrap();
    match cli.command {
        Commands::Serve { config, addr } => {
            assert!(config.is_none());
            assert_eq!(addr, "127.0.0.1:8080");
        }
        Commands::Check { .. } => panic!("Expected Serve command"),
    }
}

#[test]
fn test_check_requires_config() {
    assert!(Cli::try_parse_from(["metime", "check"]).is_err());
    let cli = Cli::try_parse_from(["metime", "check", "--config", "metime.yaml"]).unwrap();
    assert!(matches!(cli.command, Commands::Check { .. }));
}

#[test]
fn test_load_config_falls_back_to_addr() {
    let config = load_config(None, "0.0.0.0:9000").unwrap();
    if std::env::var("METIME_BASE_URL").is_err() {
        assert_eq!(config.base_url(), "http://0.0.0.0:9000/");
    }
}

#[test]
fn test_load_config_reads_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "base_url: http://demo.local/\ndefault_action: hello").unwrap();
    let config = load_config(Some(file.path()), "127.0.0.1:1").unwrap();
    if std::env::var("METIME_DEFAULT_ACTION").is_err() {
        assert_eq!(config.default_action, "hello");
    }
}

#[test]
fn test_demo_pages_link_to_each_other() {
    let mut app = App::new();
    app.set_base_url("http://demo.local/").add_router(demo_router());

    let home = app.run(RequestContext::default().with_query("_", "home"));
    assert_eq!(home.status, 200);
    assert!(home.body_text().contains("<h1>Home</h1>"));
    assert!(home.body_text().contains("http://demo.local/?_=hello"));

    let hello = app.run(RequestContext::default().with_query("_", "hello"));
    assert!(hello.body_text().contains("http://demo.local/?_=home"));
}
