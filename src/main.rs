use metime::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    let _logging = init_logging_with_config(&LogConfig::from_env())?;
    metime::cli::run_cli()
}
