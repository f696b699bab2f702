use camposanto::cli::CliOverrides;
use camposanto::run_with_overrides;
use log::error;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli_overrides = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed.into_config_overrides(),
        Err(err) => {
            error!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = pollster::block_on(run_with_overrides(cli_overrides)) {
        error!("Application error: {err:?}");
        std::process::exit(1);
    }
}
