use env_logger::Builder;
use log::{error, warn, LevelFilter};
use nix::unistd::Uid;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::env;
use std::io::Write;
use std::process::ExitCode;

use fc_ec::cli::{self, Action};
use fc_ec::config::{Config, CONFIG_FILE};
use fc_ec::{set_fan, FanSetting, HardwarePorts};

const PROGNAME: &str = "fc";

fn setup_logging(level: LevelFilter) {
    let mut builder = Builder::new();
    builder.filter_level(level);
    // RUST_LOG wins over the config file
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format(|f, record| writeln!(f, "[{}]: {}", PROGNAME, record.args()));
    builder.init();
}

fn is_root() -> bool {
    Uid::effective().is_root()
}

fn run(setting: FanSetting, config: &Config) -> fc_ec::Result<()> {
    // Hold SIGINT/SIGTERM until the EC has been released.
    let signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => Some(signals),
        Err(err) => {
            warn!("Unable to defer signals, an interrupt may leave the EC claimed: {}", err);
            None
        }
    };

    let result = HardwarePorts::new()
        .and_then(|ports| set_fan(ports, setting, config.controller.poll_budget));

    if let Some(mut signals) = signals {
        for signal in signals.pending() {
            warn!("Received signal {} during the handshake, exiting after cleanup", signal);
        }
    }
    result
}

fn main() -> ExitCode {
    let mut args = env::args();
    let progname = args.next().unwrap_or_else(|| PROGNAME.to_string());
    let action = cli::parse(args);

    let config = Config::load(CONFIG_FILE);
    setup_logging(
        config
            .as_ref()
            .map(|config| config.log.level.into())
            .unwrap_or(LevelFilter::Info),
    );

    let setting = match action {
        Ok(Action::Set(setting)) => setting,
        Ok(Action::Help) => {
            print!("{}", cli::usage(&progname));
            return ExitCode::FAILURE;
        }
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    if !is_root() {
        error!("Must be run as root");
        return ExitCode::FAILURE;
    }

    match run(setting, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
