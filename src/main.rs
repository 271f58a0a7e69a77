use clap::Parser;
use log::{debug, error, log_enabled, Level};
use std::io;
use std::process;

use exim_bounce::{run_filter, Args, Config};

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str()))
        .format_timestamp_millis()
        .init();

    let config = Config::from(args);
    debug!(
        "[main] mta={} args={:?} trust_group={:?}",
        config.mta.path.display(),
        config.mta.args,
        config.mta.trust_group
    );

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let code = match run_filter(&config, &mut input) {
        Ok(outcome) => {
            debug!("[main] finished: {:?}", outcome);
            outcome.exit_code()
        }
        Err(e) => {
            // Fatal diagnostics reach stderr even with logging turned off.
            if log_enabled!(Level::Error) {
                error!("[main] {}", e);
            } else {
                eprintln!("exim-bounce: {}", e);
            }
            1
        }
    };
    process::exit(code);
}
