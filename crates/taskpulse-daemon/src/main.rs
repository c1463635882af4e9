use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

use taskpulse_core::init_logging;
use taskpulse_daemon::{DaemonConfig, run_server};

fn build_cli() -> Command {
    Command::new("taskpulse-daemon")
        .about("TaskPulse notification engine daemon")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("socket")
                .long("socket")
                .value_name("PATH")
                .help("Control socket path (default: <data-dir>/daemon.sock)"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("PATH")
                .help("Durable state directory (default: ~/.taskpulse)"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Only log errors"),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = build_cli().get_matches();

    init_logging(matches.get_flag("quiet"));

    let mut config = DaemonConfig::default_paths();
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config.data_dir = PathBuf::from(dir);
        config.socket_path = config.data_dir.join("daemon.sock");
    }
    if let Some(socket) = matches.get_one::<String>("socket") {
        config.socket_path = PathBuf::from(socket);
    }

    run_server(config).await?;
    Ok(())
}
