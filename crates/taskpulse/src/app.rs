use clap::{Arg, ArgAction, Command};

/// Build the CLI definition.
pub fn build_cli() -> Command {
    Command::new("taskpulse")
        .about("Pending task notifications from the terminal")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Only log errors"),
        )
        .arg(
            Arg::new("socket")
                .long("socket")
                .value_name("PATH")
                .global(true)
                .help("Daemon control socket (default: ~/.taskpulse/daemon.sock)"),
        )
        .subcommand(Command::new("status").about("Show connection status and the unread badge"))
        .subcommand(
            Command::new("list").about("List notifications, newest first").arg(
                Arg::new("unread")
                    .long("unread")
                    .action(ArgAction::SetTrue)
                    .help("Only unread notifications"),
            ),
        )
        .subcommand(
            Command::new("respond")
                .about("Respond to a task and re-sync the notification set")
                .arg(
                    Arg::new("task-id")
                        .required(true)
                        .value_name("TASK_ID")
                        .help("Numeric task id"),
                ),
        )
        .subcommand(
            Command::new("mark-read")
                .about("Mark a notification read")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_name("ID")
                        .help("Notification id"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change the engine configuration")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Show the current configuration"))
                .subcommand(
                    Command::new("set")
                        .about("Update configuration fields and restart the transport")
                        .arg(
                            Arg::new("server-url")
                                .long("server-url")
                                .value_name("URL")
                                .help("Task server base URL, e.g. http://tasks.example.com"),
                        )
                        .arg(
                            Arg::new("um-code")
                                .long("um-code")
                                .value_name("CODE")
                                .help("Subject code to track notifications for"),
                        )
                        .arg(
                            Arg::new("sound")
                                .long("sound")
                                .value_name("on|off")
                                .help("Whether alerts request sound"),
                        )
                        .arg(
                            Arg::new("transport")
                                .long("transport")
                                .value_name("poll|push")
                                .help("Delivery transport"),
                        )
                        .arg(
                            Arg::new("poll-interval")
                                .long("poll-interval")
                                .value_name("SECS")
                                .help("Poll period in seconds"),
                        ),
                ),
        )
        .subcommand(Command::new("stop").about("Stop the daemon"))
}
