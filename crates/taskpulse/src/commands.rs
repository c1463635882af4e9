use std::path::PathBuf;

use clap::ArgMatches;
use tracing::info;

use taskpulse_core::{Notification, NotificationId, TransportKind};
use taskpulse_daemon::{DaemonClient, DaemonConfig};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Dispatch the parsed command line.
///
/// Every subcommand attaches to the daemon, performs one operation, and
/// detaches; the CLI never holds a persistent connection.
pub fn run_command(matches: &ArgMatches) -> CommandResult {
    let socket_path = resolve_socket_path(matches);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match matches.subcommand() {
        Some(("status", _)) => runtime.block_on(cmd_status(&socket_path)),
        Some(("list", sub)) => runtime.block_on(cmd_list(&socket_path, sub.get_flag("unread"))),
        Some(("respond", sub)) => {
            let raw = sub.get_one::<String>("task-id").expect("required arg");
            let task_id: i64 = raw
                .parse()
                .map_err(|_| format!("invalid task id '{}'", raw))?;
            runtime.block_on(cmd_respond(&socket_path, task_id))
        }
        Some(("mark-read", sub)) => {
            let raw = sub.get_one::<String>("id").expect("required arg");
            runtime.block_on(cmd_mark_read(&socket_path, parse_notification_id(raw)))
        }
        Some(("config", sub)) => match sub.subcommand() {
            Some(("show", _)) => runtime.block_on(cmd_config_show(&socket_path)),
            Some(("set", set)) => runtime.block_on(cmd_config_set(&socket_path, set)),
            _ => unreachable!("config subcommand required"),
        },
        Some(("stop", _)) => runtime.block_on(cmd_stop(&socket_path)),
        _ => unreachable!("subcommand required"),
    }
}

fn resolve_socket_path(matches: &ArgMatches) -> PathBuf {
    match matches.get_one::<String>("socket") {
        Some(path) => PathBuf::from(path),
        None => DaemonConfig::default_paths().socket_path,
    }
}

/// Notification ids on the command line: numeric when they parse, text
/// otherwise (push frames may carry string ids).
fn parse_notification_id(raw: &str) -> NotificationId {
    match raw.parse::<i64>() {
        Ok(n) => NotificationId::Number(n),
        Err(_) => NotificationId::Text(raw.to_string()),
    }
}

async fn cmd_status(socket_path: &PathBuf) -> CommandResult {
    let mut client = DaemonClient::connect(socket_path).await?;
    let status = client.get_status().await?;

    let connection = if status.connected {
        "connected"
    } else {
        "disconnected"
    };
    println!("Connection: {} [{}]", connection, status.indicator.glyph);
    if status.config.is_complete() {
        println!("Server:     {}", status.config.server_url);
        println!("Subject:    {}", status.config.um_code);
        println!("Transport:  {}", status.config.transport);
    } else {
        println!("Engine not configured. Run: taskpulse config set --server-url <URL> --um-code <CODE>");
    }
    Ok(())
}

async fn cmd_list(socket_path: &PathBuf, unread_only: bool) -> CommandResult {
    let mut client = DaemonClient::connect(socket_path).await?;
    let notifications = client.get_notifications().await?;

    let visible: Vec<&Notification> = notifications
        .iter()
        .filter(|n| !unread_only || !n.read)
        .collect();

    if visible.is_empty() {
        println!("No pending notifications.");
        return Ok(());
    }

    for n in visible {
        let marker = if n.read { " " } else { "*" };
        let task = n
            .task_id
            .map(|id| format!("  task {}", id))
            .unwrap_or_default();
        println!(
            "{} [{}] {}: {}{}  ({})",
            marker,
            n.id,
            n.title,
            n.content,
            task,
            format_time(&n.received_at),
        );
    }
    Ok(())
}

async fn cmd_respond(socket_path: &PathBuf, task_id: i64) -> CommandResult {
    let mut client = DaemonClient::connect(socket_path).await?;
    let reply = client.respond_task(task_id).await?;

    if reply.success {
        info!(event = "cli.respond.completed", task_id = task_id);
        println!("Responded to task {}.", task_id);
        if let Some(url) = reply.task_url {
            println!("Task: {}", url);
        }
        Ok(())
    } else {
        let reason = reply.error.unwrap_or_else(|| "unknown error".to_string());
        Err(format!("respond failed: {}", reason).into())
    }
}

async fn cmd_mark_read(socket_path: &PathBuf, id: NotificationId) -> CommandResult {
    let mut client = DaemonClient::connect(socket_path).await?;
    client.mark_as_read(&id).await?;
    println!("Marked {} as read.", id);
    Ok(())
}

async fn cmd_config_show(socket_path: &PathBuf) -> CommandResult {
    let mut client = DaemonClient::connect(socket_path).await?;
    let status = client.get_status().await?;
    let config = status.config;

    println!("serverUrl:        {}", config.server_url);
    println!("umCode:           {}", config.um_code);
    println!("soundEnabled:     {}", config.sound_enabled);
    println!("transport:        {}", config.transport);
    println!("pollIntervalSecs: {}", config.poll_interval_secs);
    Ok(())
}

async fn cmd_config_set(socket_path: &PathBuf, set: &ArgMatches) -> CommandResult {
    let mut client = DaemonClient::connect(socket_path).await?;

    // Start from the daemon's current record so unset flags keep their
    // values.
    let mut config = client.get_status().await?.config;

    if let Some(url) = set.get_one::<String>("server-url") {
        config.server_url = url.trim().to_string();
    }
    if let Some(code) = set.get_one::<String>("um-code") {
        config.um_code = code.trim().to_string();
    }
    if let Some(sound) = set.get_one::<String>("sound") {
        config.sound_enabled = parse_sound(sound)?;
    }
    if let Some(transport) = set.get_one::<String>("transport") {
        config.transport = parse_transport(transport)?;
    }
    if let Some(interval) = set.get_one::<String>("poll-interval") {
        config.poll_interval_secs = interval
            .parse()
            .map_err(|_| format!("invalid poll interval '{}'", interval))?;
    }

    if !config.is_complete() {
        return Err("server URL and subject code are both required".into());
    }

    client.update_config(&config).await?;
    println!("Configuration saved. Transport restarted.");
    Ok(())
}

async fn cmd_stop(socket_path: &PathBuf) -> CommandResult {
    let mut client = DaemonClient::connect(socket_path).await?;
    client.shutdown().await?;
    println!("Daemon stopping.");
    Ok(())
}

fn parse_sound(raw: &str) -> Result<bool, String> {
    match raw {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => Err(format!("invalid sound value '{}', expected on|off", other)),
    }
}

fn parse_transport(raw: &str) -> Result<TransportKind, String> {
    match raw {
        "poll" => Ok(TransportKind::Poll),
        "push" => Ok(TransportKind::Push),
        other => Err(format!(
            "invalid transport '{}', expected poll|push",
            other
        )),
    }
}

/// Render a received-at timestamp the way the popup did: relative for
/// recent items, absolute beyond a day.
fn format_time(iso: &str) -> String {
    let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(iso) else {
        return iso.to_string();
    };
    let elapsed = chrono::Utc::now().signed_duration_since(parsed);
    let secs = elapsed.num_seconds();

    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        parsed.format("%Y-%m-%d %H:%M").to_string()
    }
}
