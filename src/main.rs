// Main entry point
use clap::{CommandFactory, Parser};
use colored::Colorize;
use mistwar::application::sync::WVW_MAP_IDS;
use mistwar::domain::model::WvwOwner;
use mistwar::domain::objective::{ObjectiveEntity, ObjectiveSnapshot};
use mistwar::domain::traits::RemoteSource;
use mistwar::infrastructure::config::{self, load_config};
use mistwar::infrastructure::logging::init_logging;
use mistwar::infrastructure::network::{retry, RetryPolicy};
use mistwar::interfaces::cli::{parse_map, Cli};
use mistwar::presentation::theme::Theme;
use mistwar::state::AppState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup graceful shutdown handler
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    // Spawn signal handler task
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for shutdown signal: {}", e);
        } else {
            eprintln!("\n收到中断信号，正在优雅关闭...");
            let _ = shutdown_tx.send(());
        }
    });

    let cli = Cli::parse();
    let config = load_config()?;

    // Initialize logging
    if config.logging.enable {
        init_logging(&config.logging)?;
    }

    if cli.generate_config {
        config::generate_config_sample()?;
        return Ok(());
    }
    if cli.edit_config {
        if let Some(config_path) = config::get_config_path() {
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            // Run editor in blocking task
            tokio::task::spawn_blocking(move || {
                std::process::Command::new(editor).arg(&config_path).status()
            })
            .await??;
        } else {
            eprintln!("{}", "Config file not found".red());
        }
        return Ok(());
    }

    let theme_name = cli.theme.clone().unwrap_or_else(|| config.theme.clone());
    let theme = Theme::from_name(&theme_name);
    let state = AppState::new(config, cli.character.clone())?;

    if cli.status {
        print_status(&state, &theme);
        return Ok(());
    }

    let policy = RetryPolicy::from_config(&state.config.retry);
    let permissions = retry(policy, "Fetching token permissions", || {
        state.client.refresh_permissions()
    })
    .await;
    if let Err(e) = permissions {
        eprintln!("{}", format!("Could not read API key permissions: {}", e).yellow());
    }

    if cli.download_maps || cli.rebuild {
        let ids = WVW_MAP_IDS.to_vec();
        let worker = if cli.rebuild {
            state.maps.rebuild_maps(ids)
        } else {
            state.maps.download_maps(ids)
        };
        if let Some(worker) = worker {
            tokio::select! {
                result = worker => {
                    result?;
                    state.notifier.finish();
                    println!("{} {}", "✔".green(), "Map images are ready.".bold());
                }
                _ = &mut shutdown_rx => {
                    state.notifier.finish();
                    eprintln!("下载被中断");
                }
            }
        }
        state.maps.shutdown();
        return Ok(());
    }

    if let Some(map) = cli.objectives.as_deref() {
        let Some(map_id) = parse_map(map) else {
            eprintln!("{}", format!("✘ Unknown map: {}", map).red());
            std::process::exit(1);
        };
        state.player.set_map(Some(map_id));
        state.sync.load_world_data().await?;
        state.sync.update().await;
        state.notifier.finish();

        let objectives = state.registry.get_objectives(map_id).await;
        if cli.json {
            let snapshots: Vec<ObjectiveSnapshot> =
                objectives.iter().map(|o| o.snapshot()).collect();
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        } else {
            print!("{}", format_objectives(&state, &theme, map_id, &objectives));
        }
        state.maps.shutdown();
        return Ok(());
    }

    if cli.watch {
        tokio::select! {
            result = watch(&state, &theme, cli.json) => result?,
            _ = &mut shutdown_rx => {}
        }
        state.notifier.finish();
        state.maps.shutdown();
        return Ok(());
    }

    Cli::command().print_help()?;
    Ok(())
}

/// Tick loop: poll, then report every objective whose state changed.
async fn watch(state: &AppState, theme: &Theme, json: bool) -> anyhow::Result<()> {
    state.sync.load_world_data().await?;

    let mut seen: HashMap<String, ObjectiveSnapshot> = HashMap::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(state.config.tick_ms.max(100)));
    loop {
        ticker.tick().await;
        if !state.sync.update().await {
            continue;
        }

        for map_id in WVW_MAP_IDS {
            for objective in state.registry.get_objectives(map_id).await.iter() {
                let snapshot = objective.snapshot();
                let changed = seen
                    .get(&snapshot.id)
                    .is_some_and(|old| old.last_modified != snapshot.last_modified);
                if changed {
                    if json {
                        println!("{}", serde_json::to_string(&snapshot)?);
                    } else {
                        println!("{}", format_change(state, theme, objective));
                    }
                }
                seen.insert(snapshot.id.clone(), snapshot);
            }
        }
    }
}

fn team_name(state: &AppState, owner: WvwOwner) -> String {
    state
        .sync
        .world_name(owner)
        .unwrap_or_else(|| format!("{:?}", owner))
}

fn format_change(state: &AppState, theme: &Theme, objective: &ObjectiveEntity) -> String {
    let owner = objective.owner();
    format!(
        "{} {} {} {}",
        (theme.dim)(&objective.last_modified().format("%H:%M:%S").to_string()),
        (theme.title)(objective.name()),
        (theme.line)("→"),
        theme.team(owner, &team_name(state, owner))
    )
}

/// Format one map's objectives as a table-like listing
fn format_objectives(
    state: &AppState,
    theme: &Theme,
    map_id: i32,
    objectives: &[Arc<ObjectiveEntity>],
) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    let own_team = state.sync.current_team();
    let guild = state.sync.current_guild();

    writeln!(output, "{}", (theme.title)(&format!("Map {}", map_id))).ok();
    if let Some(home) = state.sync.home_world() {
        writeln!(output, "  {} {}", (theme.label)("Home"), home).ok();
    }
    if own_team != WvwOwner::Unknown {
        writeln!(
            output,
            "  {} {}",
            (theme.label)("Team"),
            theme.team(own_team, &team_name(state, own_team))
        )
        .ok();
    }
    if let Some(message) = state.sync.refresh_message() {
        writeln!(output, "  {}", (theme.dim)(&message)).ok();
    }
    let cutoff = "⸺".repeat(40);
    writeln!(output, "  {}", (theme.line)(&cutoff)).ok();

    if objectives.is_empty() {
        writeln!(output, "  {}", (theme.dim)("No objectives available.")).ok();
        return output;
    }

    for objective in objectives {
        let mut flags = Vec::new();
        if let Some(remaining) = objective.buff_remaining() {
            flags.push(format!(
                "🛡 {}:{:02}",
                remaining.num_minutes(),
                remaining.num_seconds() % 60
            ));
        }
        if objective.has_emergency_waypoint() {
            flags.push("EWP".to_string());
        } else if objective.has_regular_waypoint() && !objective.waypoints().is_empty() {
            flags.push("WP".to_string());
        }
        if guild.is_some_and(|g| objective.is_claimed_by(g)) {
            flags.push("★".to_string());
        }

        writeln!(
            output,
            "  {:<8} {:<28} {:<10} {:<11} {}",
            (theme.dim)(objective.id()),
            objective.name(),
            theme.team(objective.owner(), &format!("{:?}", objective.owner())),
            format!("{:?}", objective.tier()),
            (theme.label)(&flags.join(" "))
        )
        .ok();
    }

    writeln!(output).ok();
    output
}

fn print_status(state: &AppState, theme: &Theme) {
    println!("{}", "mistwar Status".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config: {}",
        config::get_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found".to_string())
    );

    if state.client.has_api_key() {
        println!("API key: Configured");
    } else {
        println!("API key: {}", (theme.warning)("Not configured"));
    }

    let cache_dir = config::get_cache_dir(&state.config);
    println!("Map cache: {}", cache_dir.display());
    for map_id in WVW_MAP_IDS {
        let path = cache_dir.join(format!("{}.png", map_id));
        let status = if path.is_file() {
            "ready".green().to_string()
        } else {
            (theme.dim)("missing")
        };
        println!("  {:<6} {}", map_id, status);
    }
}
