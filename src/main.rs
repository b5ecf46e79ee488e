use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use discord_bridge::config::{Settings, DEFAULT_CONFIG_TOML};

#[derive(Parser)]
#[command(
    name = "discord-bridge",
    about = "Relay prefixed Discord messages to an automation webhook",
    version
)]
struct Cli {
    /// Config file (default: ~/.discord-bridge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and start forwarding messages
    #[cfg(feature = "discord")]
    Run,
    /// Write a default config file
    Init,
    /// Show the resolved configuration (token redacted)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let cli = Cli::parse();
    // --config 显式指定时文件必须存在，默认路径缺失则只读环境变量
    let explicit = cli.config.is_some();
    let config_path = match cli.config {
        Some(path) => path,
        None => Settings::default_config_path()?,
    };

    match cli.command {
        #[cfg(feature = "discord")]
        Commands::Run => run_bridge(&config_path, explicit).await?,
        Commands::Init => run_init(&config_path)?,
        Commands::Config => run_config(&config_path, explicit)?,
    }

    Ok(())
}

fn load_settings(config_path: &std::path::Path, explicit: bool) -> Result<Settings> {
    let settings = if explicit {
        Settings::load_required(config_path)
    } else {
        Settings::load(Some(config_path))
    };
    settings.wrap_err("Invalid configuration")
}

#[cfg(feature = "discord")]
async fn run_bridge(config_path: &std::path::Path, explicit: bool) -> Result<()> {
    let settings = load_settings(config_path, explicit)?;
    discord_bridge::channels::discord::run_discord(std::sync::Arc::new(settings)).await
}

fn run_init(config_path: &std::path::Path) -> Result<()> {
    if config_path.exists() {
        println!("Config file already exists: {}", config_path.display());
        println!("Delete it first to re-initialize.");
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(config_path, DEFAULT_CONFIG_TOML).wrap_err("Failed to write default config")?;
    println!("Created config file: {}", config_path.display());
    println!("Set discord_bot_token and n8n_webhook_url before running.");

    Ok(())
}

fn run_config(config_path: &std::path::Path, explicit: bool) -> Result<()> {
    let settings = load_settings(config_path, explicit)?;
    println!("# config file: {}", config_path.display());
    println!("{}", settings);
    Ok(())
}

/// 日志目录: ~/.discord-bridge/logs/
fn log_dir() -> Result<PathBuf> {
    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| color_eyre::eyre::eyre!("cannot resolve home directory"))?;
    Ok(base_dirs.home_dir().join(".discord-bridge").join("logs"))
}

/// 初始化 tracing: stderr 默认 info，日志文件输出 debug+
fn init_tracing() -> Result<()> {
    let log_dir = log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .wrap_err_with(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    // 文件日志: 按天滚动
    let file_appender = tracing_appender::rolling::daily(&log_dir, "discord-bridge.log");
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(tracing_subscriber::EnvFilter::new(
            "discord_bridge=debug,serenity=info,warn",
        ));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("discord_bridge=info,warn")),
        );

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}
