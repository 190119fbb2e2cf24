use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use toolbox::Toolbox;
use toolbox::ToolboxError;
use toolbox::config::Config;
use toolbox::deps::{CheckStatus, install_hint};
use toolbox::error::{EXIT_DEPENDENCY_UNSATISFIED, EXIT_FAILURE};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolbox")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("toolbox.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .target(env_logger::Target::Pipe(target))
        .init();

    // RUST_LOG wins; otherwise the config file decides once it is loaded
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(LevelFilter::Info);
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn apply_log_level(cli: &Cli, config: &Config) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if cli.is_verbose() {
        log::set_max_level(LevelFilter::Debug);
        return;
    }
    if let Some(level) = &config.log_level {
        match level.parse::<LevelFilter>() {
            Ok(filter) => log::set_max_level(filter),
            Err(_) => log::warn!("Ignoring unknown log_level '{}'", level),
        }
    }
}

async fn run_application(cli: &Cli, config: Config) -> Result<i32> {
    info!("Starting application (tool: {:?})", cli.command.tool_name());

    if cli.is_verbose() {
        eprintln!("{}", "Verbose mode enabled".yellow());
        eprintln!("{} {}", "Tools root:".cyan(), config.tools_root.display());
    }

    let toolbox = Toolbox::from_config(config)?;

    match &cli.command {
        Commands::List { json } => handle_list_command(&toolbox, *json),
        Commands::Run { name, args } => handle_run_command(&toolbox, name, args).await,
        Commands::Install { name } => handle_install_command(&toolbox, name).await,
        Commands::New { name } => handle_new_command(&toolbox, name),
        Commands::Deps { name } => handle_deps_command(&toolbox, name).await,
        Commands::Check { fix } => handle_check_command(&toolbox, *fix).await,
        Commands::Doctor => handle_doctor_command(&toolbox).await,
    }
}

fn handle_list_command(toolbox: &Toolbox, json: bool) -> Result<i32> {
    let registry = toolbox.discover()?;
    info!("Listing {} tools", registry.len());

    if json {
        let summaries: Vec<_> = registry.iter().map(|t| t.summary()).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(0);
    }

    if registry.is_empty() {
        println!(
            "{} {}",
            "No tools found in".yellow(),
            toolbox.config().tools_root.display()
        );
        println!("  Create one with: {} new <name>", env!("CARGO_PKG_NAME"));
        return Ok(0);
    }

    println!("{}", "Available tools:".bold());
    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for tool in registry.iter() {
        let description = if tool.description().is_empty() {
            "(no description)".dimmed().to_string()
        } else {
            tool.description().to_string()
        };
        let padded = format!("{:<width$}", tool.name(), width = width);
        print!("  {}  {}", padded.green(), description);
        if !tool.dependencies().is_empty() {
            print!(" {}", format!("[{} deps]", tool.dependencies().len()).dimmed());
        }
        println!();
    }
    Ok(0)
}

async fn handle_run_command(toolbox: &Toolbox, name: &str, args: &[OsString]) -> Result<i32> {
    let outcome = toolbox.run(name, args).await?;
    let code = outcome.exit_code();

    if let Some(err) = outcome.blocking_error() {
        return Err(err.into());
    }

    info!("Tool {} finished with exit code {}", name, code);
    Ok(code)
}

async fn handle_install_command(toolbox: &Toolbox, name: &str) -> Result<i32> {
    let report = toolbox.install(name).await?;

    if report.already_satisfied.is_empty() && report.installed.is_empty() && report.failed.is_empty() {
        println!("{} {} has no dependencies", "Nothing to install:".green(), name);
        return Ok(0);
    }

    for requirement in &report.already_satisfied {
        println!("  {} {} (already satisfied)", "✓".green(), requirement);
    }
    for requirement in &report.installed {
        println!("  {} {} (installed)", "+".green(), requirement);
    }
    for (requirement, reason) in &report.failed {
        println!("  {} {}: {}", "✗".red(), requirement, reason);
    }

    let report = report.into_result()?;
    if report.installed.is_empty() {
        println!("{} all dependencies of {} are already satisfied", "Done:".green(), name);
    } else {
        println!("{} installed {} package(s) for {}", "Done:".green(), report.installed.len(), name);
    }
    Ok(0)
}

fn handle_new_command(toolbox: &Toolbox, name: &str) -> Result<i32> {
    let created = toolbox.create(name)?;

    println!("{} {}", "Created tool:".green(), name);
    println!("  {} {}", "Entry:".cyan(), created.entry.display());
    println!("  {} {}", "Manifest:".cyan(), created.manifest.display());
    println!("  Run it with: {} run {}", env!("CARGO_PKG_NAME"), name);
    Ok(0)
}

async fn handle_deps_command(toolbox: &Toolbox, name: &str) -> Result<i32> {
    let report = toolbox.check(name).await?;

    if report.checks.is_empty() {
        println!("{} declares no dependencies", name.green());
        return Ok(0);
    }

    println!("{} {}", "Dependencies for".bold(), name.bold());
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Satisfied { .. } => "✓".green(),
            CheckStatus::Missing => "✗".red(),
            CheckStatus::VersionMismatch { .. } => "!".yellow(),
        };
        println!("  {} {}", marker, check);
    }

    if report.is_satisfied() {
        return Ok(0);
    }
    println!("{}", install_hint(name).yellow());
    Ok(EXIT_DEPENDENCY_UNSATISFIED)
}

async fn handle_check_command(toolbox: &Toolbox, fix: bool) -> Result<i32> {
    if toolbox.config().check.linters.is_empty() {
        println!("{}", "No linters configured".yellow());
        return Ok(0);
    }

    let report = toolbox.lint(fix).await?;
    for result in &report.results {
        let marker = if result.passed { "✓".green() } else { "✗".red() };
        println!("  {} {}", marker, result);
    }

    if report.passed() {
        println!("{}", "All checks passed".green());
        return Ok(0);
    }
    let failed: Vec<&str> = report.failed().iter().map(|r| r.name.as_str()).collect();
    println!("{} {}", "Issues found by:".red(), failed.join(", "));
    if !fix {
        println!("  Try: {} check --fix", env!("CARGO_PKG_NAME"));
    }
    Ok(EXIT_FAILURE)
}

async fn handle_doctor_command(toolbox: &Toolbox) -> Result<i32> {
    let report = toolbox.doctor().await;

    for check in &report.checks {
        let marker = if check.passed { "✓".green() } else { "✗".red() };
        println!("  {} {}", marker, check);
    }

    if report.passed() {
        println!("{}", "Everything looks good".green());
        Ok(0)
    } else {
        println!("{}", "Some checks failed".red());
        Ok(EXIT_FAILURE)
    }
}

fn report_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ToolboxError>() {
        Some(toolbox_err) => {
            eprintln!("{} {}", "Error:".red().bold(), toolbox_err);
            if let Some(hint) = toolbox_err.hint() {
                eprintln!("{}", hint.yellow());
            }
            toolbox_err.exit_code()
        }
        None => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            EXIT_FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<i32> {
    // Load configuration
    let config = Config::load(cli.config.as_ref())
        .context("Failed to load configuration")?
        .with_tools_root(cli.root.clone());
    config.validate().context("Invalid configuration")?;
    apply_log_level(cli, &config);

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(cli, config).await
}

#[tokio::main]
async fn main() {
    // Setup logging first; a broken log file must not stop the tools
    if let Err(e) = setup_logging() {
        eprintln!("{} {:#}", "Warning:".yellow(), e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            report_error(&e)
        }
    };

    std::process::exit(code);
}
