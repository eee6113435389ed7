// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use warden_cli::commands::{self, EnforceReport};
use warden_config::{EngineSettings, load_settings};

/// Exit code of `enforce` for a denied request.
const EXIT_DENY: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Warden authorization engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine settings file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decide one request. Exits 0 on allow and 2 on deny.
    Enforce {
        /// Model definition file.
        #[arg(long)]
        model: PathBuf,

        /// Policy file.
        #[arg(long)]
        policy: PathBuf,

        /// Print the rule that decided.
        #[arg(long)]
        explain: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Request fields in model order. Fields starting with `{` or `[`
        /// are parsed as JSON.
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// List the roles of a user.
    Roles {
        /// Model definition file.
        #[arg(long)]
        model: PathBuf,

        /// Policy file.
        #[arg(long)]
        policy: PathBuf,

        /// Restrict to one domain.
        #[arg(long)]
        domain: Option<String>,

        /// Follow role inheritance.
        #[arg(long)]
        implicit: bool,

        /// User name.
        user: String,
    },

    /// Print the normalised model text.
    Model {
        /// Model definition file.
        #[arg(long)]
        model: PathBuf,
    },

    /// Print the JSON schema of the settings file.
    Schema,
}

fn init_tracing(debug: bool, settings: &EngineSettings) {
    let filter = if debug {
        EnvFilter::new("warden=debug")
    } else if let Some(level) = &settings.log_level {
        EnvFilter::new(format!("warden={level}"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &EnforceReport, explain: bool, json: bool) -> Result<()> {
    if json {
        let mut report = report.clone();
        if !explain {
            report.explain = None;
        }
        println!("{}", serde_json::to_string(&report).context("serialize report")?);
    } else if explain {
        println!("{}", commands::render_text(report));
    } else {
        println!("{}", if report.allowed { "allow" } else { "deny" });
    }
    Ok(())
}

fn run(cli: Cli, settings: EngineSettings) -> Result<ExitCode> {
    match cli.command {
        Commands::Enforce {
            model,
            policy,
            explain,
            json,
            fields,
        } => {
            let report = commands::enforce(&model, &policy, &fields, &settings)?;
            print_report(&report, explain, json)?;
            Ok(if report.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_DENY)
            })
        }
        Commands::Roles {
            model,
            policy,
            domain,
            implicit,
            user,
        } => {
            let roles =
                commands::roles(&model, &policy, &user, domain.as_deref(), implicit, &settings)?;
            for role in roles {
                println!("{role}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Model { model } => {
            print!("{}", commands::model_text(&model)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema => {
            println!("{}", commands::settings_schema()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cli.debug, &settings);

    match run(cli, settings) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
