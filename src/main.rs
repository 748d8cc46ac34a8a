//! Taggo CLI application entry point
//!
//! Builds a mirror tree of relative symlinks grouped by the `#tags` found in
//! file and folder names.
//!
//! # Usage
//!
//! ```bash
//! # Link every tagged file below ~/pictures into ~/tags
//! taggo run ~/pictures ~/tags
//!
//! # Custom link names, only jpgs, see what would happen first
//! taggo run ~/pictures ~/tags --symlink-name "{tag.name}/{path.basename}" \
//!     --filter path.ext__iin=jpg,jpeg --dry
//!
//! # Remove dead links
//! taggo cleanup ~/tags
//!
//! # Rename #trip to #journey everywhere
//! taggo rename ~/pictures trip journey
//!
//! # Which tags are in use?
//! taggo info ~/pictures
//! ```
//!
//! # Exit status
//!
//! `2` for generic errors, `3` for a template key that does not exist, `4`
//! when the destination or a link folder is not a directory and `20` when
//! `bail-if-different` stops the run.

use std::process;

use taggo::{
    Result, TaggoError,
    cli::{Cli, Commands, ConfigCommands},
    commands::{self, RunOptions},
    config::TaggoConfig,
    output,
    tags::TagSyntax,
    walk::WalkPolicy,
};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse_args();
    init_logging(&cli);

    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(e.exit_code());
    }
}

/// Install the tracing subscriber: compact lines on stderr, or JSON with `--json`
fn init_logging(cli: &Cli) {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let compact = (!cli.json).then(|| {
        fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
    });
    let json = cli
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(compact)
        .with(json)
        .init();
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = TaggoConfig::load()?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Run(args) => {
            let options = RunOptions::from_args(&args, &config)?;
            let summary = commands::run(&args.src, &args.dst, &options)?;
            if !quiet {
                println!("{}", output::run_summary(&summary, options.dry_run));
            }
        }
        Commands::Cleanup { dst, dry } => {
            let summary = commands::cleanup(&dst, dry)?;
            print_lines(&output::cleanup_summary(&summary, dry, quiet));
        }
        Commands::Rename {
            src,
            original,
            new,
            dry,
        } => {
            let syntax = TagSyntax::new(config.tag_char)?;
            let summary = commands::rename(&src, &original, &new, &syntax, dry)?;
            print_lines(&output::rename_summary(&summary, dry, quiet));
        }
        Commands::Info { src } => {
            let syntax = TagSyntax::new(config.tag_char)?;
            let policy = WalkPolicy {
                skip_hidden: config.skip_hidden,
                exclude: None,
            };
            let inventory = commands::info(&src, &syntax, policy)?;
            print_lines(&output::inventory(&inventory, quiet));
        }
        Commands::Config { command } => handle_config_command(command, &config, quiet)?,
    }
    Ok(())
}

fn handle_config_command(command: ConfigCommands, config: &TaggoConfig, quiet: bool) -> Result<()> {
    match command {
        ConfigCommands::Init { force } => {
            let path = TaggoConfig::config_path()?;
            if path.exists() && !force {
                return Err(TaggoError::InvalidInput(format!(
                    "Config file already exists at {}, use --force to overwrite",
                    path.display()
                )));
            }
            TaggoConfig::default().save_to(&path)?;
            if !quiet {
                println!("Wrote default configuration to {}", path.display());
            }
        }
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
