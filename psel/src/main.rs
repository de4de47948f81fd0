//! psel: Profile selector - CLI for building profile queries and time ranges.

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "psel")]
#[command(about = "Profile selector - build profile queries and resolve time ranges")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config.toml under PSEL_ROOT
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Parse a query expression and print its canonical form
    #[command(visible_alias = "p")]
    Parse {
        /// Query expression (e.g., process_cpu{job="api"})
        expression: String,

        /// Fail on malformed input instead of recovering
        #[arg(short = 's', long = "strict")]
        strict: bool,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Replace the profile type of a query expression
    SetProfile {
        expression: String,

        name: String,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Set an equality matcher on a query expression
    SetMatcher {
        expression: String,

        label: String,

        value: String,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Resolve a time selection to absolute bounds
    #[command(visible_alias = "t")]
    Range {
        /// Time selection key (default: from config)
        #[arg(conflicts_with = "from")]
        selection: Option<String>,

        /// Explicit start (Unix ms or RFC 3339); selects custom
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Explicit end (Unix ms or RFC 3339); selects custom
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// List relative time presets
    Presets,

    /// List known profile types
    Profiles {
        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Drive a selector with actions read from stdin, one per line
    #[command(visible_alias = "s")]
    Session {
        /// Pin every query to this profile type (overrides config)
        #[arg(short = 'e', long = "enforce")]
        enforce: Option<String>,

        /// Initial time selection (overrides config)
        #[arg(short = 't', long = "time")]
        time: Option<String>,

        /// Resume from a previously emitted selection (JSON)
        #[arg(short = 'r', long = "resume", conflicts_with = "time")]
        resume: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PSEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init { force } => commands::init(force),
        Commands::Parse { expression, strict, format } => commands::parse(&expression, strict, &format),
        Commands::SetProfile { expression, name, format } => {
            commands::set_profile(&expression, &name, &format)
        }
        Commands::SetMatcher { expression, label, value, format } => {
            commands::set_matcher(&expression, &label, &value, &format)
        }
        Commands::Range { selection, from, to, format } => {
            commands::range(selection.as_deref(), from.as_deref(), to.as_deref(), &format)
        }
        Commands::Presets => commands::presets(),
        Commands::Profiles { format } => commands::profiles(&format),
        Commands::Session { enforce, time, resume } => {
            commands::session(enforce.as_deref(), time.as_deref(), resume.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
