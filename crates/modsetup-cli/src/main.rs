use clap::{Parser, Subcommand};
use modsetup::{
    commands::{
        check::{self, CheckCommand},
        config::{self, ConfigAction},
        derive::{self, DeriveCommand},
        parse_line::{self, ParseLineCommand},
    },
    init_tracing, logger, GlobalOpts,
};

#[derive(Parser)]
#[command(name = "modsetup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Static extension module recipes for CPython builds",
    long_about = "modsetup reconciles extension module metadata with a CPython source \
                  distribution and derives the Setup.local that builds every module statically."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive Setup.local and Makefile overrides for one or more targets
    Derive(DeriveCommand),
    /// Check metadata against the distribution without writing anything
    Check(CheckCommand),
    /// Show how a single Setup line is interpreted
    ParseLine(ParseLineCommand),
    /// Configure modsetup defaults
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let result = match cli.command {
        Commands::Derive(cmd) => derive::handle_derive(cmd, &cli.global),
        Commands::Check(cmd) => check::handle_check(cmd, &cli.global),
        Commands::ParseLine(cmd) => parse_line::handle_parse_line(cmd),
        Commands::Config { action } => config::handle_config(action, &cli.global),
    };

    if let Err(e) = result {
        logger::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
