use args_to_schema::{
    commands::{
        config::{self, ConfigAction},
        migrate::{self, MigrateArgs},
    },
    logger, GlobalOpts,
};
use argschema_config::Config;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "args-to-schema")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Migrate Appium driver argsConstraints to a JSON Schema",
    long_about = "args-to-schema reads the argsConstraints of an Appium driver's main class and \
                  writes the equivalent JSON Schema to appium.schema in the driver's package.json."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(flatten)]
    migrate: MigrateArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure args-to-schema
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn main() {
    let cli = Cli::parse();

    args_to_schema::common::init_tracing(&cli.global);

    let log_dir = if cli.global.no_log_file {
        None
    } else {
        Config::dir().ok()
    };
    if let Err(e) = logger::init(cli.global.verbosity_level(), log_dir.as_deref()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    match cli.command {
        Some(Commands::Config { action }) => {
            if let Err(e) = config::handle_config(action, &cli.global) {
                logger::error(&e.to_string());
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = migrate::handle_migrate(&cli.migrate) {
                if e.is_usage() {
                    logger::plain(&e.to_string());
                } else {
                    logger::error(&e.to_string());
                }
                std::process::exit(1);
            }
        }
    }
}
