use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    info_mod_package, install_mods, uninstall_mods, InfoModPackageArgs, InstallModsArgs,
    UninstallModsArgs,
};
use miette::Result;
use tracing_subscriber::EnvFilter;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Show debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install mods into the game
    ///
    /// Exits with a non-zero code if the install fails or any file could not be patched.
    Install {
        /// Directory holding the extracted game files
        #[arg(short, long)]
        source_dir: Option<String>,

        /// The directory to write the overlays to (the game's Paks/mods directory)
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Mod files in priority order, lowest first. Defaults to the configured mod list
        mods: Vec<String>,
    },
    /// Remove all installed mods
    Uninstall {
        /// The directory mods were installed to
        #[arg(short, long)]
        output_dir: Option<String>,
    },
    /// Show information about a mod package
    Info {
        /// The path to the mod file (.zip or .pak)
        #[arg(short, long)]
        file_path: String,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "icarus_mod={0},icarus_overlay={0},icarus_modpkg={0}",
            default_level
        )
        .into()
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = parse_args();
    init_logging(args.verbose);

    match args.command {
        Commands::Install {
            source_dir,
            output_dir,
            mods,
        } => install_mods(InstallModsArgs {
            source_dir,
            output_dir,
            mods,
        }),
        Commands::Uninstall { output_dir } => uninstall_mods(UninstallModsArgs { output_dir }),
        Commands::Info { file_path } => info_mod_package(InfoModPackageArgs { file_path }),
    }
}
