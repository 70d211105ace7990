use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

pub struct UninstallModsArgs {
    pub output_dir: Option<String>,
}

pub fn uninstall_mods(args: UninstallModsArgs) -> Result<()> {
    let output_dir = args
        .output_dir
        .map(Utf8PathBuf::from)
        .or(load_config().output_dir)
        .ok_or_else(|| CliError::missing_setting("output_dir", "output-dir"))?;

    println_pad!(
        "{} {}",
        "🧹 Uninstalling mods from".bright_blue().bold(),
        output_dir.as_str().bright_cyan()
    );
    icarus_overlay::uninstall(&output_dir).map_err(|source| CliError::UninstallFailed { source })?;

    println_pad!("{}", "✅ Mods uninstalled".bright_green().bold());
    Ok(())
}
