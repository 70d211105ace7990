use crate::errors::CliError;
use crate::println_pad;
use camino::Utf8Path;
use colored::Colorize;
use icarus_modpkg::ModPackage;
use icarus_overlay::ZipArchiveFormat;
use miette::{IntoDiagnostic, Result};
use serde_json::to_string_pretty;

pub struct InfoModPackageArgs {
    pub file_path: String,
}

pub fn info_mod_package(args: InfoModPackageArgs) -> Result<()> {
    let file_path = Utf8Path::new(&args.file_path);
    if !file_path.exists() {
        return Err(CliError::FileNotFound {
            path: file_path.to_path_buf(),
        }
        .into());
    }

    let package = ModPackage::load(file_path, &ZipArchiveFormat)
        .map_err(|e| CliError::mod_load_failed(file_path.to_path_buf(), e))?;
    let info = &package.info;

    println_pad!(
        "{} {}",
        "📦 Mod:".bright_blue().bold(),
        info.name.bright_cyan().bold()
    );
    println_pad!("{} {}", "🆔 Id:".bright_green(), info.id.bright_white());
    println_pad!(
        "{} {}",
        "🏷️ Version:".bright_green(),
        info.version.as_deref().unwrap_or("Unknown").bright_white().bold()
    );
    println_pad!(
        "{} {}",
        "👤 Author:".bright_green(),
        info.author.as_deref().unwrap_or("Unknown").bright_white()
    );
    println_pad!(
        "{} {}",
        "📝 Description:".bright_yellow(),
        info.description
            .as_deref()
            .unwrap_or("No description")
            .bright_white()
    );
    if let Some(web) = &info.web {
        println_pad!("{} {}", "🌐 Web:".bright_yellow(), web.bright_white());
    }

    println_pad!("\n{}", "🩹 Patches:".bright_magenta().bold());
    for patch in &package.patch_files {
        println_pad!(
            "   {} {} {}",
            "•".bright_cyan(),
            patch.target_path.bright_cyan(),
            format!("({})", patch.kind()).dimmed()
        );
    }

    println_pad!("\n{}", "🗃️  Archives:".bright_magenta().bold());
    for archive in &package.archives {
        println_pad!(
            "   {} {} {}",
            "•".bright_cyan(),
            archive.name.bright_cyan().bold(),
            format!("({} bytes)", archive.data.len()).dimmed()
        );
    }
    println_pad!(
        "   {} files overridden",
        package.overrides.len().to_string().bright_white()
    );

    for warning in &package.warnings {
        println_pad!("{} {}", "⚠".bright_yellow(), warning.yellow());
    }

    println_pad!("\n{}", "🧾 Full metadata (JSON):".bright_magenta().bold());
    println_pad!("{}", to_string_pretty(info).into_diagnostic()?);

    Ok(())
}
