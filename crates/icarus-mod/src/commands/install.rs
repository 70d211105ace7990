use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::{load_config, ModEntry};
use camino::Utf8PathBuf;
use colored::Colorize;
use icarus_modpkg::ModPackage;
use icarus_overlay::{DirSourceStore, OverlayBuilder, ZipArchiveFormat};
use miette::Result;

pub struct InstallModsArgs {
    pub source_dir: Option<String>,
    pub output_dir: Option<String>,
    /// Mod files, lowest priority first. Empty means the configured list.
    pub mods: Vec<String>,
}

pub fn install_mods(args: InstallModsArgs) -> Result<()> {
    let config = load_config();

    let source_dir = args
        .source_dir
        .map(Utf8PathBuf::from)
        .or(config.source_dir)
        .ok_or_else(|| CliError::missing_setting("source_dir", "source-dir"))?;
    let output_dir = args
        .output_dir
        .map(Utf8PathBuf::from)
        .or(config.output_dir)
        .ok_or_else(|| CliError::missing_setting("output_dir", "output-dir"))?;
    let entries: Vec<ModEntry> = if args.mods.is_empty() {
        config.mods
    } else {
        args.mods.into_iter().map(ModEntry::enabled).collect()
    };

    if !source_dir.is_dir() {
        return Err(CliError::SourceDirNotFound { path: source_dir }.into());
    }

    println_pad!(
        "{} {}",
        "🔍 Indexing game files in".bright_blue().bold(),
        source_dir.as_str().bright_cyan()
    );
    let source = DirSourceStore::build(&source_dir)
        .map_err(|source| CliError::InstallFailed { source })?;
    println_pad!("   {} files indexed", source.len().to_string().bright_white());

    let mut mods = Vec::with_capacity(entries.len());
    for (priority, entry) in entries.iter().enumerate() {
        if !entry.path.exists() {
            return Err(CliError::FileNotFound {
                path: entry.path.clone(),
            }
            .into());
        }
        let package = ModPackage::load(&entry.path, &ZipArchiveFormat)
            .map_err(|e| CliError::mod_load_failed(entry.path.clone(), e))?;

        let state = if entry.enabled {
            "enabled".bright_green()
        } else {
            "disabled".dimmed()
        };
        println_pad!(
            "   {} {} {} {}",
            "•".bright_cyan(),
            package.info.name.bright_cyan().bold(),
            format!("(priority: {})", priority).dimmed(),
            state
        );
        for warning in &package.warnings {
            println_pad!("     {} {}", "⚠".bright_yellow(), warning.yellow());
        }

        mods.push(package.into_descriptor(priority, entry.enabled));
    }

    println_pad!(
        "{} {}",
        "📦 Installing mods to".bright_blue().bold(),
        output_dir.as_str().bright_cyan()
    );

    let mut builder = OverlayBuilder::new(Box::new(source), output_dir).with_progress(|progress| {
        tracing::debug!(
            stage = ?progress.stage,
            current = progress.current,
            total = progress.total,
            "{}",
            progress.current_file.as_deref().unwrap_or("")
        );
    });
    builder.set_mods(mods);

    let report = builder
        .build()
        .map_err(|source| CliError::InstallFailed { source })?;

    for warning in &report.warnings {
        println_pad!("{} {}", "⚠".bright_yellow(), warning.yellow());
    }
    for failure in &report.failures {
        println_pad!(
            "{} {}: {}",
            "✗".bright_red(),
            failure.path.bright_white(),
            failure.error.to_string().red()
        );
    }

    println_pad!(
        "{} {} data files, {} assets, {} archives in {:.2?}",
        "📝 Patched".bright_green(),
        report.data_entries.len(),
        report.asset_entries.len(),
        report.passthrough_archives.len(),
        report.build_time
    );

    if !report.is_success() {
        return Err(CliError::IntegrationFailed {
            count: report.failures.len(),
        }
        .into());
    }

    println_pad!("{}", "✅ Mods installed".bright_green().bold());
    Ok(())
}
