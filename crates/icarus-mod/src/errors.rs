use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("No {setting} configured")]
    #[diagnostic(
        code(config::missing_setting),
        help("Pass --{flag} or set '{setting}' in config.toml next to the executable")
    )]
    MissingSetting { setting: String, flag: String },

    #[error("Game data directory not found: {path}")]
    #[diagnostic(
        code(config::source_dir_missing),
        help("The source directory must contain the extracted game files (Icarus/Content/...)")
    )]
    SourceDirNotFound { path: Utf8PathBuf },

    #[error("File not found: {path}")]
    #[diagnostic(
        code(file::not_found),
        help("Make sure the file exists and the path is correct")
    )]
    FileNotFound { path: Utf8PathBuf },

    #[error("Failed to load mod {path}")]
    #[diagnostic(
        code(mod_package::load_failed),
        help("Mods must be .zip packages or raw .pak files")
    )]
    ModLoadFailed {
        path: Utf8PathBuf,
        #[source]
        source: icarus_modpkg::Error,
    },

    #[error("An error occurred while attempting to install mods")]
    #[diagnostic(code(install::failed))]
    InstallFailed {
        #[source]
        source: icarus_overlay::Error,
    },

    #[error("An error occurred while attempting to uninstall mods")]
    #[diagnostic(code(uninstall::failed))]
    UninstallFailed {
        #[source]
        source: icarus_overlay::Error,
    },

    #[error("{count} file(s) could not be patched")]
    #[diagnostic(
        code(install::integration_failed),
        help("The remaining mods were installed. Check the errors above for the mods involved")
    )]
    IntegrationFailed { count: usize },
}

impl CliError {
    pub fn missing_setting(setting: &str, flag: &str) -> Self {
        Self::MissingSetting {
            setting: setting.to_string(),
            flag: flag.to_string(),
        }
    }

    pub fn mod_load_failed(path: Utf8PathBuf, source: icarus_modpkg::Error) -> Self {
        Self::ModLoadFailed { path, source }
    }
}
