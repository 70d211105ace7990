mod info;
mod install;
mod uninstall;

pub use info::{info_mod_package, InfoModPackageArgs};
pub use install::{install_mods, InstallModsArgs};
pub use uninstall::{uninstall_mods, UninstallModsArgs};
