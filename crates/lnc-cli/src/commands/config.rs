use crate::{print_error, print_info, print_success, ConfigCommands};
use colored::*;
use lnc_core::ConsoleConfig;
use std::path::Path;

pub fn handle(
    action: ConfigCommands,
    config: &ConsoleConfig,
    config_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigCommands::Init { force } => init(config, config_dir, force),
        ConfigCommands::Show => show(config, config_dir),
    }
}

fn init(
    config: &ConsoleConfig,
    config_dir: &Path,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = ConsoleConfig::path_in(config_dir);
    if path.exists() && !force {
        print_error(&format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
        return Ok(());
    }
    config.save_to_file(&path)?;
    print_success(&format!("Config written to {}", path.display()));
    Ok(())
}

fn show(config: &ConsoleConfig, config_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let path = ConsoleConfig::path_in(config_dir);
    if path.exists() {
        print_info(&format!("Loaded from {}", path.display()));
    } else {
        print_info(&format!("No config file at {}, using defaults", path.display()));
    }
    println!();
    println!("{}", "═══ EFFECTIVE CONFIG ═══".cyan().bold());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConsoleConfig::default();
        config.default_node = "http://first:5000".to_string();
        init(&config, dir.path(), false).unwrap();

        config.default_node = "http://second:5000".to_string();
        init(&config, dir.path(), false).unwrap();
        let on_disk = ConsoleConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(on_disk.default_node, "http://first:5000");

        init(&config, dir.path(), true).unwrap();
        let on_disk = ConsoleConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(on_disk.default_node, "http://second:5000");
    }
}
