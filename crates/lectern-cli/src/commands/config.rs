use anyhow::{Context, Result};
use lectern_ingest::{config, Config};
use toml_edit::{value, DocumentMut, Item};

const NUMERIC_KEYS: &[&str] = &["chunk_size", "chunk_overlap", "max_results"];

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    for key in config::KEYS {
        println!("  {}: {}", key, config.get(key)?);
    }
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: CLI args > ENV vars (LECTERN_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value.
pub fn get_config(key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load()?;
        println!("{}", config.get(&key)?);
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'lectern config init' to create it.");
        }
    }

    Ok(())
}

/// Apply `key = value` to a config document, keeping its comments and layout.
///
/// `logging.<field>` keys write into the `[logging]` table.
fn set_in_document(doc: &mut DocumentMut, key: &str, raw: &str) -> Result<()> {
    if let Some(field) = key.strip_prefix("logging.") {
        let item = match raw {
            "true" => value(true),
            "false" => value(false),
            _ => value(raw),
        };
        doc["logging"][field] = item;
        return Ok(());
    }

    if !config::KEYS.contains(&key) {
        anyhow::bail!(
            "Unknown config key: {}\n\nValid keys: {}, logging.<field>",
            key,
            config::KEYS.join(", ")
        );
    }

    let item: Item = if NUMERIC_KEYS.contains(&key) {
        let number: i64 = raw
            .parse()
            .with_context(|| format!("{key} must be a whole number, got '{raw}'"))?;
        if number < 0 {
            anyhow::bail!("{key} must not be negative");
        }
        value(number)
    } else {
        value(raw)
    };
    doc[key] = item;
    Ok(())
}

/// Set a config value.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let config_path = config::config_file_path();

    config::ensure_config_file()?;

    let original = std::fs::read_to_string(&config_path)
        .context("Failed to read config file")?;
    let mut doc: DocumentMut = original
        .parse()
        .context("Failed to parse config file")?;

    set_in_document(&mut doc, key, value)?;

    std::fs::write(&config_path, doc.to_string())
        .context("Failed to write config file")?;

    // Keep the old file if the new value makes the configuration unusable.
    if let Err(e) = Config::load() {
        std::fs::write(&config_path, original)
            .context("Failed to restore config file")?;
        return Err(e.context(format!("Rejected {key} = {value}")));
    }

    println!("✓ Updated {} = {}", key, value);
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    let config_path = config::config_file_path();
    println!("{}", config_path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure lectern.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
