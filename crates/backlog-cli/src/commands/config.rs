use crate::app::AppContext;
use anyhow::{Context, Result};

pub fn init(app: &AppContext) -> Result<()> {
    let path = app.config_service.path();
    if app.config_service.write_default_if_missing()? {
        println!("Wrote default configuration to {}", path.display());
    } else {
        println!("Configuration already exists at {}", path.display());
    }
    Ok(())
}

pub fn show(app: &AppContext) -> Result<()> {
    let config = app.config()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("# {}", app.config_service.path().display());
    print!("{}", rendered);
    Ok(())
}
