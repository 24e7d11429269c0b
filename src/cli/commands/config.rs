//! Implementation of the `issue-tracker config` command.

use anyhow::{Context, Result};

use crate::domain::models::Config;

/// Render the resolved configuration as YAML.
pub fn render(config: &Config) -> Result<String> {
    serde_yaml::to_string(config).context("Failed to serialize configuration")
}

pub fn execute(config: &Config) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_round_trips() {
        let config = Config::default();
        let yaml = render(&config).unwrap();
        assert!(yaml.contains("port: 3000"));
        assert!(yaml.contains("backend: sqlite"));

        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
