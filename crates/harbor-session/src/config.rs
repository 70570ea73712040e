use std::path::PathBuf;

/// Service-level defaults applied when a prompt request leaves a field
/// unset.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub default_model: String,
    pub default_max_turns: u32,
    pub default_max_budget_usd: f64,
    pub workspace_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_model: "sonnet".to_string(),
            default_max_turns: 10,
            default_max_budget_usd: 1.0,
            workspace_dir: PathBuf::from("/workspace"),
        }
    }
}

impl ServiceConfig {
    /// Reads `HARBOR_MODEL`, `HARBOR_MAX_TURNS`, `HARBOR_MAX_BUDGET_USD`,
    /// and `WORKSPACE_DIR`, falling back to the defaults on absent or
    /// unparseable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_model: std::env::var("HARBOR_MODEL").unwrap_or(defaults.default_model),
            default_max_turns: std::env::var("HARBOR_MAX_TURNS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.default_max_turns),
            default_max_budget_usd: std::env::var("HARBOR_MAX_BUDGET_USD")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.default_max_budget_usd),
            workspace_dir: std::env::var("WORKSPACE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_baseline() {
        let config = ServiceConfig::default();
        assert_eq!(config.default_model, "sonnet");
        assert_eq!(config.default_max_turns, 10);
        assert_eq!(config.default_max_budget_usd, 1.0);
        assert_eq!(config.workspace_dir, PathBuf::from("/workspace"));
    }
}
