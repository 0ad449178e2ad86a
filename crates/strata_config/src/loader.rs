//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::StrataConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads and validates `<project_dir>/strata.toml`.
pub fn load_config(project_dir: &Path) -> Result<StrataConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<StrataConfig, ConfigError> {
    let config: StrataConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks value ranges that the types alone cannot express.
pub fn validate_config(config: &StrataConfig) -> Result<(), ConfigError> {
    let placer = &config.placer;
    if !(0.0..=1.0).contains(&placer.timing_tradeoff) {
        return Err(ConfigError::invalid(
            "placer.timing_tradeoff",
            "must be within [0, 1]",
        ));
    }
    if placer.inner_num <= 0.0 {
        return Err(ConfigError::invalid("placer.inner_num", "must be positive"));
    }
    if placer.moves_per_temperature == Some(0) {
        return Err(ConfigError::invalid(
            "placer.moves_per_temperature",
            "must be at least 1",
        ));
    }
    if placer.init_t_scale < 0.0 {
        return Err(ConfigError::invalid("placer.init_t_scale", "must not be negative"));
    }
    if placer.initial_temperature.is_some_and(|t| t < 0.0 || !t.is_finite()) {
        return Err(ConfigError::invalid(
            "placer.initial_temperature",
            "must be a finite, non-negative temperature",
        ));
    }
    if placer.exit_t <= 0.0 {
        return Err(ConfigError::invalid("placer.exit_t", "must be positive"));
    }
    if placer.check_every == 0 {
        return Err(ConfigError::invalid("placer.check_every", "must be at least 1"));
    }
    if placer.recompute_crit_every == 0 {
        return Err(ConfigError::invalid(
            "placer.recompute_crit_every",
            "must be at least 1",
        ));
    }
    if placer.cost_tolerance <= 0.0 {
        return Err(ConfigError::invalid("placer.cost_tolerance", "must be positive"));
    }
    if placer.td_place_exp_first < 0.0 || placer.td_place_exp_last < 0.0 {
        return Err(ConfigError::invalid(
            "placer.td_place_exp_first",
            "criticality exponents must not be negative",
        ));
    }
    if !(0.0..=1.0).contains(&placer.crit_limit) {
        return Err(ConfigError::invalid("placer.crit_limit", "must be within [0, 1]"));
    }
    if placer.target_period_ns.is_some_and(|p| p <= 0.0) {
        return Err(ConfigError::invalid("placer.target_period_ns", "must be positive"));
    }
    if placer.layer_weight < 0.0 {
        return Err(ConfigError::invalid("placer.layer_weight", "must not be negative"));
    }

    let analytical = &config.analytical;
    if analytical.anchor_coeff < 0.0 {
        return Err(ConfigError::invalid(
            "analytical.anchor_coeff",
            "must not be negative",
        ));
    }
    if analytical.anchor_decay <= 0.0 {
        return Err(ConfigError::invalid("analytical.anchor_decay", "must be positive"));
    }
    if analytical.cg_tolerance <= 0.0 {
        return Err(ConfigError::invalid("analytical.cg_tolerance", "must be positive"));
    }
    if analytical.cg_max_iterations == Some(0) {
        return Err(ConfigError::invalid(
            "analytical.cg_max_iterations",
            "must be at least 1",
        ));
    }

    let noc = &config.noc;
    let weights = [
        ("noc.placement_weighting", noc.placement_weighting),
        ("noc.aggregate_bandwidth_weighting", noc.aggregate_bandwidth_weighting),
        ("noc.latency_constraints_weighting", noc.latency_constraints_weighting),
        ("noc.latency_weighting", noc.latency_weighting),
        ("noc.congestion_weighting", noc.congestion_weighting),
    ];
    for (field, value) in weights {
        if value < 0.0 {
            return Err(ConfigError::invalid(field, "must not be negative"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MoveGeneratorKind, NocRoutingAlgorithm, PlaceAlgorithm};

    #[test]
    fn empty_file_is_default() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, StrataConfig::default());
        assert_eq!(config.placer.algorithm, PlaceAlgorithm::TimingDriven);
        assert!(!config.analytical.enabled);
        assert!(!config.noc.enabled);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[placer]
seed = 42
algorithm = "bounding_box"
timing_tradeoff = 0.3
inner_num = 1.0
moves_per_temperature = 200
initial_temperature = 5.0
max_temperatures = 50
check_every = 2
move_generator = "inter_layer"
target_period_ns = 4.0

[analytical]
enabled = true
iterations = 8
anchor_coeff = 0.02
anchor_decay = 4.0
cg_max_iterations = 500
accumulate_anchors = true

[noc]
enabled = true
placement_weighting = 1.5
routing = "shortest_path"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.placer.seed, 42);
        assert_eq!(config.placer.algorithm, PlaceAlgorithm::BoundingBox);
        assert_eq!(config.placer.moves_per_temperature, Some(200));
        assert_eq!(config.placer.move_generator, MoveGeneratorKind::InterLayer);
        assert_eq!(config.placer.target_period_ns, Some(4.0));
        assert!(config.analytical.enabled);
        assert_eq!(config.analytical.iterations, 8);
        assert_eq!(config.analytical.cg_max_iterations, Some(500));
        assert!(config.analytical.accumulate_anchors);
        assert!(config.noc.enabled);
        assert_eq!(config.noc.routing, NocRoutingAlgorithm::ShortestPath);
        // Unspecified fields keep their defaults.
        assert_eq!(config.placer.cost_tolerance, 0.01);
    }

    #[test]
    fn unknown_field_is_parse_error() {
        let err = load_config_from_str("[placer]\nsed = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not toml {{{").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn tradeoff_out_of_range() {
        let err = load_config_from_str("[placer]\ntiming_tradeoff = 1.5\n").unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "placer.timing_tradeoff")
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn zero_decay_rejected() {
        let err = load_config_from_str("[analytical]\nanchor_decay = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn negative_noc_weight_rejected() {
        let err = load_config_from_str("[noc]\ncongestion_weighting = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[placer]\nseed = 9\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.placer.seed, 9);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
