use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::search::SearchPolicy;
use crate::solver::HeuristicSolver;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("PACK_IT_IN_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse PACK_IT_IN_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("PACK_IT_IN_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ PACK_IT_IN_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse PACK_IT_IN_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the estimation engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    policy: SearchPolicy,
    grid_step: f64,
}

impl EngineConfig {
    const BUDGET_MIN_VAR: &'static str = "PACK_IT_IN_BUDGET_MIN";
    const BUDGET_MAX_VAR: &'static str = "PACK_IT_IN_BUDGET_MAX";
    const LARGE_GRID_THRESHOLD_VAR: &'static str = "PACK_IT_IN_LARGE_GRID_THRESHOLD";
    const LARGE_GRID_CAP_VAR: &'static str = "PACK_IT_IN_LARGE_GRID_CAP";
    const EARLY_EXIT_RATIO_VAR: &'static str = "PACK_IT_IN_EARLY_EXIT_RATIO";
    const TRIAL_THREADS_VAR: &'static str = "PACK_IT_IN_TRIAL_THREADS";
    const GRID_STEP_VAR: &'static str = "PACK_IT_IN_SOLVER_GRID_STEP";

    fn from_env() -> Self {
        let budget_min = load_usize_with_warning(
            Self::BUDGET_MIN_VAR,
            SearchPolicy::DEFAULT_BUDGET_MIN,
            |value| value >= 1,
            "must be at least 1",
            "Warning: Adjusted item budget floor may change estimate quality",
        );

        let budget_max = load_usize_with_warning(
            Self::BUDGET_MAX_VAR,
            SearchPolicy::DEFAULT_BUDGET_MAX,
            |value| value >= 1,
            "must be at least 1",
            "Warning: Adjusted item budget ceiling may slow down estimation",
        );

        let (budget_min, budget_max) =
            ordered_budget(budget_min, budget_max, Self::BUDGET_MIN_VAR, Self::BUDGET_MAX_VAR);

        let large_grid_threshold = load_usize_with_warning(
            Self::LARGE_GRID_THRESHOLD_VAR,
            SearchPolicy::DEFAULT_LARGE_GRID_THRESHOLD,
            |value| value >= 1,
            "must be at least 1",
            "Warning: Adjusted large-grid threshold may slow down estimation",
        );

        let large_grid_cap = load_usize_with_warning(
            Self::LARGE_GRID_CAP_VAR,
            SearchPolicy::DEFAULT_LARGE_GRID_CAP,
            |value| value >= 1,
            "must be at least 1",
            "Warning: Adjusted large-grid cap may change estimate quality",
        );

        let early_exit_ratio = load_f64_with_warning(
            Self::EARLY_EXIT_RATIO_VAR,
            SearchPolicy::DEFAULT_EARLY_EXIT_RATIO,
            |value| value > 0.0 && value <= 1.0,
            "must lie in (0, 1]",
            "Warning: Adjusted early exit ratio may change which trials run",
        );

        let trial_threads = load_usize_with_warning(
            Self::TRIAL_THREADS_VAR,
            SearchPolicy::DEFAULT_TRIAL_THREADS,
            |_| true,
            "",
            "Warning: Adjusted worker pool size may change search latency",
        );

        let grid_step = load_f64_with_warning(
            Self::GRID_STEP_VAR,
            HeuristicSolver::DEFAULT_GRID_STEP,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted grid step size may affect placement accuracy",
        );

        Self {
            policy: SearchPolicy {
                budget_min,
                budget_max,
                large_grid_threshold,
                large_grid_cap,
                early_exit_ratio,
                trial_threads,
            },
            grid_step,
        }
    }

    /// Returns the configured search policy.
    pub fn search_policy(&self) -> SearchPolicy {
        self.policy
    }

    /// Returns a solver configured with the chosen grid step.
    pub fn solver(&self) -> HeuristicSolver {
        HeuristicSolver::new(self.grid_step)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: SearchPolicy::default(),
            grid_step: HeuristicSolver::DEFAULT_GRID_STEP,
        }
    }
}

/// Ensures the budget bounds are ordered, swapping them with a warning.
fn ordered_budget(min: usize, max: usize, min_var: &str, max_var: &str) -> (usize, usize) {
    if min > max {
        eprintln!(
            "⚠️ {} ({}) exceeds {} ({}). Swapping the bounds.",
            min_var, min, max_var, max
        );
        (max, min)
    } else {
        (min, max)
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

fn load_usize_with_warning(
    var_name: &str,
    default: usize,
    validator: impl Fn(usize) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> usize {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    if value != default {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_budget_keeps_valid_bounds() {
        assert_eq!(ordered_budget(50, 500, "MIN", "MAX"), (50, 500));
        assert_eq!(ordered_budget(100, 100, "MIN", "MAX"), (100, 100));
    }

    #[test]
    fn test_ordered_budget_swaps_inverted_bounds() {
        assert_eq!(ordered_budget(500, 50, "MIN", "MAX"), (50, 500));
    }

    #[test]
    fn test_default_engine_config_matches_policy_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search_policy(), SearchPolicy::default());
        assert_eq!(config.solver().grid_step, HeuristicSolver::DEFAULT_GRID_STEP);
    }
}
