//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds >= 1)
//! - Check addresses and the minimum API version parse
//! - Enforce driver-specific requirements (cluster selector present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ProxyConfig -> Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{GrouperDriver, ProxyConfig};

/// A single semantic problem found in a config.
#[derive(Debug)]
pub enum ValidationError {
    InvalidBindAddress(String),
    InvalidMetricsAddress(String),
    ZeroInterval(&'static str),
    ZeroThreshold(&'static str),
    InvalidMinVersion(String),
    EmptySeedNode,
    MissingLabelSelector,
    ZeroTargetPort,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(a) => {
                write!(f, "listener.bind_address {:?} is not a socket address", a)
            }
            ValidationError::InvalidMetricsAddress(a) => {
                write!(f, "observability.metrics_address {:?} is not a socket address", a)
            }
            ValidationError::ZeroInterval(field) => {
                write!(f, "health_check.{} must be greater than zero", field)
            }
            ValidationError::ZeroThreshold(field) => {
                write!(f, "health_check.{} must be at least 1", field)
            }
            ValidationError::InvalidMinVersion(v) => {
                write!(f, "health_check.min_api_version {:?} is not a semantic version", v)
            }
            ValidationError::EmptySeedNode => {
                write!(f, "grouper.nodes contains an empty address")
            }
            ValidationError::MissingLabelSelector => {
                write!(f, "cluster.label_selector is required for the cluster driver")
            }
            ValidationError::ZeroTargetPort => {
                write!(f, "cluster.target_port must be non-zero for the cluster driver")
            }
        }
    }
}

/// Validate a parsed config, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let hc = &config.health_check;
    if hc.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval("interval_secs"));
    }
    if hc.timeout_secs == 0 {
        errors.push(ValidationError::ZeroInterval("timeout_secs"));
    }
    if hc.unhealthy_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("unhealthy_threshold"));
    }
    if hc.healthy_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("healthy_threshold"));
    }
    if semver::Version::parse(&hc.min_api_version).is_err() {
        errors.push(ValidationError::InvalidMinVersion(hc.min_api_version.clone()));
    }

    if config.grouper.nodes.iter().any(|n| n.trim().is_empty()) {
        errors.push(ValidationError::EmptySeedNode);
    }

    if config.grouper.driver == GrouperDriver::Cluster {
        if config.cluster.label_selector.is_empty() {
            errors.push(ValidationError::MissingLabelSelector);
        }
        if config.cluster.target_port == 0 {
            errors.push(ValidationError::ZeroTargetPort);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn rejects_bad_bind_address() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidBindAddress(_))));
    }

    #[test]
    fn rejects_zero_thresholds_and_intervals() {
        let mut config = ProxyConfig::default();
        config.health_check.interval_secs = 0;
        config.health_check.unhealthy_threshold = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_unparseable_min_version() {
        let mut config = ProxyConfig::default();
        config.health_check.min_api_version = "banana".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn cluster_driver_requires_selector() {
        let mut config = ProxyConfig::default();
        config.grouper.driver = GrouperDriver::Cluster;
        config.cluster.label_selector = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingLabelSelector)));
    }
}
