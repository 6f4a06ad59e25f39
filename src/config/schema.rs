//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the load
//! balancer. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

/// Root configuration for the function load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Membership driver and seed nodes.
    pub grouper: GrouperConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Orchestrator watch settings (cluster driver only).
    pub cluster: ClusterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
        }
    }
}

/// Which membership driver to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrouperDriver {
    /// Explicitly managed node list, persisted through a node store.
    Static,
    /// Membership derived from an orchestrator pod-event stream.
    Cluster,
}

/// Membership configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrouperConfig {
    /// Membership driver.
    pub driver: GrouperDriver,

    /// Seed node addresses ("host:port"), added at startup (static driver).
    pub nodes: Vec<String>,

    /// Path to the JSON node-store file. Unset means membership is kept
    /// in memory only and does not survive restarts.
    pub store_path: Option<String>,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            driver: GrouperDriver::Static,
            nodes: Vec::new(),
            store_path: None,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe on each node.
    pub path: String,

    /// Number of consecutive failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,

    /// Minimum backend API version accepted by the probe.
    pub min_api_version: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            timeout_secs: 5,
            path: "/version".to_string(),
            unhealthy_threshold: 2,
            healthy_threshold: 1,
            min_api_version: "0.0.104".to_string(),
        }
    }
}

/// Orchestrator watch configuration (cluster driver).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Namespace to watch for function pods.
    pub namespace: String,

    /// Label selector identifying function pods.
    pub label_selector: String,

    /// Port the function servers listen on inside each pod.
    pub target_port: u16,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            label_selector: String::new(),
            target_port: 8080,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
