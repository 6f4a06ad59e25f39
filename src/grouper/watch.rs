//! Orchestrator pod-event stream contract.
//!
//! The cluster driver does not speak to any orchestrator API itself. An
//! embedding binary supplies a [`PodWatch`] implementation and the driver
//! consumes the event stream, reconnecting when it ends.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Lifecycle phase reported for a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// What happened to the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodEventKind {
    Added,
    Modified,
    Deleted,
}

/// One pod change delivered by the watch stream.
#[derive(Debug, Clone)]
pub struct PodEvent {
    pub kind: PodEventKind,
    /// Stable pod identifier; survives IP changes.
    pub uid: String,
    /// Pod IP, once the orchestrator has assigned one.
    pub ip: Option<String>,
    pub phase: PodPhase,
}

impl PodEvent {
    /// Routable `ip:port` address, present only for a running pod that has
    /// an IP assigned.
    pub fn ready_address(&self, port: u16) -> Option<String> {
        if self.phase != PodPhase::Running {
            return None;
        }
        match self.ip.as_deref() {
            Some(ip) if !ip.is_empty() => Some(format!("{}:{}", ip, port)),
            _ => None,
        }
    }
}

/// Failure to open a watch stream.
#[derive(Debug, Error)]
#[error("pod watch: {0}")]
pub struct WatchError(pub String);

/// Source of pod events for one namespace and label selector.
///
/// `watch` is called again with the same arguments whenever a previous
/// stream ends, so implementations only need to deliver a single
/// connection's worth of events per call.
#[async_trait]
pub trait PodWatch: Send + Sync + 'static {
    async fn watch(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<mpsc::Receiver<PodEvent>, WatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(phase: PodPhase, ip: Option<&str>) -> PodEvent {
        PodEvent {
            kind: PodEventKind::Added,
            uid: "pod-1".into(),
            ip: ip.map(str::to_string),
            phase,
        }
    }

    #[test]
    fn running_pod_with_ip_is_ready() {
        let address = event(PodPhase::Running, Some("10.1.2.3")).ready_address(8080);
        assert_eq!(address.as_deref(), Some("10.1.2.3:8080"));
    }

    #[test]
    fn pending_pod_is_not_ready() {
        assert_eq!(event(PodPhase::Pending, Some("10.1.2.3")).ready_address(8080), None);
    }

    #[test]
    fn running_pod_without_ip_is_not_ready() {
        assert_eq!(event(PodPhase::Running, None).ready_address(8080), None);
        assert_eq!(event(PodPhase::Running, Some("")).ready_address(8080), None);
    }
}
