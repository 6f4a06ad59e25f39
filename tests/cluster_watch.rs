//! End-to-end tests for the cluster driver: pods announced by a watch
//! stream, probed over real sockets, and served through the proxy.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

use fnproxy::config::ClusterConfig;
use fnproxy::grouper::{
    ClusterGrouper, Grouper, NodeStatus, PodEvent, PodEventKind, PodPhase, PodWatch, WatchError,
};
use fnproxy::router::ChRouter;
use fnproxy::{ProxyServer, Shutdown};

mod common;

/// Hands out one pre-built event stream, standing in for the
/// orchestrator API.
struct ChannelWatch {
    stream: Mutex<Option<mpsc::Receiver<PodEvent>>>,
}

impl ChannelWatch {
    fn new() -> (mpsc::Sender<PodEvent>, Arc<Self>) {
        let (tx, rx) = mpsc::channel(16);
        (
            tx,
            Arc::new(Self {
                stream: Mutex::new(Some(rx)),
            }),
        )
    }
}

#[async_trait]
impl PodWatch for ChannelWatch {
    async fn watch(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> std::result::Result<mpsc::Receiver<PodEvent>, WatchError> {
        self.stream
            .lock()
            .await
            .take()
            .ok_or_else(|| WatchError("stream already taken".into()))
    }
}

fn running_pod(kind: PodEventKind, uid: &str, ip: &str) -> PodEvent {
    PodEvent {
        kind,
        uid: uid.to_string(),
        ip: Some(ip.to_string()),
        phase: PodPhase::Running,
    }
}

fn start_cluster_grouper(target_port: u16, watcher: Arc<dyn PodWatch>) -> (Arc<ClusterGrouper>, Shutdown) {
    let client: Client<HttpConnector, Body> =
        Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    let grouper = ClusterGrouper::new(
        &common::fast_health(),
        &ClusterConfig {
            label_selector: "app=fn-server".to_string(),
            target_port,
            ..ClusterConfig::default()
        },
        watcher,
        client,
    )
    .unwrap();

    let shutdown = Shutdown::new();
    tokio::spawn(Arc::clone(&grouper).run_watch(shutdown.subscribe()));
    tokio::spawn(Arc::clone(&grouper).run_health(shutdown.subscribe()));
    (grouper, shutdown)
}

#[tokio::test]
async fn test_discovered_pods_serve_traffic_and_deletes_withdraw() {
    // Two pods on distinct loopback addresses sharing the target port.
    let pa_addr: SocketAddr = "127.0.0.2:28611".parse().unwrap();
    let pb_addr: SocketAddr = "127.0.0.3:28611".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28612".parse().unwrap();

    let pa = common::FunctionNode::new("pa");
    let pb = common::FunctionNode::new("pb");
    common::start_function_node(pa_addr, pa.clone()).await;
    common::start_function_node(pb_addr, pb.clone()).await;

    let (tx, watcher) = ChannelWatch::new();
    let (grouper, shutdown) = start_cluster_grouper(28611, watcher);

    let listener = TcpListener::bind(proxy_addr).await.unwrap();
    let server = ProxyServer::new(grouper.clone(), Arc::new(ChRouter::new()));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tx.send(running_pod(PodEventKind::Added, "pod-a", "127.0.0.2"))
        .await
        .unwrap();
    tx.send(running_pod(PodEventKind::Added, "pod-b", "127.0.0.3"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    // The node listing is keyed by pod uid, not by address.
    let res = client
        .get(format!("http://{}/1/lb/nodes", proxy_addr))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"nodes": {"pod-a": "online", "pod-b": "online"}})
    );

    // Two healthy pods, so the jump choice is the first sorted address.
    let res = client
        .get(format!("http://{}/r/app/hello", proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "pa");

    // A delete withdraws the pod without waiting for probes.
    tx.send(PodEvent {
        kind: PodEventKind::Deleted,
        uid: "pod-a".to_string(),
        ip: None,
        phase: PodPhase::Failed,
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let res = client
        .get(format!("http://{}/r/app/hello", proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "pb");

    let res = client
        .get(format!("http://{}/1/lb/nodes", proxy_addr))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"nodes": {"pod-b": "online"}}));

    // Membership belongs to the orchestrator here; the management API
    // refuses to edit it.
    let res = client
        .put(format!("http://{}/1/lb/nodes", proxy_addr))
        .json(&json!({ "node": "10.0.0.9:8080" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 405);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"msg": "operation not supported by the cluster grouper"})
    );

    let res = client
        .delete(format!("http://{}/1/lb/nodes", proxy_addr))
        .json(&json!({ "node": "10.0.0.9:8080" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 405);

    shutdown.trigger();
}

#[tokio::test]
async fn test_pod_below_minimum_version_stays_out() {
    let pod_addr: SocketAddr = "127.0.0.2:28631".parse().unwrap();

    let pod = common::FunctionNode::new("pv");
    pod.set_version("0.0.9");
    common::start_function_node(pod_addr, pod.clone()).await;

    let (tx, watcher) = ChannelWatch::new();
    let (grouper, shutdown) = start_cluster_grouper(28631, watcher);

    tx.send(running_pod(PodEventKind::Added, "pod-v", "127.0.0.2"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Discovered but answering probes with a version below the minimum:
    // tracked, never routable.
    assert_eq!(grouper.nodes()["pod-v"], NodeStatus::Offline);
    assert!(grouper.list("/r/app/hello").unwrap_err().is_no_nodes());

    pod.set_version("0.1.0");
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(grouper.nodes()["pod-v"], NodeStatus::Online);
    assert_eq!(*grouper.list("/r/app/hello").unwrap(), vec!["127.0.0.2:28631"]);

    shutdown.trigger();
}
