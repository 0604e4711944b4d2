//! Trait contract tests for ConfigStore, ContainerRegistry, ObjectStore and ExecutionService.
//!
//! These tests verify the behavioral contracts using the in-memory fakes,
//! plus the HTTP execution client against a local one-shot server.
//! Any conforming implementation must pass these.

use std::collections::BTreeMap;

use trainlaunch_remote::fakes::{
    MemoryConfigStore, MemoryExecutionService, MemoryObjectStore, MemoryRegistry,
};
use trainlaunch_remote::traits::*;
use trainlaunch_remote::*;

fn descriptor(name: &str) -> CreateTrainingJob {
    CreateTrainingJob {
        training_job_name: name.to_string(),
        role_arn: "arn:role/training".to_string(),
        algorithm_specification: AlgorithmSpecification {
            training_image: "registry.local/rl/training:latest".to_string(),
            training_input_mode: "File".to_string(),
            metric_definitions: vec![MetricDefinition {
                name: "episode_reward".to_string(),
                regex: r"episode_reward: ([0-9\.\-]+)".to_string(),
            }],
        },
        environment: BTreeMap::new(),
        resource_config: ResourceConfig {
            instance_type: "ml.g4dn.xlarge".to_string(),
            instance_count: 1,
            volume_size_in_gb: 30,
        },
        stopping_condition: StoppingCondition {
            max_runtime_in_seconds: 86_400,
            max_wait_time_in_seconds: None,
        },
        input_data_config: vec![],
        output_data_config: OutputDataConfig {
            s3_output_path: "s3://bucket/models/drqn/".to_string(),
        },
        hyper_parameters: BTreeMap::new(),
        checkpoint_config: CheckpointConfig {
            s3_uri: "s3://bucket/checkpoints/drqn/x/".to_string(),
            local_path: "/opt/ml/checkpoints".to_string(),
        },
        tensor_board_output_config: TensorBoardOutputConfig {
            s3_output_path: "s3://bucket/tensorboard/drqn/x/".to_string(),
            local_path: "/opt/ml/output/tensorboard".to_string(),
        },
        enable_managed_spot_training: false,
        vpc_config: None,
        tags: vec![Tag::new("Algorithm", "drqn")],
    }
}

// ===========================================================================
// ConfigStore contract tests
// ===========================================================================

#[test]
fn config_store_returns_none_for_unknown_algorithm() {
    let store = MemoryConfigStore::new().with_algorithm("drqn", "hyperparameters: {}");
    assert!(store.algorithm_config("drqn").unwrap().is_some());
    assert!(store.algorithm_config("ppo").unwrap().is_none());
}

#[test]
fn config_store_scenarios_are_separate_namespace() {
    let store = MemoryConfigStore::new().with_scenario("drqn", "hosts: 3");
    assert!(store.algorithm_config("drqn").unwrap().is_none());
    assert_eq!(store.scenario("drqn").unwrap().as_deref(), Some("hosts: 3"));
}

// ===========================================================================
// ContainerRegistry contract tests
// ===========================================================================

#[tokio::test]
async fn registry_reports_present_and_absent() {
    let registry = MemoryRegistry::new();
    registry.push_image("rl/training", "latest");

    assert!(registry.image_exists("rl/training", "latest").await.unwrap());
    assert!(!registry.image_exists("rl/training", "v2").await.unwrap());
    assert_eq!(registry.lookup_count(), 2);
}

#[tokio::test]
async fn registry_failure_is_error_not_absent() {
    let registry = MemoryRegistry::new();
    registry.push_image("rl/training", "latest");
    registry.fail_repository("rl/training");

    let err = registry
        .image_exists("rl/training", "latest")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

// ===========================================================================
// ObjectStore contract tests
// ===========================================================================

#[tokio::test]
async fn object_store_is_bucket_scoped() {
    let store = MemoryObjectStore::new();
    store.put_object("artifacts", "configs/algorithms/drqn.yaml");

    assert!(store
        .object_exists("artifacts", "configs/algorithms/drqn.yaml")
        .await
        .unwrap());
    assert!(!store
        .object_exists("other", "configs/algorithms/drqn.yaml")
        .await
        .unwrap());
}

#[tokio::test]
async fn object_store_failure_is_error() {
    let store = MemoryObjectStore::new();
    store.fail_key("configs/algorithms/drqn.yaml");
    let err = store
        .object_exists("artifacts", "configs/algorithms/drqn.yaml")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

// ===========================================================================
// ExecutionService contract tests
// ===========================================================================

#[tokio::test]
async fn execution_service_creates_job() {
    let service = MemoryExecutionService::new();
    let created = service
        .create_training_job(&descriptor("drqn-s1-20250101-000000"))
        .await
        .unwrap();

    assert!(created.job_arn.contains("drqn-s1-20250101-000000"));
    assert_eq!(service.created_jobs().len(), 1);
}

#[tokio::test]
async fn execution_service_rejects_duplicate_name() {
    let service = MemoryExecutionService::new();
    service
        .create_training_job(&descriptor("drqn-s1-20250101-000000"))
        .await
        .unwrap();

    let err = service
        .create_training_job(&descriptor("drqn-s1-20250101-000000"))
        .await
        .unwrap_err();

    match err {
        RemoteError::Rejected { reason } => assert!(reason.contains("must be unique")),
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(service.created_jobs().len(), 1);
    assert_eq!(service.create_attempts(), 2);
}

#[tokio::test]
async fn execution_service_quota_rejection() {
    let service = MemoryExecutionService::new();
    service.set_quota(1);
    service.create_training_job(&descriptor("a")).await.unwrap();

    let err = service.create_training_job(&descriptor("b")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { .. }));
}

#[tokio::test]
async fn execution_service_unavailable() {
    let service = MemoryExecutionService::new();
    service.set_unavailable(true);

    let err = service.create_training_job(&descriptor("a")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unavailable(_)));
    assert!(service.created_jobs().is_empty());
}

#[tokio::test]
async fn execution_service_unconfirmed_still_creates() {
    let service = MemoryExecutionService::new();
    service.set_unconfirmed(true);

    let err = service.create_training_job(&descriptor("a")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unconfirmed { job_name, .. } if job_name == "a"));
    assert_eq!(service.created_jobs().len(), 1);
}

// ===========================================================================
// HttpExecutionService against a local one-shot server
// ===========================================================================

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}

/// Answer one request with `status` and a JSON `body`, return the base URL.
async fn serve_once(status: &'static str, body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        while !request_complete(&buf) {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn http_create_returns_job_arn() {
    let base = serve_once("200 OK", r#"{"TrainingJobArn":"arn:job/a"}"#).await;
    let service = HttpExecutionService::new(RemoteEndpoint::new(&base)).unwrap();

    let created = service.create_training_job(&descriptor("a")).await.unwrap();
    assert_eq!(created.job_arn, "arn:job/a");
}

#[tokio::test]
async fn http_unreadable_success_body_is_unconfirmed() {
    let base = serve_once("200 OK", r#"{"JobArn":"arn:x"}"#).await;
    let service = HttpExecutionService::new(RemoteEndpoint::new(&base)).unwrap();

    let err = service
        .create_training_job(&descriptor("drqn-s1-20250101-000000"))
        .await
        .unwrap_err();
    match err {
        RemoteError::Unconfirmed { job_name, reason } => {
            assert_eq!(job_name, "drqn-s1-20250101-000000");
            assert!(reason.contains("200"));
        }
        other => panic!("expected Unconfirmed, got {other:?}"),
    }
}

#[tokio::test]
async fn http_client_error_is_rejected_with_body() {
    let base = serve_once("400 Bad Request", r#"{"message":"ResourceInUse"}"#).await;
    let service = HttpExecutionService::new(RemoteEndpoint::new(&base)).unwrap();

    let err = service.create_training_job(&descriptor("a")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { reason } if reason.contains("ResourceInUse")));
}

#[test]
fn descriptor_serializes_service_field_names() {
    let json = serde_json::to_value(descriptor("x")).unwrap();
    assert_eq!(json["TrainingJobName"], "x");
    assert_eq!(json["HyperParameters"], serde_json::json!({}));
    assert_eq!(json["TensorBoardOutputConfig"]["LocalPath"], "/opt/ml/output/tensorboard");
    assert!(json.get("VpcConfig").is_none());
}
