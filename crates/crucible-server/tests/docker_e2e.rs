//! End-to-end properties that require a local Docker daemon with the
//! language executor images built (`python-executor`, `js-executor`,
//! `cpp-executor`, `java-executor`, `go-executor`).
//!
//! Run with `cargo test -- --ignored`.

use std::collections::HashMap;
use std::sync::Arc;

use bollard::container::ListContainersOptions;
use bollard::Docker;

use crucible_core::{Config, EngineError, ErrorType, ExecutionRequest};
use crucible_engine::{AdmissionGate, DockerBackend, Engine};

async fn engine(concurrent_limit: usize) -> (Engine, Arc<AdmissionGate>) {
    let config = Config { concurrent_limit, ..Config::default() };
    let admission = Arc::new(AdmissionGate::new(10_000, 10_000, concurrent_limit));
    let backend = DockerBackend::connect(&config, admission.clone())
        .await
        .expect("Docker daemon must be reachable for ignored e2e tests");
    (Engine::new(&config, admission.clone(), Arc::new(backend)), admission)
}

fn request(language: &str, code: &str, stdin: Option<&str>, timeout: Option<u64>) -> ExecutionRequest {
    ExecutionRequest {
        language: language.to_string(),
        code: code.to_string(),
        stdin: stdin.map(String::from),
        timeout,
    }
}

async fn leftover_containers() -> usize {
    let docker = Docker::connect_with_local_defaults().unwrap();
    let mut filters = HashMap::new();
    filters.insert("name", vec!["crucible-"]);
    docker
        .list_containers(Some(ListContainersOptions { all: true, filters, ..Default::default() }))
        .await
        .unwrap()
        .len()
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn python_hello_world() {
    let (engine, _) = engine(10).await;
    let response = engine
        .execute("10.0.0.1", &request("python", "print('hello')", None, None))
        .await
        .unwrap();
    assert_eq!(response.stdout, "hello\n");
    assert_eq!(response.stderr, "");
    assert_eq!(response.error_type, None);
    assert!(response.execution_time_ms > 0);
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn stdin_is_delivered_via_redirection() {
    let (engine, _) = engine(10).await;
    let response = engine
        .execute("10.0.0.1", &request("python", "print(input())", Some("abc"), None))
        .await
        .unwrap();
    assert_eq!(response.stdout, "abc\n");
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn streams_are_separated() {
    let code = "import sys\nprint('to stdout')\nprint('to stderr', file=sys.stderr)";
    let (engine, _) = engine(10).await;
    let response = engine.execute("10.0.0.1", &request("python", code, None, None)).await.unwrap();
    assert_eq!(response.stdout, "to stdout\n");
    assert_eq!(response.stderr, "to stderr\n");
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn cpp_syntax_error_is_a_compile_error() {
    let (engine, _) = engine(10).await;
    let response = engine
        .execute("10.0.0.1", &request("cpp", "int main(){ return", None, None))
        .await
        .unwrap();
    assert_eq!(response.error_type, Some(ErrorType::CompileError));
    assert!(response.stderr.contains("error"));
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn deadline_kills_the_workload() {
    let (engine, _) = engine(10).await;
    let start = std::time::Instant::now();
    let response = engine
        .execute(
            "10.0.0.1",
            &request("python", "import time\ntime.sleep(30)", None, Some(2)),
        )
        .await
        .unwrap();
    assert_eq!(response.error_type, Some(ErrorType::Timeout));
    assert!(response.execution_time_ms >= 2_000);
    // Deadline plus stop grace and teardown overhead, nowhere near the
    // workload's own 30s.
    assert!(start.elapsed().as_secs() < 10);
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn allocation_bomb_is_a_memory_limit() {
    let (engine, _) = engine(10).await;
    let response = engine
        .execute("10.0.0.1", &request("python", "a=[0]*10**9", None, None))
        .await
        .unwrap();
    assert_eq!(response.error_type, Some(ErrorType::MemoryLimit));
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn cleanup_is_total_across_outcomes() {
    let (engine, admission) = engine(10).await;

    let outcomes = [
        request("python", "print('ok')", None, None),
        request("python", "raise ValueError('x')", None, None),
        request("python", "import time\ntime.sleep(30)", None, Some(1)),
        request("python", "a=[0]*10**9", None, None),
    ];
    for req in &outcomes {
        let _ = engine.execute("10.0.0.1", req).await;
    }

    assert_eq!(admission.in_flight(), 0, "all permits must be returned");
    assert_eq!(leftover_containers().await, 0, "no residual containers");
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn abandoned_execution_still_tears_down() {
    let (engine, admission) = engine(10).await;
    let engine = Arc::new(engine);

    let slow = request("python", "import time\ntime.sleep(30)", None, Some(30));
    let handle = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.execute("10.0.0.1", &slow).await })
    };

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    // Dropping the supervising future is what a client disconnect does to
    // the request handler.
    handle.abort();

    // The spawned teardown needs a moment to stop and remove the container.
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    assert_eq!(admission.in_flight(), 0, "permit must be released");
    assert_eq!(leftover_containers().await, 0, "container must be removed");
}

#[tokio::test]
#[ignore = "requires a local Docker daemon and executor images"]
async fn concurrency_cap_refuses_the_excess_request() {
    let (engine, _) = engine(1).await;
    let engine = Arc::new(engine);

    let slow = request("python", "import time\ntime.sleep(5)", None, Some(10));
    let first = {
        let engine = engine.clone();
        let slow = slow.clone();
        tokio::spawn(async move { engine.execute("10.0.0.1", &slow).await })
    };

    // Give the first submission time to take the only slot.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let second = engine.execute("10.0.0.2", &slow).await;
    match second {
        Err(EngineError::CapacityExhausted) => {}
        other => panic!("expected capacity refusal, got {other:?}"),
    }

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.error_type, None);
}
