//! End-to-end bootstrap scenarios.

mod common;

use std::sync::Arc;

use search_indexer_api::discovery::RegistrationStatus;
use search_indexer_api::lifecycle::{BootstrapError, BootstrapOrchestrator, BootstrapState};
use search_indexer_api::search::{expected_index, IndexSyncError, SyncOutcome};

use common::{loader, start_programmable_backend, unused_address, CountingIndexBackend, RecordingAgent};

#[tokio::test]
async fn test_minimal_configuration_is_ready_without_backend_calls() {
    let backend = Arc::new(CountingIndexBackend::default());
    let agent = Arc::new(RecordingAgent::default());
    let mut bootstrap = BootstrapOrchestrator::new(loader(&[
        ("ServiceDiscovery__Enabled", "false"),
        ("SecureToken", "abc"),
    ]))
    .with_index_backend(backend.clone())
    .with_discovery_agent(agent.clone());

    let ready = bootstrap.run().await.unwrap();

    assert_eq!(bootstrap.state(), BootstrapState::Ready);
    assert_eq!(ready.index, SyncOutcome::Skipped);
    assert_eq!(ready.registration, RegistrationStatus::Skipped);
    assert_eq!(backend.calls(), 0);
    assert!(agent.registrations.lock().unwrap().is_empty());
    assert!(ready.auth.has_configured_scheme());
}

#[tokio::test]
async fn test_unreachable_search_backend_is_fatal() {
    let dead = unused_address().await;
    let endpoint = format!("http://{}", dead);
    let mut bootstrap = BootstrapOrchestrator::new(loader(&[
        ("ServiceDiscovery__Enabled", "false"),
        ("AzureSearchApiKey", "key"),
        ("AzureSearchEndpoint", endpoint.as_str()),
        ("AzureSearchSyncMaxAttempts", "1"),
        ("AzureSearchSyncTimeoutSecs", "2"),
    ]));

    let err = bootstrap.run().await.unwrap_err();

    assert!(matches!(err, BootstrapError::IndexSync(_)), "{err}");
    assert_eq!(bootstrap.state(), BootstrapState::Fatal);
    assert!(!bootstrap.history().contains(&BootstrapState::Ready));
    assert!(!bootstrap.history().contains(&BootstrapState::IndexSynced));
}

#[tokio::test]
async fn test_missing_index_is_created_over_http() {
    let backend = start_programmable_backend(|req| match req.method.as_str() {
        "GET" => (404, String::new()),
        _ => (201, req.body.clone()),
    })
    .await;

    let mut bootstrap = BootstrapOrchestrator::new(loader(&[
        ("ServiceDiscovery__Enabled", "false"),
        ("AzureSearchApiKey", "secret-key"),
        ("AzureSearchEndpoint", backend.url().as_str()),
    ]));

    let ready = bootstrap.run().await.unwrap();
    assert_eq!(ready.index, SyncOutcome::Created);

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/indexes/documents?api-version=2017-11-11");
    assert_eq!(requests[0].header("api-key"), Some("secret-key"));
    assert_eq!(requests[1].method, "PUT");

    let written: serde_json::Value = serde_json::from_str(&requests[1].body).unwrap();
    assert_eq!(written, serde_json::to_value(expected_index("documents")).unwrap());
}

#[tokio::test]
async fn test_matching_index_is_left_alone() {
    let existing = serde_json::to_string(&expected_index("docs")).unwrap();
    let backend = start_programmable_backend(move |_| (200, existing.clone())).await;

    let mut bootstrap = BootstrapOrchestrator::new(loader(&[
        ("ServiceDiscovery__Enabled", "false"),
        ("AzureSearchApiKey", "k"),
        ("AzureSearchEndpoint", backend.url().as_str()),
        ("AzureSearchIndexName", "docs"),
    ]));

    let ready = bootstrap.run().await.unwrap();
    assert_eq!(ready.index, SyncOutcome::AlreadyInSync);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_rejected_api_key_fails_without_retry() {
    let backend = start_programmable_backend(|_| (403, "{\"error\":\"forbidden\"}".into())).await;

    let mut bootstrap = BootstrapOrchestrator::new(loader(&[
        ("ServiceDiscovery__Enabled", "false"),
        ("AzureSearchApiKey", "wrong"),
        ("AzureSearchEndpoint", backend.url().as_str()),
        ("AzureSearchSyncMaxAttempts", "3"),
    ]));

    let err = bootstrap.run().await.unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::IndexSync(IndexSyncError::Unauthorized(403))
    ));
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_registration_uses_port_from_server_urls() {
    let consul = start_programmable_backend(|_| (200, String::new())).await;

    let mut bootstrap = BootstrapOrchestrator::new(loader(&[
        ("ServiceDiscovery__AgentAddress", consul.url().as_str()),
        ("ServiceDiscovery__ServiceName", "indexer"),
        ("ServiceDiscovery__ServiceId", "indexer-7"),
        ("ServiceDiscovery__Datacenter", "dc2"),
        ("server__urls", "http://127.0.0.1:7001;http://127.0.0.1:7002"),
    ]))
    .with_index_backend(Arc::new(CountingIndexBackend::default()));

    let ready = bootstrap.run().await.unwrap();
    assert_eq!(ready.registration, RegistrationStatus::Registered { attempts: 1 });
    assert!(bootstrap.history().contains(&BootstrapState::Registered));

    let requests = consul.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].target, "/v1/agent/service/register?dc=dc2");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "ID": "indexer-7", "Name": "indexer", "Port": 7001 })
    );
}

#[tokio::test]
async fn test_unreachable_discovery_agent_is_not_fatal() {
    let dead = unused_address().await;
    let agent = format!("http://{}", dead);

    let mut bootstrap = BootstrapOrchestrator::new(loader(&[
        ("ServiceDiscovery__AgentAddress", agent.as_str()),
        ("ServiceDiscovery__MaxAttempts", "2"),
        ("ServiceDiscovery__BaseDelayMs", "1"),
        ("ServiceDiscovery__MaxDelayMs", "5"),
    ]))
    .with_index_backend(Arc::new(CountingIndexBackend::default()));

    let ready = bootstrap.run().await.unwrap();
    assert!(matches!(ready.registration, RegistrationStatus::Failed { .. }));
    assert_eq!(bootstrap.state(), BootstrapState::Ready);
}
