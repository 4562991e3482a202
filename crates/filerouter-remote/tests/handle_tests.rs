use std::time::Duration;

use filerouter::{ErrorKind, FeatureFlag, ProviderError, ProviderVersion};
use filerouter_remote::{Criteria, PagingParams, RepositoryProviderResource, ResourceConfig};
use futures::TryStreamExt;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resource_for(server: &MockServer) -> RepositoryProviderResource {
    RepositoryProviderResource::new(ResourceConfig {
        base_url: server.uri(),
        token: None,
    })
}

fn s3_record(name: &str, version: [u32; 2]) -> Value {
    json!({
        "id": "p1",
        "name": name,
        "version": version,
        "features": ["retrieve", "submit"],
        "parameters": [
            {"name": "bucket", "display_name": "Bucket"},
            {"name": "region", "required": false, "default": "us-east-1"}
        ]
    })
}

#[tokio::test]
async fn get_does_not_fetch_until_first_use() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3", [1, 2])))
        .expect(1)
        .mount(&server)
        .await;

    let resource = resource_for(&server);
    let handle = resource.get("p1");

    assert_eq!(handle.id(), "p1");
    assert!(!handle.is_loaded());
    assert!(handle.cached().is_none());

    let record = handle.ensure_loaded().await.unwrap();
    assert_eq!(record.name, "S3");
    assert_eq!(record.version, ProviderVersion::new(1, 2));
    assert!(record.supports(FeatureFlag::Submit));
    assert_eq!(record.parameters.fields().len(), 2);
    assert!(handle.is_loaded());

    // second access is served from the cache
    let again = handle.ensure_loaded().await.unwrap();
    assert_eq!(again, record);
}

#[tokio::test]
async fn reload_twice_yields_equal_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3", [1, 0])))
        .expect(2)
        .mount(&server)
        .await;

    let handle = resource_for(&server).get("p1");
    let first = handle.reload().await.unwrap();
    let second = handle.reload().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(handle.cached(), Some(second));
}

#[tokio::test]
async fn reload_replaces_snapshot_as_a_whole() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3", [1, 0])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3 v2", [2, 0])))
        .mount(&server)
        .await;

    let handle = resource_for(&server).get("p1");
    let old = handle.ensure_loaded().await.unwrap();
    let new = handle.reload().await.unwrap();

    assert_eq!(old.name, "S3");
    assert_eq!(old.version, ProviderVersion::new(1, 0));
    assert_eq!(new.name, "S3 v2");
    assert_eq!(new.version, ProviderVersion::new(2, 0));
    assert_eq!(handle.cached().unwrap().name, "S3 v2");
}

#[tokio::test]
async fn handles_from_find_do_not_refetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([s3_record("S3", [1, 0])])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3", [1, 0])))
        .expect(0)
        .mount(&server)
        .await;

    let resource = resource_for(&server);
    let handles: Vec<_> = resource
        .find(&Criteria::new(), PagingParams::default())
        .try_collect()
        .await
        .unwrap();

    let record = handles[0].ensure_loaded().await.unwrap();
    assert_eq!(record.name, "S3");
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/missing-id"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resource = resource_for(&server);

    let err = resource.get_record("missing-id").await.unwrap_err();
    assert!(matches!(&err, ProviderError::RecordNotFound(id) if id == "missing-id"));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let handle = resource.get("missing-id");
    assert!(handle.ensure_loaded().await.is_err());
    assert!(!handle.is_loaded());
}

#[tokio::test]
async fn failed_reload_keeps_previous_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3", [1, 0])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let handle = resource_for(&server).get("p1");
    handle.ensure_loaded().await.unwrap();

    let err = handle.reload().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
    assert!(err.is_retryable());
    assert!(err.to_string().contains("boom"));
    assert_eq!(handle.cached().unwrap().name, "S3");
}

#[tokio::test]
async fn abandoned_reload_keeps_previous_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3", [1, 0])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(s3_record("S3 v2", [1, 1]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let handle = resource_for(&server).get("p1");
    handle.ensure_loaded().await.unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(50), handle.reload()).await;
    assert!(timed_out.is_err());
    assert_eq!(handle.cached().unwrap().name, "S3");
    assert_eq!(handle.cached().unwrap().version, ProviderVersion::new(1, 0));
}

#[tokio::test]
async fn abandoned_first_load_leaves_handle_unloaded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(s3_record("S3", [1, 0]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let handle = resource_for(&server).get("p1");

    let timed_out = tokio::time::timeout(Duration::from_millis(50), handle.ensure_loaded()).await;
    assert!(timed_out.is_err());
    assert!(!handle.is_loaded());
}

#[tokio::test]
async fn unreachable_catalog_is_remote_unavailable() {
    let resource = RepositoryProviderResource::new(ResourceConfig {
        base_url: "http://127.0.0.1:1".into(),
        token: None,
    });

    let err = resource.get("p1").reload().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
}

#[tokio::test]
async fn handle_refuses_mutation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/providers/repositories/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_record("S3", [1, 0])))
        .mount(&server)
        .await;

    let handle = resource_for(&server).get("p1");
    let before = handle.ensure_loaded().await.unwrap();

    let save = handle.save().await.unwrap_err();
    let delete = handle.delete().await.unwrap_err();

    assert_eq!(save.kind(), ErrorKind::ReadOnlyViolation);
    assert_eq!(delete.kind(), ErrorKind::ReadOnlyViolation);
    assert_eq!(handle.cached(), Some(before));
}
