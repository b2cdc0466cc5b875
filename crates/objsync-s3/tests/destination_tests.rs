//! HTTP-level tests for the S3 destination adapter
//!
//! Runs the real SDK client against a wiremock server speaking the
//! store's XML, so request construction and response mapping are covered
//! without a live bucket. Retries are disabled so error-path tests fail
//! fast.

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use objsync_core::domain::RemoteKey;
use objsync_core::ports::Destination;
use objsync_s3::S3Destination;

async fn destination_for(server: &MockServer) -> S3Destination {
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("test", "test", None, None, "static"))
        .endpoint_url(server.uri())
        .force_path_style(true)
        .retry_config(RetryConfig::disabled())
        .build();
    S3Destination::new(Client::from_conf(config), "test-bucket", None)
}

fn xml(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/xml")
}

#[tokio::test]
async fn init_upload_returns_the_store_issued_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test-bucket/logs/a.bin"))
        .respond_with(xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult>
  <Bucket>test-bucket</Bucket>
  <Key>logs/a.bin</Key>
  <UploadId>mpu-abc-123</UploadId>
</InitiateMultipartUploadResult>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let destination = destination_for(&server).await;
    let upload_id = destination
        .init_upload(&RemoteKey::new("logs/a.bin").unwrap())
        .await
        .unwrap();
    assert_eq!(upload_id.as_str(), "mpu-abc-123");
}

#[tokio::test]
async fn missing_session_maps_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-bucket/"))
        .respond_with(xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListMultipartUploadsResult>
  <Bucket>test-bucket</Bucket>
  <IsTruncated>false</IsTruncated>
</ListMultipartUploadsResult>"#,
        ))
        .mount(&server)
        .await;

    let destination = destination_for(&server).await;
    let listing = destination
        .existing_part_listing(&RemoteKey::new("logs/a.bin").unwrap())
        .await
        .unwrap();
    assert!(listing.is_none());
}

#[tokio::test]
async fn part_listing_is_mapped_with_unquoted_etags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-bucket/"))
        .respond_with(xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListMultipartUploadsResult>
  <Bucket>test-bucket</Bucket>
  <IsTruncated>false</IsTruncated>
  <Upload>
    <Key>logs/a.bin</Key>
    <UploadId>mpu-77</UploadId>
    <Initiated>2026-01-15T10:00:00.000Z</Initiated>
  </Upload>
</ListMultipartUploadsResult>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/test-bucket/logs/a.bin"))
        .respond_with(xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListPartsResult>
  <Bucket>test-bucket</Bucket>
  <Key>logs/a.bin</Key>
  <UploadId>mpu-77</UploadId>
  <IsTruncated>false</IsTruncated>
  <Part>
    <PartNumber>1</PartNumber>
    <ETag>"etag-1"</ETag>
    <Size>5242880</Size>
  </Part>
  <Part>
    <PartNumber>3</PartNumber>
    <ETag>"etag-3"</ETag>
    <Size>5242880</Size>
  </Part>
</ListPartsResult>"#,
        ))
        .mount(&server)
        .await;

    let destination = destination_for(&server).await;
    let listing = destination
        .existing_part_listing(&RemoteKey::new("logs/a.bin").unwrap())
        .await
        .unwrap()
        .expect("a pending session exists");

    assert_eq!(listing.upload_id.as_str(), "mpu-77");
    assert!(listing.initiated.is_some());
    assert_eq!(listing.parts.len(), 2);
    assert_eq!(listing.parts[0].part_number, 1);
    assert_eq!(listing.parts[0].etag, "etag-1");
    assert_eq!(listing.parts[0].size, 5_242_880);
    assert_eq!(listing.parts[1].part_number, 3);
}

#[tokio::test]
async fn store_failures_are_wrapped_with_the_operation_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test-bucket/logs/a.bin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let destination = destination_for(&server).await;
    let err = destination
        .init_upload(&RemoteKey::new("logs/a.bin").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.operation(), "initUpload");
    assert!(err.to_string().contains("initUpload"));
}
