//! HTTP-level tests for CloudClient
//!
//! Run the real client against a local wiremock server to check request
//! signing, paths and error classification.

use cce_client::{ClientAuth, CloudClient, CloudClientTrait, CloudError, Credentials, Endpoints};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> CloudClient {
    let auth = ClientAuth::new(
        "ap-southeast-1",
        Credentials {
            access_key: "AKTEST".to_string(),
            secret_key: "SKTEST".to_string(),
            project_id: "proj".to_string(),
        },
    )
    .unwrap();
    CloudClient::with_endpoints(auth, Endpoints::single(&server.uri())).unwrap()
}

#[tokio::test]
async fn test_requests_are_signed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/projects/proj/clusters"))
        .and(header_exists("X-Sdk-Date"))
        .and(header("X-Project-Id", "proj"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Cluster",
            "apiVersion": "v3",
            "items": [{"metadata": {"name": "demo", "uid": "c-1"}, "status": {"phase": "Available"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clusters = client(&server).list_clusters().await.unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].metadata.as_ref().unwrap().uid.as_deref(), Some("c-1"));

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0].headers.get("Authorization").unwrap().to_str().unwrap();
    assert!(authorization.starts_with("SDK-HMAC-SHA256 Access=AKTEST, SignedHeaders=host;x-project-id;x-sdk-date, Signature="));
}

#[tokio::test]
async fn test_not_found_is_structured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/projects/proj/clusters/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Request-Id", "req-42")
                .set_body_json(json!({"errorCode": "CCE.01404001", "errorMessage": "Cluster not found"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).show_cluster("missing").await.unwrap_err();
    assert!(err.is_not_found());
    let provider = err.provider().unwrap();
    assert_eq!(provider.request_id, "req-42");
    assert_eq!(provider.error_code, "CCE.01404001");
}

#[tokio::test]
async fn test_server_error_is_not_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/proj/vpcs/vpc-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = client(&server).delete_vpc("vpc-1").await.unwrap_err();
    assert!(!err.is_not_found());
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_malformed_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/proj/vpcs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vpc": {"name": "no-id"}})))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_vpc(&cce_client::CreateVpcRequest {
            name: "no-id".to_string(),
            cidr: "10.224.0.0/16".to_string(),
            description: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::InvalidResponse(_)));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_create_subnet_wraps_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/proj/subnets"))
        .and(body_partial_json(json!({"subnet": {"vpc_id": "vpc-1", "gateway_ip": "10.224.0.1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subnet": {"id": "subnet-1", "vpc_id": "vpc-1", "cidr": "10.224.0.0/16", "gateway_ip": "10.224.0.1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let subnet = client(&server)
        .create_subnet(&cce_client::CreateSubnetRequest {
            name: "s".to_string(),
            cidr: "10.224.0.0/16".to_string(),
            gateway_ip: "10.224.0.1".to_string(),
            vpc_id: "vpc-1".to_string(),
            primary_dns: String::new(),
            secondary_dns: String::new(),
            description: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(subnet.id, "subnet-1");
}

#[tokio::test]
async fn test_nameservers_filtered_by_region() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/nameservers"))
        .and(query_param("server_region", "ap-southeast-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nameservers": [{"type": "private", "region": "ap-southeast-1",
                "ns_records": [{"address": "100.125.1.250", "priority": 1}]}]
        })))
        .mount(&server)
        .await;

    let servers = client(&server).list_nameservers("ap-southeast-1").await.unwrap();
    assert_eq!(servers[0].ns_records[0].address.as_deref(), Some("100.125.1.250"));
}
