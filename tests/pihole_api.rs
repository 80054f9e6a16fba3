use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use piholedns::dns::{DnsProvider, PiholeProvider, DEFAULT_TTL};
use piholedns::error::ProviderError;
use piholedns::pihole::{ApiOutcome, ApplianceClient, PiholeClient};
use piholedns::zone::{Change, Plan, Record, RecordData, RecordType, Zone};

const SID: &str = "vFA+EP4MQ5JJvJg+3Q2Jnw=";
const TIMEOUT: Duration = Duration::from_secs(5);

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .and(body_json(json!({ "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session": {
                "valid": true,
                "totp": false,
                "sid": SID,
                "csrf": "Ux87YTIiMOf/GKCefVIOMw=",
                "validity": 300,
                "message": "password correct"
            },
            "took": 0.0004
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_config(server: &MockServer, hosts: &[&str], cnames: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .and(header("X-FTL-SID", SID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "config": {
                "dns": {
                    "upstreams": ["8.8.8.8"],
                    "hosts": hosts,
                    "cnameRecords": cnames
                }
            },
            "took": 0.003
        })))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> PiholeClient {
    mount_auth(server).await;
    PiholeClient::connect(&server.uri(), "secret", TIMEOUT)
        .await
        .unwrap()
}

fn record(name: &str, record_type: RecordType, ttl: u32, values: &[&str]) -> Record {
    Record::new(name, ttl, RecordData::parse(record_type, values).unwrap(), false).unwrap()
}

#[tokio::test]
async fn test_login_and_get_config() {
    let server = MockServer::start().await;
    mount_config(
        &server,
        &["1.2.3.4 www.unit.tests."],
        &["cname.unit.tests.,target.unit.tests.,300"],
    )
    .await;

    let client = connect(&server).await;
    let config = client.get_config().await.unwrap();

    assert_eq!(config.hosts, vec!["1.2.3.4 www.unit.tests."]);
    assert_eq!(config.cname_records, vec!["cname.unit.tests.,target.unit.tests.,300"]);
}

#[tokio::test]
async fn test_wrong_password_fails_to_connect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "session": {
                "valid": false,
                "totp": false,
                "sid": null,
                "validity": -1,
                "message": "password incorrect"
            },
            "took": 0.02
        })))
        .mount(&server)
        .await;

    let err = PiholeClient::connect(&server.uri(), "wrong", TIMEOUT)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("password incorrect"));
}

#[tokio::test]
async fn test_empty_password_skips_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "config": { "dns": { "hosts": [], "cnameRecords": [] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PiholeClient::connect(&server.uri(), "", TIMEOUT)
        .await
        .unwrap();
    let config = client.get_config().await.unwrap();
    assert!(config.hosts.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/api/auth"));
}

#[tokio::test]
async fn test_get_config_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let err = client.get_config().await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_add_host_success() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/config/dns/hosts/1.2.3.4%20www.unit.tests."))
        .and(header("X-FTL-SID", SID))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "config": { "dns": { "hosts": ["1.2.3.4 www.unit.tests."] } },
            "took": 0.01
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let outcome = client
        .add_host("www.unit.tests.", "1.2.3.4".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(outcome, ApiOutcome::Success);
}

#[tokio::test]
async fn test_add_host_reports_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/config/dns/hosts/1.2.3.4%20www.unit.tests."))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "key": "bad_request",
                "message": "Item already present",
                "hint": "Uniqueness of items is enforced"
            },
            "took": 0.001
        })))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let outcome = client
        .add_host("www.unit.tests.", "1.2.3.4".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(outcome, ApiOutcome::Failure("Item already present".to_string()));
}

#[tokio::test]
async fn test_status_without_error_body_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/config/dns/hosts/2001:db8::1%20v6.unit.tests."))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let outcome = client
        .remove_host("v6.unit.tests.", "2001:db8::1".parse().unwrap())
        .await
        .unwrap();
    assert!(matches!(outcome, ApiOutcome::Failure(message) if message.contains("404")));
}

#[tokio::test]
async fn test_cname_add_and_remove() {
    let server = MockServer::start().await;
    let entry_path = "/api/config/dns/cnameRecords/alias.unit.tests.,www.unit.tests.,300";
    Mock::given(method("PUT"))
        .and(path(entry_path))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "took": 0.01 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(entry_path))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    assert!(client
        .add_cname("alias.unit.tests.", "www.unit.tests.", 300)
        .await
        .unwrap()
        .is_success());
    assert!(client
        .remove_cname("alias.unit.tests.", "www.unit.tests.", 300)
        .await
        .unwrap()
        .is_success());
}

#[tokio::test]
async fn test_logout_deletes_session() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/auth"))
        .and(header("X-FTL-SID", SID))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    client.logout().await.unwrap();
}

#[tokio::test]
async fn test_provider_populates_zone_over_http() {
    let server = MockServer::start().await;
    mount_config(
        &server,
        &[
            "1.2.3.4 unit.tests.",
            "1.2.3.5 unit.tests.",
            "2.2.3.6 www.unit.tests.",
            "2601:644:500:e210:62f8:1dff:feb8:947a aaaa.unit.tests.",
            "9.9.9.9 www.other.tld.",
        ],
        &["cname.unit.tests.,unit.tests.,300"],
    )
    .await;

    let provider = PiholeProvider::new("test", connect(&server).await, DEFAULT_TTL);
    let mut zone = Zone::new("unit.tests.").unwrap();
    assert!(provider.populate(&mut zone, false, false).await.unwrap());

    assert_eq!(zone.len(), 4);
    assert_eq!(
        zone.get("", RecordType::A).unwrap().data().values(),
        vec!["1.2.3.4", "1.2.3.5"]
    );
    assert!(zone.get("aaaa", RecordType::Aaaa).is_some());
    assert_eq!(zone.get("cname", RecordType::Cname).unwrap().ttl(), 300);
}

#[tokio::test]
async fn test_provider_apply_stops_at_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/config/dns/hosts/1.2.3.4%20www.unit.tests."))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/config/dns/hosts/9.8.7.6%20www.unit.tests."))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "key": "bad_request", "message": "Invalid request body data" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/config/dns/hosts/5.5.5.5%20later.unit.tests."))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let provider = PiholeProvider::new("test", connect(&server).await, DEFAULT_TTL);
    let plan = Plan::new(
        Zone::new("unit.tests.").unwrap(),
        vec![
            Change::Update {
                existing: record("www", RecordType::A, DEFAULT_TTL, &["1.2.3.4"]),
                new: record("www", RecordType::A, DEFAULT_TTL, &["9.8.7.6"]),
            },
            Change::Create(record("later", RecordType::A, DEFAULT_TTL, &["5.5.5.5"])),
        ],
    );

    let err = provider.apply(&plan).await.unwrap_err();
    match err {
        ProviderError::ChangeFailed { name, message } => {
            assert_eq!(name, "www");
            assert_eq!(message, "Invalid request body data");
        }
        other => panic!("unexpected error: {other}"),
    }
}
