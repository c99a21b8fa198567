//! Full election rounds against a mocked Consul agent.

use consul_leader_election::{ConsulClient, ConsulConfig, ElectionConfig, LeaderElection};
use serde_json::json;
use wiremock::matchers::{body_json, body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn agent(node: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Config": {"NodeName": node}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "redis": {"ID": "redis", "Service": "redis", "Tags": ["v1"], "Port": 6379,
                      "Address": "", "EnableTagOverride": false}
        })))
        .mount(&server)
        .await;
    server
}

fn election(server: &MockServer) -> LeaderElection<ConsulClient> {
    let client = ConsulClient::new(&ConsulConfig::default().with_addr(server.uri())).unwrap();
    let config = ElectionConfig::new("leader")
        .with_health_check("service:redis")
        .with_service_name("redis")
        .with_leader_tag("master")
        .with_follower_tag("replica");
    LeaderElection::new(client, config).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_consul_round_becomes_leader() {
    let server = agent("node-a").await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/leader"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/session/create"))
        .and(body_json(json!({
            "Name": "leader",
            "Checks": ["serfHealth", "service:redis"],
            "LockDelay": "1000ms"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "s-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/kv/leader"))
        .and(query_param("acquire", "s-1"))
        .and(body_string("node-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/session/destroy/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .and(body_json(json!({
            "ID": "redis", "Name": "redis", "Tags": ["v1", "master"], "Port": 6379,
            "Address": "", "EnableTagOverride": false
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = election(&server).run().await;
    assert!(outcome.is_leader());
}

#[test_log::test(tokio::test)]
async fn test_consul_round_loses_race() {
    let server = agent("node-a").await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/leader"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/session/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "s-2"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/kv/leader"))
        .and(query_param("acquire", "s-2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("false"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/session/destroy/s-2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = election(&server).run().await;
    assert!(outcome.is_follower());
}

#[test_log::test(tokio::test)]
async fn test_consul_round_follows_seated_leader() {
    let server = agent("node-a").await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/leader"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"Key": "leader", "Value": "bm9kZS1i", "Session": "s-b"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/session/info/s-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"ID": "s-b", "Node": "node-b"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/session/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "unused"})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = election(&server).run().await;
    assert!(outcome.is_follower());
}

#[test_log::test(tokio::test)]
async fn test_consul_round_server_error() {
    let server = agent("node-a").await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/leader"))
        .respond_with(ResponseTemplate::new(500).set_body_string("No cluster leader"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = election(&server).run().await;
    let error = outcome.error().expect("round should fail");
    assert!(error.to_string().contains("No cluster leader"));
}
