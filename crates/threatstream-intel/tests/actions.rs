use serde_json::{json, Value};
use threatstream_intel::{Integration, IntegrationConfig, Message, Options};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options(server: &MockServer) -> Options {
    Options::new(server.uri(), "analyst", "secret")
}

fn integration() -> Integration {
    Integration::new(IntegrationConfig::default()).unwrap()
}

async fn mount_org_tags(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/orgtag/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [{ "name": "Ransomware" }, { "name": "apt29" }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn tag_names(result: &Value) -> Vec<&str> {
    result["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn search_tags_wildcard_returns_preferred_only() {
    let server = MockServer::start().await;
    mount_org_tags(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/intelligence/tags_by_org/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tags": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let result = integration()
        .handle_message(&json!({ "action": "SEARCH_TAGS", "term": "*" }), &options(&server))
        .await
        .unwrap();

    let names = tag_names(&result);
    assert_eq!(names.len(), 9);
    assert_eq!(names[0], "Actions on Objectives");
    assert!(names.contains(&"Ransomware"));
    assert!(names.contains(&"Reconnaisance"));
    assert!(result["tags"].as_array().unwrap().iter().all(|t| t["isPreferred"] == true));
}

#[tokio::test]
async fn search_tags_merges_org_results_behind_new_term() {
    let server = MockServer::start().await;
    mount_org_tags(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/intelligence/tags_by_org/"))
        .and(query_param("term", "apt"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tags": [{ "tag": "APT29" }, { "tag": "apt41" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = integration()
        .handle_message(&json!({ "action": "SEARCH_TAGS", "term": "apt" }), &options(&server))
        .await
        .unwrap();

    let tags = result["tags"].as_array().unwrap();
    assert_eq!(tags[0], json!({ "name": "apt", "isPreferred": false, "isNew": true }));
    assert_eq!(tags[1], json!({ "name": "apt29", "isPreferred": true }));
    assert_eq!(tags[2], json!({ "name": "apt41", "isPreferred": false }));
    assert_eq!(tags.len(), 3);
}

#[tokio::test]
async fn search_tags_forwards_exclusions_unchanged() {
    let server = MockServer::start().await;
    mount_org_tags(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/intelligence/tags_by_org/"))
        .and(query_param("term", "apt"))
        .and(query_param("exclude", "APT29,Botnet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tags": [{ "tag": "apt41" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = integration()
        .handle_message(
            &json!({ "action": "SEARCH_TAGS", "term": "apt", "exclude": ["APT29", "Botnet"] }),
            &options(&server),
        )
        .await
        .unwrap();

    // the cached preferred `apt29` is filtered locally, case-insensitively
    assert_eq!(tag_names(&result), vec!["apt", "apt41"]);
}

#[tokio::test]
async fn add_tag_resolves_user_then_posts_tag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .and(query_param("username", "analyst"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [{ "api_key": { "id": 11 }, "organization": { "id": 22 } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/intelligence/123/tag/"))
        .and(query_param("api_key", "secret"))
        .and(body_json(json!({
            "tags": [{
                "name": "phishing",
                "category": "user",
                "org_id": 22,
                "source_user": "",
                "source_user_id": 11,
                "tagger": "user",
                "tlp": "red"
            }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true, "id": "t-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = integration()
        .handle_message(
            &json!({ "action": "ADD_TAG", "tag": "phishing", "observableId": 123, "tlp": "RED" }),
            &options(&server),
        )
        .await
        .unwrap();

    assert_eq!(result["id"], "t-1");
}

#[tokio::test]
async fn add_tag_rejects_amber_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let payload = integration()
        .handle_message(
            &json!({ "action": "ADD_TAG", "tag": "phishing", "observableId": 123, "tlp": "amber" }),
            &options(&server),
        )
        .await
        .unwrap_err();

    assert_eq!(payload.errors[0].status, "400");
    assert_eq!(
        payload.errors[0].detail,
        "Invalid TLP specified.  TLP must be `white` or `red`"
    );
}

#[tokio::test]
async fn add_tag_reports_malformed_user_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "objects": [] })))
        .mount(&server)
        .await;

    let payload = integration()
        .handle_message(
            &json!({ "action": "ADD_TAG", "tag": "phishing", "observableId": 1, "tlp": "white" }),
            &options(&server),
        )
        .await
        .unwrap_err();

    assert_eq!(payload.errors[0].code, "ThreatStream_2B");
}

#[tokio::test]
async fn delete_tag() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/intelligence/42/tag/abc/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let message = Message::DeleteTag {
        observable_id: "42".into(),
        tag_id: "abc".into(),
    };
    let result = integration().on_message(message, &options(&server)).await.unwrap();
    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn get_observable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/intelligence/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42, "value": "evil.example", "status": "active"
        })))
        .mount(&server)
        .await;

    let result = integration()
        .handle_message(&json!({ "action": "GET_OBSERVABLE", "observableId": "42" }), &options(&server))
        .await
        .unwrap();
    assert_eq!(result["value"], "evil.example");
}

#[tokio::test]
async fn update_observable_patches_validated_fields() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v2/intelligence/42/"))
        .and(body_json(json!({ "status": "inactive", "confidence": 80 })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "id": 42, "status": "inactive" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = integration()
        .handle_message(
            &json!({
                "action": "UPDATE_OBSERVABLE",
                "observableId": 42,
                "updateFields": { "status": "inactive", "confidence": "80" }
            }),
            &options(&server),
        )
        .await
        .unwrap();
    assert_eq!(result["status"], "inactive");
}

#[tokio::test]
async fn update_observable_requires_accepted_status() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v2/intelligence/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 42 })))
        .mount(&server)
        .await;

    let payload = integration()
        .handle_message(
            &json!({
                "action": "UPDATE_OBSERVABLE",
                "observableId": 42,
                "updateFields": { "tlp": "green" }
            }),
            &options(&server),
        )
        .await
        .unwrap_err();

    assert_eq!(payload.errors[0].status, "200");
    assert_eq!(payload.errors[0].meta.as_ref().unwrap()["expected"], 202);
}

#[tokio::test]
async fn create_comment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/intelligence/comments/"))
        .and(query_param("value", "evil.example"))
        .and(body_json(json!({ "comment": "blocked at the proxy", "tlp": "amber" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 9 })))
        .expect(1)
        .mount(&server)
        .await;

    let result = integration()
        .handle_message(
            &json!({
                "action": "CREATE_COMMENT",
                "value": "evil.example",
                "comment": "blocked at the proxy",
                "tlp": "amber"
            }),
            &options(&server),
        )
        .await
        .unwrap();
    assert_eq!(result["id"], 9);
}

#[tokio::test]
async fn unknown_action_is_invalid_input() {
    let server = MockServer::start().await;

    let payload = integration()
        .handle_message(&json!({ "action": "PURGE_ALL" }), &options(&server))
        .await
        .unwrap_err();

    assert_eq!(payload.errors[0].status, "400");
    assert_eq!(payload.errors[0].code, "ThreatStream_2C");
}
