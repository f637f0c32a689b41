use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use privmatch_core::{AsyncEntityStore, EntityStore, SimilarityMetric, StoreConfig};
use privmatch_server::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let store = EntityStore::in_memory(StoreConfig::new(3, SimilarityMetric::Cosine));
    app(AppState::new(AsyncEntityStore::from_sync(store), 10))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn person(name: &str, owner: &str, embedding: [f32; 3], attributes: Value) -> Value {
    json!({
        "entityType": "person",
        "name": name,
        "ownedByUserId": owner,
        "attributes": attributes,
        "embedding": embedding,
        "privacySettings": {
            "fieldVisibilityMap": {"attributes.birthday": "Private"},
            "defaultVisibility": "Public"
        }
    })
}

async fn create(app: &Router, body: Value) -> String {
    let (status, entity) = call(app, Method::POST, "/entities", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    entity["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_count() {
    let app = test_app();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["entities"], 0);
}

#[tokio::test]
async fn create_validates_input() {
    let app = test_app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/entities",
        Some(json!({"entityType": "person", "name": "", "ownedByUserId": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/entities",
        Some(json!({
            "entityType": "person", "name": "A", "ownedByUserId": "u1",
            "embedding": [1.0, 0.0]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/entities",
        Some(json!({
            "entityType": "person", "name": "A", "ownedByUserId": "u1",
            "privacySettings": {"fieldVisibilityMap": {}, "defaultVisibility": "Everyone"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_id_conflicts() {
    let app = test_app();
    let body = json!({
        "id": "6f9619ff-8b86-4011-b42d-00c04fc964ff",
        "entityType": "person", "name": "A", "ownedByUserId": "u1"
    });
    create(&app, body.clone()).await;
    let (status, _) = call(&app, Method::POST, "/entities", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn get_entity_redacts_for_strangers() {
    let app = test_app();
    let id = create(
        &app,
        person("Ana", "u1", [1.0, 0.0, 0.0], json!({"city": "Porto", "birthday": "1990-01-01"})),
    )
    .await;

    let (status, view) = call(&app, Method::GET, &format!("/entities/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["name"], "Ana");
    assert_eq!(view["attributes"]["city"], "Porto");
    assert!(view["attributes"].get("birthday").is_none());
    assert!(view.get("embedding").is_none());

    let (_, full) = call(
        &app,
        Method::GET,
        &format!("/entities/{}?requestingUserId=u1", id),
        None,
    )
    .await;
    assert_eq!(full["attributes"]["birthday"], "1990-01-01");
    assert_eq!(full["ownedByUserId"], "u1");
}

#[tokio::test]
async fn missing_entity_is_404() {
    let app = test_app();
    let uri = "/entities/6f9619ff-8b86-4011-b42d-00c04fc964ff";

    let (status, body) = call(&app, Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::DELETE, uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_entity() {
    let app = test_app();
    let id = create(&app, person("Ana", "u1", [1.0, 0.0, 0.0], json!({}))).await;

    let (status, _) = call(&app, Method::DELETE, &format!("/entities/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, &format!("/entities/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_attributes_and_searchable() {
    let app = test_app();
    let id = create(
        &app,
        person("Ana", "u1", [1.0, 0.0, 0.0], json!({"city": "Porto", "remote": false})),
    )
    .await;

    let (status, entity) = call(
        &app,
        Method::PATCH,
        &format!("/entities/{}/attributes", id),
        Some(json!({"set": {"remote": true, "level": 3}, "remove": ["city"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entity["attributes"]["remote"], true);
    assert_eq!(entity["attributes"]["level"], 3);
    assert!(entity["attributes"].get("city").is_none());

    let (status, entity) = call(
        &app,
        Method::PATCH,
        &format!("/entities/{}/searchable", id),
        Some(json!({"isSearchable": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entity["isSearchable"], false);

    let (_, results) = call(
        &app,
        Method::POST,
        "/search",
        Some(json!({"queryEmbedding": [1.0, 0.0, 0.0]})),
    )
    .await;
    assert!(results["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn put_embedding_and_privacy() {
    let app = test_app();
    let id = create(&app, person("Ana", "u1", [1.0, 0.0, 0.0], json!({"city": "Porto"}))).await;

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/entities/{}/embedding", id),
        Some(json!({"embedding": [0.0, 1.0]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, entity) = call(
        &app,
        Method::PUT,
        &format!("/entities/{}/embedding", id),
        Some(json!({"embedding": [0.0, 1.0, 0.0]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entity["embedding"], json!([0.0, 1.0, 0.0]));

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/entities/{}/privacy", id),
        Some(json!({"fieldVisibilityMap": {}, "defaultVisibility": "Private"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = call(&app, Method::GET, &format!("/entities/{}", id), None).await;
    assert!(view.get("name").is_none());
    assert_eq!(view["attributes"], json!({}));
}

#[tokio::test]
async fn list_user_entities() {
    let app = test_app();
    create(&app, person("Ana", "u1", [1.0, 0.0, 0.0], json!({}))).await;
    create(&app, person("Job", "u1", [0.0, 1.0, 0.0], json!({}))).await;
    create(&app, person("Ben", "u2", [0.0, 0.0, 1.0], json!({}))).await;

    let (status, list) = call(&app, Method::GET, "/users/u1/entities", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_filters_and_redacts() {
    let app = test_app();
    create(
        &app,
        person(
            "Ana",
            "u1",
            [1.0, 0.0, 0.0],
            json!({"petTypes": ["Dog", "Cat"], "riskTolerance": 8, "birthday": "1990-01-01"}),
        ),
    )
    .await;
    create(
        &app,
        person(
            "Ben",
            "u2",
            [0.9, 0.1, 0.0],
            json!({"petTypes": ["Fish"], "riskTolerance": 9, "birthday": "1985-05-05"}),
        ),
    )
    .await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/search",
        Some(json!({
            "query": "dog people who like risk",
            "queryEmbedding": [1.0, 0.0, 0.0],
            "attributeFilters": {
                "logicalOperator": "AND",
                "filters": [
                    {"fieldPath": "petTypes", "operator": "Contains", "value": "Dog"},
                    {"fieldPath": "attributes.riskTolerance", "operator": "GreaterThan", "value": 7}
                ]
            },
            "requestingUserId": "stranger"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Ana");
    assert!(results[0]["attributes"].get("birthday").is_none());
    assert!(results[0]["similarityScore"].as_f64().unwrap() > 0.99);
}

#[tokio::test]
async fn search_rejects_bad_requests() {
    let app = test_app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/search",
        Some(json!({
            "queryEmbedding": [1.0, 0.0, 0.0],
            "attributeFilters": {"filters": [
                {"fieldPath": "age", "operator": "Like", "value": 3}
            ]}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Like"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/search",
        Some(json!({"queryEmbedding": [1.0, 0.0]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/search",
        Some(json!({"queryEmbedding": [1.0, 0.0, 0.0], "limit": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
