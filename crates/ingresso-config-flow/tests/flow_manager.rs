//! End-to-end wizard runs against a mocked content API

use std::sync::Arc;
use std::time::Duration;

use ingresso_api::IngressoApiClient;
use ingresso_config_entries::{ConfigEntries, ConfigEntryState, Storage};
use ingresso_config_flow::{FlowError, FlowManager, FlowResultType};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "São Paulo", "uf": "SP", "cities": [
                {"id": "1", "name": "São Paulo", "uf": "SP"}
            ]},
            {"name": "Pernambuco", "uf": "PE", "cities": [
                {"id": "48", "name": "Recife", "uf": "PE"}
            ]},
            {"name": "Acre", "uf": "AC", "cities": null}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v0/theaters/city/48/partnership/encora"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "1260", "name": "UCI Recife"},
                {"id": "1301", "name": "Cinépolis Recife"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v0/theaters/city/1/partnership/encora"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    server
}

async fn setup(server: &MockServer) -> (TempDir, Arc<ConfigEntries>, FlowManager) {
    let dir = TempDir::new().unwrap();
    let entries = Arc::new(ConfigEntries::new(
        Arc::new(Storage::new(dir.path())),
        "ingresso",
    ));
    let api = IngressoApiClient::new(server.uri(), Duration::from_secs(5), "Mozilla/5.0").unwrap();
    let manager = FlowManager::new(Arc::new(api), entries.clone(), "encora");
    (dir, entries, manager)
}

#[tokio::test]
async fn test_user_flow_persists_entry() {
    let server = mock_api().await;
    let (_dir, entries, manager) = setup(&server).await;

    let result = manager.start_user_flow().await.unwrap();
    assert_eq!(result.result_type, FlowResultType::Form);
    assert_eq!(result.step_id.as_deref(), Some("user"));
    let labels: Vec<_> = result.data_schema[0]
        .options
        .iter()
        .map(|o| o.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Recife - PE", "São Paulo - SP"]);
    assert_eq!(manager.list_flows().await.len(), 1);

    let flow_id = result.flow_id.clone();
    let result = manager
        .progress_flow(&flow_id, Some(json!({"city_id": "48"})))
        .await
        .unwrap();
    assert_eq!(result.step_id.as_deref(), Some("theater"));
    assert_eq!(
        result.description_placeholders.unwrap()["city_name"],
        "Recife"
    );

    let result = manager
        .progress_flow(&flow_id, Some(json!({"theater": "1260"})))
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some("Recife - UCI Recife"));
    assert_eq!(
        result.result.unwrap(),
        json!({
            "city_id": "48",
            "city_name": "Recife",
            "partnership": "encora",
            "theater": "1260",
            "theater_name": "UCI Recife"
        })
    );

    let entry = entries.get(result.entry_id.as_deref().unwrap()).unwrap();
    assert_eq!(entry.title, "Recife - UCI Recife");
    assert_eq!(entry.state, ConfigEntryState::Loaded);

    // Finished flows are forgotten
    assert!(manager.list_flows().await.is_empty());
    assert!(matches!(
        manager.progress_flow(&flow_id, None).await,
        Err(FlowError::UnknownFlow(_))
    ));
}

#[tokio::test]
async fn test_concurrent_final_submissions_create_one_entry() {
    let server = mock_api().await;
    let (_dir, entries, manager) = setup(&server).await;

    let flow_id = manager.start_user_flow().await.unwrap().flow_id;
    manager
        .progress_flow(&flow_id, Some(json!({"city_id": "48"})))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        manager.progress_flow(&flow_id, Some(json!({"theater": "1260"}))),
        manager.progress_flow(&flow_id, Some(json!({"theater": "1260"}))),
    );

    let created: Vec<_> = [a, b]
        .into_iter()
        .filter_map(|r| match r {
            Ok(result) => Some(result),
            Err(FlowError::UnknownFlow(_)) => None,
            Err(e) => panic!("unexpected error: {}", e),
        })
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].result_type, FlowResultType::CreateEntry);
    assert_eq!(entries.len(), 1);
    assert!(manager.list_flows().await.is_empty());
}

#[tokio::test]
async fn test_city_without_theaters() {
    let server = mock_api().await;
    let (_dir, entries, manager) = setup(&server).await;

    let flow_id = manager.start_user_flow().await.unwrap().flow_id;
    let result = manager
        .progress_flow(&flow_id, Some(json!({"city_id": "1"})))
        .await
        .unwrap();

    assert_eq!(result.step_id.as_deref(), Some("theater"));
    assert_eq!(result.error("base"), Some("no_theaters"));
    assert!(result.data_schema.is_empty());
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_options_flow_merges_into_entry() {
    let server = mock_api().await;
    let (_dir, entries, manager) = setup(&server).await;

    let flow_id = manager.start_user_flow().await.unwrap().flow_id;
    manager
        .progress_flow(&flow_id, Some(json!({"city_id": "48"})))
        .await
        .unwrap();
    let entry_id = manager
        .progress_flow(&flow_id, Some(json!({"theater": "1260"})))
        .await
        .unwrap()
        .entry_id
        .unwrap();

    let result = manager.start_options_flow(&entry_id).await.unwrap();
    assert_eq!(result.step_id.as_deref(), Some("init"));
    assert!(result.data_schema[0].default.is_none());

    let flows = manager.list_flows().await;
    assert_eq!(flows[0].source, "options");
    assert_eq!(flows[0].entry_id.as_deref(), Some(entry_id.as_str()));

    let flow_id = result.flow_id;
    let result = manager
        .progress_flow(&flow_id, Some(json!({"city_id": "48"})))
        .await
        .unwrap();
    assert_eq!(result.data_schema[0].default, Some(json!("1260")));

    let result = manager
        .progress_flow(&flow_id, Some(json!({"theater": "1301"})))
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some(""));
    assert_eq!(result.result, Some(json!({})));

    let entry = entries.get(&entry_id).unwrap();
    assert_eq!(entry.data["theater"], "1301");
    assert_eq!(entry.data["theater_name"], "Cinépolis Recife");
    assert_eq!(entry.state, ConfigEntryState::Loaded);
}

#[tokio::test]
async fn test_unknown_ids() {
    let server = mock_api().await;
    let (_dir, _entries, manager) = setup(&server).await;

    assert!(matches!(
        manager.start_options_flow("missing").await,
        Err(FlowError::UnknownEntry(_))
    ));
    assert!(matches!(
        manager.abort_flow("missing").await,
        Err(FlowError::UnknownFlow(_))
    ));

    let flow_id = manager.start_user_flow().await.unwrap().flow_id;
    let result = manager.abort_flow(&flow_id).await.unwrap();
    assert_eq!(result.result_type, FlowResultType::Abort);
    assert!(manager.list_flows().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_api() {
    let dir = TempDir::new().unwrap();
    let entries = Arc::new(ConfigEntries::new(
        Arc::new(Storage::new(dir.path())),
        "ingresso",
    ));
    let api = IngressoApiClient::new("http://127.0.0.1:1", Duration::from_secs(2), "Mozilla/5.0")
        .unwrap();
    let manager = FlowManager::new(Arc::new(api), entries, "encora");

    let result = manager.start_user_flow().await.unwrap();
    assert_eq!(result.step_id.as_deref(), Some("user"));
    assert_eq!(result.error("base"), Some("cannot_connect"));
}
