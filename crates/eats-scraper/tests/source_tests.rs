//! Menu API client tests against a mock upstream.

use chrono::NaiveDate;
use eats_common::types::MealType;
use eats_scraper::config::{ApiConfig, DEFAULT_USER_AGENT};
use eats_scraper::source::{MenuApiClient, SourceError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        location_id: "loc-test".to_string(),
        breakfast_period_id: "p-breakfast".to_string(),
        lunch_period_id: "p-lunch".to_string(),
        dinner_period_id: "p-dinner".to_string(),
        request_timeout_secs: 5,
        ..ApiConfig::default()
    }
}

fn sample_menu_body() -> serde_json::Value {
    json!({
        "closed": false,
        "menu": {
            "periods": {
                "categories": [
                    {
                        "name": "Grill",
                        "items": [
                            {
                                "name": "Pancakes",
                                "desc": "Buttermilk",
                                "portion": "3 each",
                                "ingredients": "Flour, milk, eggs",
                                "calories": "350",
                                "nutrients": [
                                    {"name": "Protein (g)", "value_numeric": "8", "uom": "g"}
                                ],
                                "filters": [
                                    {"name": "Vegetarian", "type": "label"}
                                ]
                            }
                        ]
                    }
                ]
            }
        }
    })
}

#[tokio::test]
async fn test_fetch_decodes_menu() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/location/loc-test/periods/p-breakfast"))
        .and(query_param("date", "2024-10-27"))
        .and(query_param("platform", "0"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_menu_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = MenuApiClient::new(test_api_config(&server)).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap();

    let payload = client.fetch(date, MealType::Breakfast).await.unwrap();

    assert!(!payload.closed);
    let category = &payload.menu.periods.categories[0];
    assert_eq!(category.name, "Grill");
    assert_eq!(category.items[0].name, "Pancakes");
    assert_eq!(category.items[0].filters[0].kind, "label");
}

#[tokio::test]
async fn test_fetch_reports_http_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/location/loc-test/periods/p-lunch"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = MenuApiClient::new(test_api_config(&server)).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap();

    let err = client.fetch(date, MealType::Lunch).await.unwrap_err();
    assert!(matches!(err, SourceError::Status { status, .. } if status.as_u16() == 503));
}

#[tokio::test]
async fn test_fetch_reports_undecodable_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/location/loc-test/periods/p-dinner"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = MenuApiClient::new(test_api_config(&server)).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap();

    let err = client.fetch(date, MealType::Dinner).await.unwrap_err();
    assert!(matches!(err, SourceError::Http(_)));
}

#[tokio::test]
async fn test_fetch_decodes_closed_day() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/location/loc-test/periods/p-lunch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"closed": true})))
        .mount(&server)
        .await;

    let client = MenuApiClient::new(test_api_config(&server)).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();

    let payload = client.fetch(date, MealType::Lunch).await.unwrap();
    assert!(payload.closed);
}
