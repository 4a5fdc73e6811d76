//! Backend adapters over HTTP.

use chrono::NaiveDate;
use httpmock::prelude::*;
use roomwatch::models::{
    BackendConfig, HttpConfig, LegacyHtmlBackend, LegacyMarkup, ParseMethod, RoomStatus,
    StockQueryBackend,
};
use roomwatch::services::{build_adapter, fetch_and_parse};
use roomwatch::utils::http::create_client;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
}

fn stock_backend(api_url: String, targets: Vec<NaiveDate>) -> StockQueryBackend {
    StockQueryBackend {
        name: "Lake".into(),
        api_url,
        hotel_id: "20000122".into(),
        plan_id: "2".into(),
        guests: 2,
        lang: "JPN".into(),
        price_field: None,
        target_dates: targets,
        booking_url: None,
    }
}

const STOCK_JSONP: &str = "jsonp1760000000000({'rooms': [{'room_id': '7', 'room_name_eng': 'Twin',\n\
    'aki': [{'aki_date': '2025/10/24', 'aki_num': '2'}, {'aki_date': '2025/10/25', 'aki_num': '0'}],\n\
    'plans': [{'prices': [{'price_date': '2025/10/24', 'price_2': '8000'},\n\
    {'price_date': '2025/10/25', 'price_2': '9000'}]}]}]});";

#[tokio::test]
async fn test_stock_query_jsonp() {
    let server = MockServer::start_async().await;
    let api = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api")
                .query_param("id", "20000122")
                .query_param("planId", "2")
                .query_param("startDate", "2025/10/20")
                .query_param("endDate", "2025/10/26")
                .query_param_exists("callback");
            then.status(200).body(STOCK_JSONP);
        })
        .await;

    let client = create_client(&HttpConfig::default()).unwrap();
    let backend =
        BackendConfig::StockQuery(stock_backend(server.url("/api"), vec![date(24), date(25)]));
    let outcome = fetch_and_parse(build_adapter(&backend, &client).as_ref()).await;

    api.assert_async().await;
    assert!(!outcome.is_failure());
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].room_name, "Lake - Twin");
    assert_eq!(outcome.records[0].available_count, 2);
    assert_eq!(outcome.records[0].price, "¥8000");
    assert_eq!(outcome.records[1].status, RoomStatus::SoldOut);
}

#[tokio::test]
async fn test_stock_query_without_envelope_fails_soft() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;

    let client = create_client(&HttpConfig::default()).unwrap();
    let backend = BackendConfig::StockQuery(stock_backend(server.url("/api"), vec![date(24)]));
    let outcome = fetch_and_parse(build_adapter(&backend, &client).as_ref()).await;

    assert!(outcome.is_failure());
    assert!(outcome.records.is_empty());
    assert!(outcome.error.unwrap().contains("maintenance"));
}

#[tokio::test]
async fn test_paginated_json_skips_failed_week() {
    let server = MockServer::start_async().await;
    let first_week = server
        .mock_async(|when, then| {
            when.method(GET).path("/stock").query_param("startDate", "2025/10/20");
            then.status(200).json_body(serde_json::json!({
                "rooms": [{
                    "room_name": "和室",
                    "aki": [{"aki_date": "2025-10-24", "aki_num": 1}],
                    "plans": []
                }]
            }));
        })
        .await;
    let second_week = server
        .mock_async(|when, then| {
            when.method(GET).path("/stock").query_param("startDate", "2025/10/27");
            then.status(503);
        })
        .await;

    let client = create_client(&HttpConfig::default()).unwrap();
    let stock = stock_backend(server.url("/stock"), vec![date(24), date(28)]);
    let backend = BackendConfig::PaginatedJson(stock);
    let outcome = fetch_and_parse(build_adapter(&backend, &client).as_ref()).await;

    first_week.assert_async().await;
    second_week.assert_async().await;
    assert!(!outcome.is_failure());
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].room_name, "Lake - 和室");
    assert_eq!(outcome.records[0].price, "No price");
}

fn legacy_backend(url: String) -> LegacyHtmlBackend {
    LegacyHtmlBackend {
        name: "Old Inn".into(),
        url,
        target_dates: vec![date(24), date(25)],
        booking_url: None,
        max_nav_steps: 15,
        nav_delay_ms: 0,
        markup: LegacyMarkup::default(),
    }
}

#[tokio::test]
async fn test_legacy_search_form_and_next_period() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/menu.asp");
            then.status(200).header("content-type", "text/html; charset=utf-8").body(
                r#"<html><body>
                <form action="search.asp" method="post">
                  <select name="year"><option value="2025" selected>2025</option></select>
                  <select name="month"><option value="8" selected>8</option></select>
                  <input type="submit" name="go" value="この条件で空室状況を表示">
                </form></body></html>"#,
            );
        })
        .await;
    let search = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/search.asp")
                .form_urlencoded_tuple("year", "2025")
                .form_urlencoded_tuple("month", "10");
            then.status(200).header("content-type", "text/html; charset=utf-8").body(
                r#"<table><tr><th>部屋</th><th>10/20</th><th>10/21</th></tr>
                <tr><td>和室</td><td>○</td><td>○</td></tr></table>
                <a href="period.asp?p=2">後の期間</a>"#,
            );
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/period.asp").query_param("p", "2");
            then.status(200).header("content-type", "text/html; charset=utf-8").body(
                r#"<table><tr><th>部屋</th><th>10/24</th><th>10/25</th></tr>
                <tr><td>和室</td><td>○ 12,000円</td><td>×</td></tr>
                <tr><td>洋室ツイン</td><td>－</td><td>○</td></tr></table>"#,
            );
        })
        .await;

    let client = create_client(&HttpConfig::default()).unwrap();
    let backend = BackendConfig::LegacyHtml(legacy_backend(server.url("/menu.asp")));
    let outcome = fetch_and_parse(build_adapter(&backend, &client).as_ref()).await;

    search.assert_async().await;
    assert!(!outcome.is_failure(), "{:?}", outcome.error);
    assert_eq!(outcome.records.len(), 4);
    assert!(outcome.records.iter().all(|r| r.method == ParseMethod::Table));

    let available: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| r.status == RoomStatus::Available)
        .map(|r| (r.room_name.as_str(), r.date.as_str(), r.price.as_str()))
        .collect();
    assert_eq!(
        available,
        vec![
            ("Old Inn - 和室", "2025-10-24", "¥12,000"),
            ("Old Inn - 洋室ツイン", "2025-10-25", "No price"),
        ]
    );
}

#[tokio::test]
async fn test_legacy_landing_failure_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/menu.asp");
            then.status(404);
        })
        .await;

    let client = create_client(&HttpConfig::default()).unwrap();
    let backend = BackendConfig::LegacyHtml(legacy_backend(server.url("/menu.asp")));
    let outcome = fetch_and_parse(build_adapter(&backend, &client).as_ref()).await;

    assert!(outcome.is_failure());
    assert_eq!(outcome.kind, "legacy_html");
}
