//! Notification channels against a mock server.

use std::time::Duration;

use httpmock::prelude::*;
use roomwatch::models::{NotifyConfig, PushoverConfig, TelegramConfig, WebhookConfig};
use roomwatch::notify::Dispatcher;

const SUBJECT: &str = "ROOMS AVAILABLE! 1 new options";
const BODY: &str = "Hotel Availability Update\n\nNEW ROOMS AVAILABLE:\n• Lake - Twin on 2025-10-24: 2 rooms at ¥8000";

fn config(server: &MockServer) -> NotifyConfig {
    NotifyConfig {
        email: None,
        discord: Some(WebhookConfig { url: server.url("/discord") }),
        slack: Some(WebhookConfig { url: server.url("/slack") }),
        pushover: Some(PushoverConfig {
            token: "app-token".into(),
            user: "user-key".into(),
            api_url: server.url("/1/messages.json"),
        }),
        telegram: Some(TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: "-100".into(),
            api_base: server.base_url(),
        }),
    }
}

#[tokio::test]
async fn test_every_channel_attempted_despite_failure() {
    let server = MockServer::start_async().await;

    let discord = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/discord")
                .json_body_includes(format!(r#"{{"content": {}}}"#, serde_json::json!(BODY)));
            then.status(500).body("discord is down");
        })
        .await;
    let slack = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/slack")
                .json_body_includes(format!(r#"{{"text": "{SUBJECT}"}}"#));
            then.status(200).body("ok");
        })
        .await;
    let pushover = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/1/messages.json")
                .form_urlencoded_tuple("token", "app-token")
                .form_urlencoded_tuple("user", "user-key")
                .form_urlencoded_tuple("title", SUBJECT)
                .form_urlencoded_tuple("priority", "1");
            then.status(200).json_body(serde_json::json!({"status": 1}));
        })
        .await;
    let telegram = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .json_body_includes(r#"{"chat_id": "-100", "parse_mode": "Markdown"}"#);
            then.status(200).json_body(serde_json::json!({"ok": true}));
        })
        .await;

    let dispatcher = Dispatcher::from_config(
        &config(&server),
        reqwest::Client::new(),
        Duration::from_secs(5),
    );
    assert_eq!(
        dispatcher.channel_names(),
        vec!["discord", "slack", "pushover", "telegram"]
    );

    let report = dispatcher.notify(BODY, SUBJECT).await;

    discord.assert_async().await;
    slack.assert_async().await;
    pushover.assert_async().await;
    telegram.assert_async().await;

    assert_eq!(report.sent, vec!["slack", "pushover", "telegram"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "discord");
    assert!(report.failed[0].1.contains("500"));
}

#[tokio::test]
async fn test_unreachable_webhook_is_recorded() {
    let config = NotifyConfig {
        slack: Some(WebhookConfig {
            url: "http://127.0.0.1:9/slack".into(),
        }),
        ..Default::default()
    };
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let report = Dispatcher::from_config(&config, client, Duration::from_secs(2))
        .notify(BODY, SUBJECT)
        .await;
    assert!(report.all_failed());
    assert_eq!(report.failed[0].0, "slack");
}
