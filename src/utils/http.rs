// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Response};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// A fetched document and the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: String,
    pub body: String,
}

/// Create the shared HTTP client.
///
/// Cookies are kept so that form navigation on legacy pages stays within
/// one server-side session.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }
    if let Some(referer) = &config.referer {
        let value = HeaderValue::from_str(referer)
            .map_err(|e| AppError::config(format!("invalid referer header: {e}")))?;
        headers.insert(REFERER, value);
    }

    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Create a client for notification webhooks.
pub fn create_notify_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.notify_timeout_secs))
        .build()?;
    Ok(client)
}

/// GET a URL with query parameters.
pub async fn fetch_text_with_query<T>(client: &Client, url: &str, query: &T) -> Result<String>
where
    T: serde::Serialize + ?Sized,
{
    let response = client
        .get(url)
        .query(query)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}

/// Read a response into a [`Fetched`] document.
pub async fn into_fetched(response: Response) -> Result<Fetched> {
    let response = response.error_for_status()?;
    let url = response.url().to_string();
    let body = response.text().await?;
    Ok(Fetched { url, body })
}
