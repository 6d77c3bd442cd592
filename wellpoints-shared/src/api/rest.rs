//! Minimal REST client helpers for consumers (CLIs, scripts, tests).

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;
use std::time::Duration;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Some(Duration::from_secs(180)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(180))
        .timeout(Duration::from_secs(180))
        .build()
        .expect("failed to build HTTP client")
});

fn mk_client() -> Result<reqwest::Client, RestError> {
    Ok(HTTP_CLIENT.clone())
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

pub async fn login(base: &str, req: &AuthReq) -> Result<AuthResp, RestError> {
    let client = mk_client()?;
    let url = ep::auth_login(base);
    let res = client
        .post(url)
        .json(req)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn logout(base: &str, bearer: &str) -> Result<(), RestError> {
    let client = mk_client()?;
    let url = ep::auth_logout(base);
    let res = client
        .post(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    if res.status().is_success() {
        Ok(())
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(RestError::Status { status, body })
    }
}

pub async fn create_points(
    base: &str,
    bearer: &str,
    body: &PointsDto,
) -> Result<PointsDto, RestError> {
    let client = mk_client()?;
    let url = ep::points(base);
    let res = client
        .post(url)
        .bearer_auth(bearer)
        .json(body)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn update_points(
    base: &str,
    bearer: &str,
    body: &PointsDto,
) -> Result<PointsDto, RestError> {
    let client = mk_client()?;
    let url = ep::points(base);
    let res = client
        .put(url)
        .bearer_auth(bearer)
        .json(body)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn list_points(
    base: &str,
    bearer: &str,
    page: usize,
    per_page: usize,
) -> Result<Vec<PointsDto>, RestError> {
    let client = mk_client()?;
    let url = ep::points_page(base, page, per_page);
    let res = client
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn get_points(base: &str, bearer: &str, id: i32) -> Result<PointsDto, RestError> {
    let client = mk_client()?;
    let url = ep::points_by_id(base, id);
    let res = client
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn delete_points(base: &str, bearer: &str, id: i32) -> Result<(), RestError> {
    let client = mk_client()?;
    let url = ep::points_by_id(base, id);
    let res = client
        .delete(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    if res.status().is_success() {
        Ok(())
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(RestError::Status { status, body })
    }
}

pub async fn points_this_week(
    base: &str,
    bearer: &str,
    tz: Option<&str>,
) -> Result<PointsPerWeekDto, RestError> {
    let client = mk_client()?;
    let url = ep::points_this_week(base, tz);
    let res = client
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}
