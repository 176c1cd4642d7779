//! Session authentication and child resolution
//!
//! Credentials are exchanged for a session cookie via a form-encoded login
//! POST; the session token is the `sessionid` cookie value. The account
//! profile endpoint then yields the children registered to the account.

use crate::error::{Error, Result};
use crate::http::HttpExecutor;
use crate::types::{Child, Session};
use serde::Deserialize;

/// Login endpoint path
const LOGIN_PATH: &str = "/kr/login";
/// Account profile endpoint path
const PROFILE_PATH: &str = "/api/v1/me/info";

#[derive(Deserialize)]
struct Profile {
    #[serde(default)]
    children: Option<Vec<ProfileChild>>,
}

#[derive(Deserialize)]
struct ProfileChild {
    id: serde_json::Value,
    name: String,
}

/// Exchange credentials for a session token
///
/// POSTs form-encoded `username`/`password` to the login endpoint. Success
/// is signaled solely by a `sessionid` cookie in the response; its absence
/// is an [`Error::Auth`], distinct from transport failures.
pub async fn login(
    executor: &HttpExecutor,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<Session> {
    tracing::info!(username = %username, "Logging in");

    let request = executor
        .client()
        .post(format!("{base_url}{LOGIN_PATH}"))
        .form(&[("username", username), ("password", password)]);

    let response = executor.execute(request).await?;

    let token = response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(extract_session_id)
        .ok_or(Error::Auth)?;

    tracing::info!("Login succeeded");
    Ok(Session::new(token))
}

/// Pull the `sessionid` value out of one Set-Cookie header
fn extract_session_id(header: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("sessionid=")
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// List the children registered to the authenticated account
///
/// An account with zero children yields an empty list, not an error.
/// HTTP 401 maps to [`Error::SessionExpired`]; any other status above 400
/// maps to [`Error::UpstreamUnavailable`].
pub async fn list_children(
    executor: &HttpExecutor,
    base_url: &str,
    session: &Session,
) -> Result<Vec<Child>> {
    let request = executor
        .client()
        .get(format!("{base_url}{PROFILE_PATH}"))
        .header("cookie", format!("sessionid={}", session.token()));

    let (status, body) = executor.execute_buffered(request).await?;

    if status == 401 {
        tracing::warn!("Session expired while fetching account profile");
        return Err(Error::SessionExpired);
    }
    if status > 400 {
        tracing::warn!(status = status, "Upstream unavailable while fetching account profile");
        return Err(Error::UpstreamUnavailable { status });
    }

    let profile: Profile = serde_json::from_slice(&body)?;
    let children = profile
        .children
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, c)| Child {
            id: match c.id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            },
            name: c.name,
            index: i + 1,
        })
        .collect::<Vec<_>>();

    tracing::info!(count = children.len(), "Resolved children");
    Ok(children)
}
