use crate::clients::ApiClient;
use crate::domain::models::{general_headers, TestUser};
use crate::error::{HarnessError, HarnessResult};
use reqwest::header::SET_COOKIE;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_PASSWORD: &str = "test";
pub const SESSION_COOKIE: &str = "fastapiusersauth";

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: String,
}

/// Creates platform users and logs them in.
pub struct UserManager;

impl UserManager {
    /// Register a user (default email `test<uuid>@test.com`) and log in.
    ///
    /// The platform makes the first registered user an admin.
    pub async fn create(api: &ApiClient, email: Option<&str>) -> HarnessResult<TestUser> {
        let email = match email {
            Some(email) => email.to_string(),
            None => format!("test{}@test.com", Uuid::new_v4()),
        };

        let body = RegisterRequest {
            email: &email,
            username: &email,
            password: DEFAULT_PASSWORD,
        };
        let registered: RegisterResponse = api
            .post_json("/auth/register", &body, &general_headers())
            .await?;

        info!("Created user {}", email);

        let user = TestUser::new(registered.id, email, DEFAULT_PASSWORD.to_string());
        Self::login_as_user(api, user).await
    }

    /// Log in and store the session cookie in the user's headers.
    pub async fn login_as_user(api: &ApiClient, mut user: TestUser) -> HarnessResult<TestUser> {
        let form = [("username", user.email.as_str()), ("password", user.password.as_str())];
        let response = api.post_form("/auth/login", &form, &user.headers).await?;

        let session = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_cookie_value)
            .ok_or_else(|| HarnessError::Login(format!("no session cookie for {}", user.email)))?;

        user.headers.insert(
            "Cookie".to_string(),
            format!("{}={}; ", SESSION_COOKIE, session),
        );

        info!("Logged in as {}", user.email);
        Ok(user)
    }
}

/// Value of the session cookie in a `Set-Cookie` header, if that is the one it sets.
fn session_cookie_value(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
}
