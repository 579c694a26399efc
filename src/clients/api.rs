use crate::error::{HarnessError, HarnessResult};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Client for the search platform's HTTP API.
///
/// Every call takes the acting user's headers; any non-2xx response is
/// turned into [`HarnessError::Http`] carrying the status and body.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> (RequestBuilder, String) {
        let url = self.url(path);
        let mut request = self.client.request(method, &url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        (request, url)
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> HarnessResult<T> {
        let (request, url) = self.request(Method::GET, path, headers);
        let response = Self::send(request, "GET", &url).await?;
        Ok(response.json().await?)
    }

    /// POST a JSON body and decode the JSON answer.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        headers: &HashMap<String, String>,
    ) -> HarnessResult<T> {
        let (request, url) = self.request(Method::POST, path, headers);
        let response = Self::send(request.json(body), "POST", &url).await?;
        Ok(response.json().await?)
    }

    /// PUT a JSON body and decode the JSON answer.
    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        headers: &HashMap<String, String>,
    ) -> HarnessResult<T> {
        let (request, url) = self.request(Method::PUT, path, headers);
        let response = Self::send(request.json(body), "PUT", &url).await?;
        Ok(response.json().await?)
    }

    /// POST a JSON body, ignoring whatever comes back.
    pub async fn post_json_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        headers: &HashMap<String, String>,
    ) -> HarnessResult<()> {
        let (request, url) = self.request(Method::POST, path, headers);
        Self::send(request.json(body), "POST", &url).await?;
        Ok(())
    }

    /// POST without a body (job triggers).
    pub async fn post_empty(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> HarnessResult<()> {
        let (request, url) = self.request(Method::POST, path, headers);
        Self::send(request, "POST", &url).await?;
        Ok(())
    }

    /// POST a form-encoded body and hand back the raw response.
    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
        headers: &HashMap<String, String>,
    ) -> HarnessResult<Response> {
        // The form sets its own Content-Type.
        let headers: HashMap<String, String> = headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let (request, url) = self.request(Method::POST, path, &headers);
        Self::send(request.form(form), "POST", &url).await
    }

    async fn send(request: RequestBuilder, method: &str, url: &str) -> HarnessResult<Response> {
        debug!("{} {}", method, url);

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HarnessError::Http {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }
}
