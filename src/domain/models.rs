use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Document sources known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    Slack,
    File,
    Web,
    Github,
    Confluence,
    GoogleDrive,
    Notion,
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentSource::Slack => write!(f, "slack"),
            DocumentSource::File => write!(f, "file"),
            DocumentSource::Web => write!(f, "web"),
            DocumentSource::Github => write!(f, "github"),
            DocumentSource::Confluence => write!(f, "confluence"),
            DocumentSource::GoogleDrive => write!(f, "google_drive"),
            DocumentSource::Notion => write!(f, "notion"),
        }
    }
}

/// How a connector is driven by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    LoadState,
    Poll,
    Event,
    SlimRetrieval,
}

/// Access-control mode of a connector or CC-pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Public,
    Private,
    /// Document ACLs are copied from the source by permission sync
    Sync,
}

/// A platform user together with the headers that authenticate it.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub password: String,
    pub headers: HashMap<String, String>,
}

impl TestUser {
    pub fn new(id: String, email: String, password: String) -> Self {
        Self {
            id,
            email,
            password,
            headers: general_headers(),
        }
    }
}

/// Headers sent with every JSON request.
pub fn general_headers() -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

#[derive(Debug, Clone)]
pub struct TestCredential {
    pub id: i64,
    pub name: String,
    pub credential_json: serde_json::Value,
    pub admin_public: bool,
    pub source: DocumentSource,
    pub groups: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct TestConnector {
    pub id: i64,
    pub name: String,
    pub source: DocumentSource,
    pub input_type: InputType,
    pub connector_specific_config: serde_json::Value,
    pub access_type: AccessType,
    pub groups: Vec<i64>,
}

/// Connector-credential pair.
#[derive(Debug, Clone)]
pub struct TestCcPair {
    pub id: i64,
    pub name: String,
    pub connector_id: i64,
    pub credential_id: i64,
    pub access_type: AccessType,
    pub groups: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct TestLlmProvider {
    pub id: i64,
    pub name: String,
    pub provider: String,
    pub default_model_name: String,
    pub is_public: bool,
    pub groups: Vec<i64>,
}

/// A Slack channel the scenario writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
}

/// Indexing status row for one CC-pair.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingStatus {
    pub cc_pair_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default)]
    pub docs_indexed: i64,
}

/// Parse a platform timestamp. Values without an offset are taken as UTC.
pub fn parse_platform_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Datetime from an arbitrary JSON value: anything but a parsable string is `None`.
pub fn datetime_from_json(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_platform_datetime)
}

fn deserialize_lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(datetime_from_json))
}
