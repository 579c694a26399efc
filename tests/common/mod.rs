//! In-process fake of the search platform and the Slack Web API.
//!
//! Indexing, permission sync and pruning complete synchronously when
//! triggered; documents carry the channel membership copied by the last
//! permission sync.

#![allow(dead_code)]

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::{DateTime, Utc};
use connector_job_tests::config::Config;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

pub const BOT_TOKEN: &str = "xoxb-test";
pub const BOT_USER_ID: &str = "UBOT";
pub const ADMIN_EMAIL: &str = "admin@onyx-test.com";
pub const TEST_USER_EMAIL: &str = "test_user_1@onyx-test.com";
pub const OUTSIDER_EMAIL: &str = "outsider@onyx-test.com";
const SESSION_COOKIE: &str = "fastapiusersauth";
/// Slack pages are capped so pagination is exercised.
const SLACK_PAGE_SIZE: usize = 2;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct FakeConnector {
    pub name: String,
    pub source: String,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FakeCcPair {
    pub name: String,
    pub connector_id: i64,
    pub credential_id: i64,
    pub access_type: String,
    pub last_success: Option<DateTime<Utc>>,
    pub last_synced: Option<DateTime<Utc>>,
    pub last_pruned: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct FakeDoc {
    pub cc_pair_id: i64,
    pub channel_id: String,
    pub ts: String,
    pub content: String,
    pub public: bool,
    pub acl: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct Platform {
    pub users: Vec<FakeUser>,
    pub sessions: HashMap<String, String>,
    pub next_id: i64,
    pub credentials: HashMap<i64, Value>,
    pub connectors: HashMap<i64, FakeConnector>,
    pub cc_pairs: HashMap<i64, FakeCcPair>,
    pub documents: HashMap<String, FakeDoc>,
    pub llm_providers: Vec<i64>,
    pub default_llm_provider: Option<i64>,
    /// When set, job triggers are accepted but never complete
    pub hold_jobs: bool,
    /// When set, login succeeds without setting a session cookie
    pub omit_session_cookie: bool,
    /// When set, every indexing status reports a run in progress
    pub indexing_in_progress: bool,
}

impl Platform {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Clone)]
pub struct FakeSlackUser {
    pub id: String,
    pub email: Option<String>,
    pub is_bot: bool,
}

#[derive(Debug, Clone)]
pub struct FakeChannel {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub is_general: bool,
    pub is_archived: bool,
    pub members: Vec<String>,
    /// Oldest first
    pub messages: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct Workspace {
    pub users: Vec<FakeSlackUser>,
    pub channels: Vec<FakeChannel>,
    pub next_ts: u64,
    pub next_channel: u64,
    /// When set, chat.postMessage answers ok without a ts
    pub omit_message_ts: bool,
}

impl Workspace {
    fn seeded() -> Self {
        let user = |id: &str, email: Option<&str>, is_bot: bool| FakeSlackUser {
            id: id.to_string(),
            email: email.map(String::from),
            is_bot,
        };
        let mut workspace = Workspace {
            users: vec![
                user(BOT_USER_ID, None, true),
                user("UADMIN", Some(ADMIN_EMAIL), false),
                user("UTEST1", Some(TEST_USER_EMAIL), false),
                user("UOUT", Some(OUTSIDER_EMAIL), false),
            ],
            ..Default::default()
        };
        let general = workspace.new_channel("general", false);
        general.is_general = true;
        general.members = vec![BOT_USER_ID.to_string(), "UADMIN".to_string(), "UTEST1".to_string()];
        workspace
    }

    pub fn new_channel(&mut self, name: &str, is_private: bool) -> &mut FakeChannel {
        self.next_channel += 1;
        self.channels.push(FakeChannel {
            id: format!("C{:04}", self.next_channel),
            name: name.to_string(),
            is_private,
            is_general: false,
            is_archived: false,
            members: vec![BOT_USER_ID.to_string()],
            messages: Vec::new(),
        });
        self.channels.last_mut().unwrap()
    }

    fn next_ts(&mut self) -> String {
        self.next_ts += 1;
        format!("{}.{:06}", Utc::now().timestamp(), self.next_ts)
    }

    pub fn channel_by_name(&self, name: &str) -> Option<&FakeChannel> {
        self.channels.iter().find(|c| c.name == name)
    }

    fn channel_mut(&mut self, id: &str) -> Option<&mut FakeChannel> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    fn email_of(&self, user_id: &str) -> Option<String> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| u.email.clone())
    }
}

pub struct FakeState {
    pub platform: RwLock<Platform>,
    pub slack: RwLock<Workspace>,
}

impl FakeState {
    pub fn seeded() -> Self {
        Self {
            platform: RwLock::new(Platform::default()),
            slack: RwLock::new(Workspace::seeded()),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct FakeServer {
    pub url: String,
    pub state: web::Data<FakeState>,
    handle: ServerHandle,
}

impl FakeServer {
    pub async fn start() -> Self {
        init_tracing();

        let state = web::Data::new(FakeState::seeded());
        let app_state = state.clone();

        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .configure(configure_routes)
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind fake server");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        tokio::spawn(server);

        Self {
            url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn slack_url(&self) -> String {
        format!("{}/slack", self.url)
    }

    /// Config pointing at this server with fast polling.
    pub fn config(&self) -> Config {
        Config {
            api_server_url: self.url.clone(),
            slack_api_url: self.slack_url(),
            slack_bot_token: Some(BOT_TOKEN.to_string()),
            openai_api_key: Some("sk-test".to_string()),
            slack_workspace: "onyx-test-workspace".to_string(),
            admin_email: ADMIN_EMAIL.to_string(),
            test_user_email: TEST_USER_EMAIL.to_string(),
            poll_interval: Duration::from_millis(10),
            max_delay: Duration::from_secs(2),
            sync_settle: Duration::ZERO,
        }
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("connector_job_tests=debug")
        .with_test_writer()
        .try_init();
}

fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login)),
    );

    cfg.service(
        web::scope("/admin/llm/provider")
            .route("", web::put().to(upsert_llm_provider))
            .route("/{id}/default", web::post().to(set_default_llm_provider)),
    );

    cfg.service(
        web::scope("/manage")
            .route("/credential", web::post().to(create_credential))
            .route(
                "/connector/{connector_id}/credential/{credential_id}",
                web::put().to(create_cc_pair),
            )
            .route("/admin/connector", web::post().to(create_connector))
            .route("/admin/connector/run-once", web::post().to(run_once))
            .route("/admin/connector/indexing-status", web::get().to(indexing_status))
            .route("/admin/cc-pair/{id}/sync", web::post().to(trigger_sync))
            .route("/admin/cc-pair/{id}/sync", web::get().to(last_synced))
            .route("/admin/cc-pair/{id}/prune", web::post().to(trigger_prune))
            .route("/admin/cc-pair/{id}/last_pruned", web::get().to(last_pruned)),
    );

    cfg.route("/query/document-search", web::post().to(document_search));
    cfg.route("/slack/{method}", web::post().to(slack_method));
}

// ---------------------------------------------------------------------------
// Platform handlers
// ---------------------------------------------------------------------------

fn detail(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "detail": message }))
}

fn session_token(req: &HttpRequest) -> Option<String> {
    let cookie = req.headers().get("Cookie")?.to_str().ok()?;
    cookie.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn current_user(req: &HttpRequest, platform: &Platform) -> Result<FakeUser, HttpResponse> {
    let token = session_token(req)
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Unauthorized"))?;
    let email = platform
        .sessions
        .get(&token)
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Unauthorized"))?;
    platform
        .users
        .iter()
        .find(|u| &u.email == email)
        .cloned()
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

fn require_admin(req: &HttpRequest, platform: &Platform) -> Result<FakeUser, HttpResponse> {
    let user = current_user(req, platform)?;
    if !user.is_admin {
        return Err(detail(
            StatusCode::FORBIDDEN,
            "Access denied. User is not an admin.",
        ));
    }
    Ok(user)
}

#[derive(Deserialize)]
struct RegisterBody {
    email: String,
    password: String,
}

async fn register(state: web::Data<FakeState>, body: web::Json<RegisterBody>) -> HttpResponse {
    let mut platform = state.platform.write().unwrap();
    if platform.users.iter().any(|u| u.email == body.email) {
        return detail(StatusCode::BAD_REQUEST, "REGISTER_USER_ALREADY_EXISTS");
    }
    let user = FakeUser {
        id: Uuid::new_v4().to_string(),
        email: body.email.clone(),
        password: body.password.clone(),
        is_admin: platform.users.is_empty(),
    };
    let role = if user.is_admin { "admin" } else { "basic" };
    let response = json!({ "id": user.id, "email": user.email, "is_active": true, "role": role });
    platform.users.push(user);
    HttpResponse::Created().json(response)
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(state: web::Data<FakeState>, form: web::Form<LoginForm>) -> HttpResponse {
    let mut platform = state.platform.write().unwrap();
    let valid = platform
        .users
        .iter()
        .any(|u| u.email == form.username && u.password == form.password);
    if !valid {
        return detail(StatusCode::BAD_REQUEST, "LOGIN_BAD_CREDENTIALS");
    }
    if platform.omit_session_cookie {
        return HttpResponse::NoContent().finish();
    }
    let token = Uuid::new_v4().simple().to_string();
    platform.sessions.insert(token.clone(), form.username.clone());
    HttpResponse::NoContent()
        .insert_header((
            "Set-Cookie",
            format!("{}={}; HttpOnly; Path=/; SameSite=lax", SESSION_COOKIE, token),
        ))
        .finish()
}

async fn upsert_llm_provider(
    req: HttpRequest,
    state: web::Data<FakeState>,
    body: web::Json<Value>,
) -> HttpResponse {
    let mut platform = state.platform.write().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    let id = platform.next_id();
    platform.llm_providers.push(id);
    HttpResponse::Ok().json(json!({ "id": id, "name": body["name"], "provider": body["provider"] }))
}

async fn set_default_llm_provider(
    req: HttpRequest,
    state: web::Data<FakeState>,
    path: web::Path<i64>,
) -> HttpResponse {
    let mut platform = state.platform.write().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    let id = path.into_inner();
    if !platform.llm_providers.contains(&id) {
        return detail(StatusCode::NOT_FOUND, "LLM provider not found");
    }
    platform.default_llm_provider = Some(id);
    HttpResponse::Ok().finish()
}

async fn create_credential(
    req: HttpRequest,
    state: web::Data<FakeState>,
    body: web::Json<Value>,
) -> HttpResponse {
    let mut platform = state.platform.write().unwrap();
    if let Err(resp) = current_user(&req, &platform) {
        return resp;
    }
    let id = platform.next_id();
    platform.credentials.insert(id, body.into_inner());
    HttpResponse::Ok().json(json!({ "id": id }))
}

async fn create_connector(
    req: HttpRequest,
    state: web::Data<FakeState>,
    body: web::Json<Value>,
) -> HttpResponse {
    let mut platform = state.platform.write().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    let channels = body["connector_specific_config"]["channels"]
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let connector = FakeConnector {
        name: body["name"].as_str().unwrap_or_default().to_string(),
        source: body["source"].as_str().unwrap_or_default().to_string(),
        channels,
    };
    let id = platform.next_id();
    platform.connectors.insert(id, connector);
    HttpResponse::Ok().json(json!({ "id": id }))
}

async fn create_cc_pair(
    req: HttpRequest,
    state: web::Data<FakeState>,
    path: web::Path<(i64, i64)>,
    body: web::Json<Value>,
) -> HttpResponse {
    let (connector_id, credential_id) = path.into_inner();
    let id = {
        let mut platform = state.platform.write().unwrap();
        if let Err(resp) = require_admin(&req, &platform) {
            return resp;
        }
        if !platform.connectors.contains_key(&connector_id)
            || !platform.credentials.contains_key(&credential_id)
        {
            return detail(StatusCode::NOT_FOUND, "Connector or credential not found");
        }
        let id = platform.next_id();
        platform.cc_pairs.insert(
            id,
            FakeCcPair {
                name: body["name"].as_str().unwrap_or_default().to_string(),
                connector_id,
                credential_id,
                access_type: body["access_type"].as_str().unwrap_or("public").to_string(),
                last_success: None,
                last_synced: None,
                last_pruned: None,
            },
        );
        id
    };
    // New CC-pairs get an initial indexing run
    run_indexing(&state, id);
    HttpResponse::Ok().json(json!({ "success": true, "message": "Created", "data": id }))
}

#[derive(Deserialize)]
struct RunOnceBody {
    connector_id: i64,
    credential_ids: Vec<i64>,
}

async fn run_once(
    req: HttpRequest,
    state: web::Data<FakeState>,
    body: web::Json<RunOnceBody>,
) -> HttpResponse {
    let ids: Vec<i64> = {
        let platform = state.platform.read().unwrap();
        if let Err(resp) = require_admin(&req, &platform) {
            return resp;
        }
        platform
            .cc_pairs
            .iter()
            .filter(|(_, p)| {
                p.connector_id == body.connector_id
                    && body.credential_ids.contains(&p.credential_id)
            })
            .map(|(id, _)| *id)
            .collect()
    };
    if ids.is_empty() {
        return detail(StatusCode::NOT_FOUND, "Connector has no valid credentials");
    }
    for id in &ids {
        run_indexing(&state, *id);
    }
    HttpResponse::Ok().json(json!({ "success": true, "message": "Triggered", "data": ids }))
}

/// Copy every message of the connector's channels into the index.
fn run_indexing(state: &FakeState, cc_pair_id: i64) {
    let slack = state.slack.read().unwrap();
    let mut platform = state.platform.write().unwrap();
    if platform.hold_jobs {
        return;
    }
    let Some(pair) = platform.cc_pairs.get(&cc_pair_id).cloned() else {
        return;
    };
    let Some(connector) = platform.connectors.get(&pair.connector_id).cloned() else {
        return;
    };

    for channel in connector.channels.iter().filter_map(|name| slack.channel_by_name(name)) {
        for (ts, text) in &channel.messages {
            let doc_id = format!("{}__{}", channel.id, ts);
            let public = pair.access_type == "public" || !channel.is_private;
            platform
                .documents
                .entry(doc_id)
                .and_modify(|doc| doc.content = text.clone())
                .or_insert_with(|| FakeDoc {
                    cc_pair_id,
                    channel_id: channel.id.clone(),
                    ts: ts.clone(),
                    content: text.clone(),
                    public,
                    acl: HashSet::new(),
                });
        }
    }

    if let Some(pair) = platform.cc_pairs.get_mut(&cc_pair_id) {
        pair.last_success = Some(Utc::now());
    }
}

async fn indexing_status(req: HttpRequest, state: web::Data<FakeState>) -> HttpResponse {
    let platform = state.platform.read().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    let statuses: Vec<Value> = platform
        .cc_pairs
        .iter()
        .map(|(id, pair)| {
            let docs_indexed = platform.documents.values().filter(|d| d.cc_pair_id == *id).count();
            json!({
                "cc_pair_id": id,
                "name": pair.name,
                "in_progress": platform.indexing_in_progress,
                "last_success": pair.last_success.map(|t| t.to_rfc3339()),
                "docs_indexed": docs_indexed,
            })
        })
        .collect();
    HttpResponse::Ok().json(statuses)
}

async fn trigger_sync(
    req: HttpRequest,
    state: web::Data<FakeState>,
    path: web::Path<i64>,
) -> HttpResponse {
    let id = path.into_inner();
    let slack = state.slack.read().unwrap();
    let mut platform = state.platform.write().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    if !platform.cc_pairs.contains_key(&id) {
        return detail(StatusCode::NOT_FOUND, "CC pair not found");
    }
    if platform.hold_jobs {
        return HttpResponse::Ok().json(json!({ "success": true }));
    }

    for doc in platform.documents.values_mut().filter(|d| d.cc_pair_id == id) {
        if let Some(channel) = slack.channels.iter().find(|c| c.id == doc.channel_id) {
            doc.public = !channel.is_private;
            doc.acl = channel
                .members
                .iter()
                .filter_map(|member| slack.email_of(member))
                .collect();
        }
    }
    if let Some(pair) = platform.cc_pairs.get_mut(&id) {
        pair.last_synced = Some(Utc::now());
    }
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn last_synced(
    req: HttpRequest,
    state: web::Data<FakeState>,
    path: web::Path<i64>,
) -> HttpResponse {
    let platform = state.platform.read().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    match platform.cc_pairs.get(&path.into_inner()) {
        Some(pair) => HttpResponse::Ok().json(pair.last_synced.map(|t| t.to_rfc3339())),
        None => detail(StatusCode::NOT_FOUND, "CC pair not found"),
    }
}

async fn trigger_prune(
    req: HttpRequest,
    state: web::Data<FakeState>,
    path: web::Path<i64>,
) -> HttpResponse {
    let id = path.into_inner();
    let slack = state.slack.read().unwrap();
    let mut platform = state.platform.write().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    if !platform.cc_pairs.contains_key(&id) {
        return detail(StatusCode::NOT_FOUND, "CC pair not found");
    }
    if platform.hold_jobs {
        return HttpResponse::Ok().json(json!({ "success": true }));
    }

    platform.documents.retain(|_, doc| {
        doc.cc_pair_id != id
            || slack
                .channels
                .iter()
                .find(|c| c.id == doc.channel_id)
                .is_some_and(|c| c.messages.iter().any(|(ts, _)| ts == &doc.ts))
    });
    if let Some(pair) = platform.cc_pairs.get_mut(&id) {
        pair.last_pruned = Some(Utc::now());
    }
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn last_pruned(
    req: HttpRequest,
    state: web::Data<FakeState>,
    path: web::Path<i64>,
) -> HttpResponse {
    let platform = state.platform.read().unwrap();
    if let Err(resp) = require_admin(&req, &platform) {
        return resp;
    }
    match platform.cc_pairs.get(&path.into_inner()) {
        Some(pair) => HttpResponse::Ok().json(pair.last_pruned.map(|t| t.to_rfc3339())),
        None => detail(StatusCode::NOT_FOUND, "CC pair not found"),
    }
}

async fn document_search(
    req: HttpRequest,
    state: web::Data<FakeState>,
    body: web::Json<Value>,
) -> HttpResponse {
    let platform = state.platform.read().unwrap();
    let user = match current_user(&req, &platform) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if body["search_type"] != "keyword" || body["evaluation_type"] != "skip" {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "unsupported search options",
        );
    }

    let terms: Vec<String> = body["message"]
        .as_str()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let mut hits: Vec<(&String, &FakeDoc)> = platform
        .documents
        .iter()
        .filter(|(_, doc)| doc.public || doc.acl.contains(&user.email))
        .filter(|(_, doc)| {
            let content = doc.content.to_lowercase();
            terms.iter().all(|term| content.contains(term))
        })
        .collect();
    hits.sort_by(|a, b| a.0.cmp(b.0));

    let top_documents: Vec<Value> = hits
        .into_iter()
        .map(|(id, doc)| {
            json!({
                "document_id": id,
                "semantic_identifier": format!("#{}", doc.channel_id),
                "content": doc.content,
                "blurb": doc.content,
                "source_type": "slack",
                "score": 1.0,
                "link": null,
            })
        })
        .collect();

    HttpResponse::Ok().json(json!({ "top_documents": top_documents, "llm_indices": [] }))
}

// ---------------------------------------------------------------------------
// Slack handlers
// ---------------------------------------------------------------------------

fn slack_ok(mut body: Value) -> HttpResponse {
    body["ok"] = Value::Bool(true);
    HttpResponse::Ok().json(body)
}

fn slack_err(error: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "ok": false, "error": error }))
}

/// One page of `items` starting at the numeric `cursor`.
fn paginate(items: Vec<Value>, params: &HashMap<String, String>) -> (Vec<Value>, String) {
    let start: usize = params.get("cursor").and_then(|c| c.parse().ok()).unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(SLACK_PAGE_SIZE)
        .min(SLACK_PAGE_SIZE);
    let end = (start + limit).min(items.len());
    let page = items.get(start..end).map(<[Value]>::to_vec).unwrap_or_default();
    let next = if end < items.len() { end.to_string() } else { String::new() };
    (page, next)
}

fn channel_json(channel: &FakeChannel) -> Value {
    json!({
        "id": channel.id,
        "name": channel.name,
        "is_private": channel.is_private,
        "is_general": channel.is_general,
        "is_archived": channel.is_archived,
    })
}

async fn slack_method(
    req: HttpRequest,
    state: web::Data<FakeState>,
    path: web::Path<String>,
    form: web::Form<HashMap<String, String>>,
) -> HttpResponse {
    let authorized = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", BOT_TOKEN));
    if !authorized {
        return slack_err("invalid_auth");
    }

    let params = form.into_inner();
    let param = |name: &str| params.get(name).cloned().unwrap_or_default();
    let mut slack = state.slack.write().unwrap();

    match path.as_str() {
        "users.list" => {
            let users: Vec<Value> = slack
                .users
                .iter()
                .map(|u| {
                    json!({
                        "id": u.id,
                        "name": u.id.to_lowercase(),
                        "is_bot": u.is_bot,
                        "profile": { "email": u.email },
                    })
                })
                .collect();
            let (page, next) = paginate(users, &params);
            slack_ok(json!({ "members": page, "response_metadata": { "next_cursor": next } }))
        }
        "conversations.list" => {
            let types = param("types");
            let exclude_archived = param("exclude_archived") == "true";
            let channels: Vec<Value> = slack
                .channels
                .iter()
                .filter(|c| {
                    let kind = if c.is_private { "private_channel" } else { "public_channel" };
                    types.split(',').any(|t| t == kind)
                })
                .filter(|c| !(exclude_archived && c.is_archived))
                .map(channel_json)
                .collect();
            let (page, next) = paginate(channels, &params);
            slack_ok(json!({ "channels": page, "response_metadata": { "next_cursor": next } }))
        }
        "conversations.create" => {
            let name = param("name");
            if slack.channel_by_name(&name).is_some() {
                return slack_err("name_taken");
            }
            let channel = slack.new_channel(&name, param("is_private") == "true");
            let body = channel_json(channel);
            slack_ok(json!({ "channel": body }))
        }
        "conversations.rename" => {
            let name = param("name");
            if slack.channel_by_name(&name).is_some() {
                return slack_err("name_taken");
            }
            match slack.channel_mut(&param("channel")) {
                Some(channel) => {
                    channel.name = name;
                    let body = channel_json(channel);
                    slack_ok(json!({ "channel": body }))
                }
                None => slack_err("channel_not_found"),
            }
        }
        "conversations.unarchive" => match slack.channel_mut(&param("channel")) {
            Some(channel) if channel.is_archived => {
                channel.is_archived = false;
                slack_ok(json!({}))
            }
            Some(_) => slack_err("not_archived"),
            None => slack_err("channel_not_found"),
        },
        "conversations.invite" => {
            let users: Vec<String> = param("users").split(',').map(String::from).collect();
            match slack.channel_mut(&param("channel")) {
                Some(channel) => {
                    if users.iter().any(|u| channel.members.contains(u)) {
                        return slack_err("already_in_channel");
                    }
                    channel.members.extend(users);
                    let body = channel_json(channel);
                    slack_ok(json!({ "channel": body }))
                }
                None => slack_err("channel_not_found"),
            }
        }
        "conversations.kick" => {
            let user = param("user");
            if user == BOT_USER_ID {
                return slack_err("cant_kick_self");
            }
            match slack.channel_mut(&param("channel")) {
                Some(channel) => {
                    if !channel.members.contains(&user) {
                        return slack_err("not_in_channel");
                    }
                    channel.members.retain(|m| m != &user);
                    slack_ok(json!({}))
                }
                None => slack_err("channel_not_found"),
            }
        }
        "conversations.members" => match slack.channel_mut(&param("channel")) {
            Some(channel) => {
                let members: Vec<Value> = channel.members.iter().map(|m| json!(m)).collect();
                let (page, next) = paginate(members, &params);
                slack_ok(json!({ "members": page, "response_metadata": { "next_cursor": next } }))
            }
            None => slack_err("channel_not_found"),
        },
        "conversations.history" => match slack.channel_mut(&param("channel")) {
            Some(channel) => {
                let messages: Vec<Value> = channel
                    .messages
                    .iter()
                    .rev()
                    .map(|(ts, text)| {
                        json!({ "type": "message", "ts": ts, "text": text, "user": BOT_USER_ID })
                    })
                    .collect();
                let (page, next) = paginate(messages, &params);
                slack_ok(json!({ "messages": page, "response_metadata": { "next_cursor": next } }))
            }
            None => slack_err("channel_not_found"),
        },
        "chat.postMessage" => {
            let ts = slack.next_ts();
            let omit_ts = slack.omit_message_ts;
            match slack.channel_mut(&param("channel")) {
                Some(channel) if !channel.members.iter().any(|m| m == BOT_USER_ID) => {
                    slack_err("not_in_channel")
                }
                Some(channel) => {
                    let text = param("text");
                    channel.messages.push((ts.clone(), text.clone()));
                    let channel_id = channel.id.clone();
                    if omit_ts {
                        return slack_ok(json!({
                            "channel": channel_id,
                            "message": { "text": text },
                        }));
                    }
                    slack_ok(json!({
                        "channel": channel_id,
                        "ts": ts,
                        "message": { "text": text },
                    }))
                }
                None => slack_err("channel_not_found"),
            }
        }
        "chat.delete" => {
            let ts = param("ts");
            match slack.channel_mut(&param("channel")) {
                Some(channel) => {
                    let before = channel.messages.len();
                    channel.messages.retain(|(t, _)| t != &ts);
                    if channel.messages.len() == before {
                        return slack_err("message_not_found");
                    }
                    slack_ok(json!({ "channel": channel.id, "ts": ts }))
                }
                None => slack_err("channel_not_found"),
            }
        }
        _ => slack_err("unknown_method"),
    }
}
