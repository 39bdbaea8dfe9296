//! In-memory fake of the Nessus REST API.
//!
//! Covers the endpoints the client crate talks to: sessions and API keys,
//! the UI script carrying the API token, server status, permissions, mail
//! settings and agent groups. Authentication follows Nessus: either an
//! `X-Cookie: token=<t>` header or an `X-ApiKeys: accessKey=<a>;secretKey=<s>`
//! header.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "nessus-admin";
/// Token embedded in `/nessus6.js`.
pub const API_TOKEN: &str = "3c9b8a1e-5f2d-4a7b-9c3e-1d2f3a4b5c6d";
pub const SCANNER_ID: u64 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentGroup {
    pub id: u64,
    pub name: String,
    pub owner: String,
    pub owner_id: u64,
    pub shared: u32,
    pub user_permissions: u32,
    pub creation_date: i64,
    pub last_modification_date: i64,
    pub agents_count: u64,
}

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct GroupName {
    pub name: String,
}

#[derive(Deserialize)]
pub struct Ids {
    pub ids: Vec<u64>,
}

#[derive(Deserialize)]
pub struct ChangePassword {
    pub password: String,
    pub current_password: String,
}

#[derive(Deserialize)]
pub struct Acls {
    pub acls: Vec<Value>,
}

#[derive(Debug)]
struct User {
    id: u64,
    password: String,
    name: Option<String>,
    email: Option<String>,
}

struct ObjectAcl {
    owner: String,
    acls: Vec<Value>,
}

struct Group {
    name: String,
    agents: BTreeSet<u64>,
}

pub struct Store {
    users: HashMap<String, User>,
    /// session token -> username
    sessions: HashMap<String, String>,
    /// (access key, secret key) -> username
    api_keys: HashMap<(String, String), String>,
    permissions: HashMap<(String, u64), ObjectAcl>,
    mail: Value,
    groups: BTreeMap<u64, Group>,
    next_group_id: u64,
}

impl Store {
    fn seeded() -> Self {
        let users = HashMap::from([(
            USERNAME.to_string(),
            User {
                id: 1,
                password: PASSWORD.to_string(),
                name: Some("Administrator".to_string()),
                email: None,
            },
        )]);
        let permissions = HashMap::from([
            (
                ("scan".to_string(), 1),
                ObjectAcl {
                    owner: USERNAME.to_string(),
                    acls: vec![json!({"type": "default", "permissions": 16})],
                },
            ),
            (
                ("scan".to_string(), 2),
                ObjectAcl {
                    owner: "auditor".to_string(),
                    acls: vec![json!({"type": "default", "permissions": 0})],
                },
            ),
        ]);
        Self {
            users,
            sessions: HashMap::new(),
            api_keys: HashMap::new(),
            permissions,
            mail: json!({
                "smtp_host": "",
                "smtp_port": 25,
                "smtp_from": "",
                "smtp_www_host": "",
                "smtp_auth": "NONE",
                "smtp_user": "",
                "smtp_pass": "",
                "smtp_enc": "No Encryption"
            }),
            groups: BTreeMap::new(),
            next_group_id: 1,
        }
    }

    /// Username behind the request's `X-Cookie` or `X-ApiKeys` header.
    fn authorize(&self, headers: &HeaderMap) -> Result<String, ApiError> {
        if let Some(token) = header_value(headers, "x-cookie").and_then(|v| v.strip_prefix("token=")) {
            if let Some(user) = self.sessions.get(token.trim()) {
                return Ok(user.clone());
            }
        }
        if let Some(keys) = header_value(headers, "x-apikeys").and_then(parse_api_keys) {
            if let Some(user) = self.api_keys.get(&keys) {
                return Ok(user.clone());
            }
        }
        Err(unauthorized())
    }

    fn session_info(&self, username: &str) -> Value {
        let user = &self.users[username];
        json!({
            "id": user.id,
            "username": username,
            "email": user.email,
            "name": user.name,
            "type": "local",
            "permissions": 128,
            "lastlogin": 1_700_000_000,
            "container_id": 0,
            "groups": []
        })
    }

    fn group_json(&self, id: u64) -> Option<AgentGroup> {
        self.groups.get(&id).map(|group| AgentGroup {
            id,
            name: group.name.clone(),
            owner: USERNAME.to_string(),
            owner_id: 1,
            shared: 1,
            user_permissions: 128,
            creation_date: 1_700_000_000,
            last_modification_date: 1_700_000_000,
            agents_count: group.agents.len() as u64,
        })
    }
}

pub type Db = Arc<RwLock<Store>>;

/// JSON error body with a status, the way Nessus reports failures.
pub type ApiError = (StatusCode, Json<Value>);

fn error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

fn unauthorized() -> ApiError {
    error(StatusCode::UNAUTHORIZED, "You need to log in to perform this request.")
}

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `accessKey=<a>;secretKey=<s>`, with or without a space after `;`.
fn parse_api_keys(raw: &str) -> Option<(String, String)> {
    let mut access = None;
    let mut secret = None;
    for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(value) = part.strip_prefix("accessKey=") {
            access = Some(value.to_string());
        } else if let Some(value) = part.strip_prefix("secretKey=") {
            secret = Some(value.to_string());
        }
    }
    Some((access?, secret?))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    let groups = format!("/scanners/{SCANNER_ID}/agent-groups");
    Router::new()
        .route(
            "/session",
            get(get_session)
                .post(create_session)
                .put(edit_session)
                .delete(destroy_session),
        )
        .route("/session/keys", put(generate_keys))
        .route("/session/chpasswd", put(change_password))
        .route("/nessus6.js", get(ui_script))
        .route("/server/status", get(server_status))
        .route("/server/properties", get(server_properties))
        .route("/server/restart", axum::routing::post(restart))
        .route(
            "/permissions/{object_type}/{object_id}",
            get(list_permissions).put(change_permissions),
        )
        .route("/settings/network/mail", get(view_mail).put(change_mail))
        .route(&groups, get(list_groups).post(create_group).delete(delete_groups))
        .route(
            &format!("{groups}/{{group_id}}"),
            get(group_details).put(configure_group).delete(delete_group),
        )
        .route(
            &format!("{groups}/{{group_id}}/agents"),
            put(add_agents).delete(delete_agents),
        )
        .route(
            &format!("{groups}/{{group_id}}/agents/{{agent_id}}"),
            put(add_agent).delete(delete_agent),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- session ---

async fn create_session(
    State(db): State<Db>,
    Json(login): Json<Login>,
) -> Result<Json<Value>, ApiError> {
    let mut store = db.write().await;
    let valid = store
        .users
        .get(&login.username)
        .is_some_and(|user| !login.password.is_empty() && user.password == login.password);
    if !valid {
        debug!(username = %login.username, "rejected login");
        return Err(error(StatusCode::UNAUTHORIZED, "Invalid Credentials"));
    }
    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone(), login.username);
    Ok(Json(json!({
        "token": token,
        "md5sum_wizard_templates": "0b0f7c1d8a3e",
        "md5sum_tenable_links": "9a8b7c6d5e4f"
    })))
}

async fn get_session(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let store = db.read().await;
    let user = store.authorize(&headers)?;
    Ok(Json(store.session_info(&user)))
}

async fn edit_session(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(changes): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let mut store = db.write().await;
    let username = store.authorize(&headers)?;
    if let Some(user) = store.users.get_mut(&username) {
        if let Some(name) = changes.get("name").and_then(Value::as_str) {
            user.name = Some(name.to_string());
        }
        if let Some(email) = changes.get("email").and_then(Value::as_str) {
            user.email = Some(email.to_string());
        }
    }
    Ok(Json(store.session_info(&username)))
}

/// Only a cookie session can be destroyed; API keys have no session.
async fn destroy_session(State(db): State<Db>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    let token = header_value(&headers, "x-cookie")
        .and_then(|v| v.strip_prefix("token="))
        .map(|t| t.trim().to_string())
        .ok_or_else(unauthorized)?;
    store
        .sessions
        .remove(&token)
        .map(|_| StatusCode::OK)
        .ok_or_else(unauthorized)
}

async fn generate_keys(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let mut store = db.write().await;
    let username = store.authorize(&headers)?;
    store.api_keys.retain(|_, owner| *owner != username);
    let access_key = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let secret_key = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    store
        .api_keys
        .insert((access_key.clone(), secret_key.clone()), username);
    Ok(Json(json!({ "accessKey": access_key, "secretKey": secret_key })))
}

async fn change_password(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(change): Json<ChangePassword>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    let username = store.authorize(&headers)?;
    let user = store.users.get_mut(&username).ok_or_else(unauthorized)?;
    if user.password != change.current_password {
        return Err(error(StatusCode::FORBIDDEN, "Invalid current password"));
    }
    if change.password.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Password must not be empty"));
    }
    user.password = change.password;
    Ok(StatusCode::OK)
}

// --- ui script ---

async fn ui_script() -> impl IntoResponse {
    let script = format!(
        "!function(e){{\"use strict\";e.getApiToken=function(){{return\"{API_TOKEN}\"}};e.version=\"10.6.1\"}}(window);"
    );
    ([(header::CONTENT_TYPE, "application/javascript")], script)
}

// --- server ---

async fn server_status() -> Json<Value> {
    Json(json!({ "status": "ready", "progress": null }))
}

async fn server_properties(State(db): State<Db>, headers: HeaderMap) -> Json<Value> {
    let store = db.read().await;
    let mut properties = json!({
        "nessus_type": "Nessus Professional",
        "nessus_ui_version": "10.6.1",
        "enterprise": false,
        "login_banner": false,
        "capabilities": { "multi_scanner": false, "multi_user": "full", "report_email_config": true }
    });
    if store.authorize(&headers).is_ok() {
        properties["server_version"] = json!("10.6.1");
        properties["server_build"] = json!("20230927");
    }
    Json(properties)
}

async fn restart(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    db.read().await.authorize(&headers)?;
    Ok(Json(json!({})))
}

// --- permissions ---

async fn list_permissions(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((object_type, object_id)): Path<(String, u64)>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let store = db.read().await;
    store.authorize(&headers)?;
    store
        .permissions
        .get(&(object_type, object_id))
        .map(|object| Json(object.acls.clone()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Object does not exist"))
}

async fn change_permissions(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((object_type, object_id)): Path<(String, u64)>,
    Json(body): Json<Acls>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    let username = store.authorize(&headers)?;
    let object = store
        .permissions
        .get_mut(&(object_type, object_id))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Object does not exist"))?;
    if object.owner != username {
        return Err(error(StatusCode::FORBIDDEN, "You do not have permission to edit this object"));
    }
    object.acls = body.acls;
    Ok(StatusCode::OK)
}

// --- mail ---

async fn view_mail(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let store = db.read().await;
    store.authorize(&headers)?;
    Ok(Json(store.mail.clone()))
}

async fn change_mail(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(settings): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    store.mail = settings;
    Ok(StatusCode::OK)
}

// --- agent groups ---

async fn list_groups(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let store = db.read().await;
    store.authorize(&headers)?;
    let groups: Vec<AgentGroup> = store
        .groups
        .keys()
        .filter_map(|id| store.group_json(*id))
        .collect();
    Ok(Json(json!({ "groups": groups })))
}

async fn create_group(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<GroupName>,
) -> Result<Json<AgentGroup>, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    if input.name.trim().is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Group name is required"));
    }
    let id = store.next_group_id;
    store.next_group_id += 1;
    store.groups.insert(
        id,
        Group {
            name: input.name,
            agents: BTreeSet::new(),
        },
    );
    store
        .group_json(id)
        .map(Json)
        .ok_or_else(|| error(StatusCode::INTERNAL_SERVER_ERROR, "Group vanished"))
}

async fn group_details(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(group_id): Path<u64>,
) -> Result<Json<AgentGroup>, ApiError> {
    let store = db.read().await;
    store.authorize(&headers)?;
    store.group_json(group_id).map(Json).ok_or_else(group_not_found)
}

async fn configure_group(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(group_id): Path<u64>,
    Json(input): Json<GroupName>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    let group = store.groups.get_mut(&group_id).ok_or_else(group_not_found)?;
    group.name = input.name;
    Ok(StatusCode::OK)
}

async fn delete_group(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(group_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    store
        .groups
        .remove(&group_id)
        .map(|_| StatusCode::OK)
        .ok_or_else(group_not_found)
}

async fn delete_groups(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<Ids>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    for id in input.ids {
        store.groups.remove(&id);
    }
    Ok(StatusCode::OK)
}

async fn add_agent(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((group_id, agent_id)): Path<(u64, u64)>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    let group = store.groups.get_mut(&group_id).ok_or_else(group_not_found)?;
    group.agents.insert(agent_id);
    Ok(StatusCode::OK)
}

async fn add_agents(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(group_id): Path<u64>,
    Json(input): Json<Ids>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    let group = store.groups.get_mut(&group_id).ok_or_else(group_not_found)?;
    group.agents.extend(input.ids);
    Ok(StatusCode::OK)
}

async fn delete_agent(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((group_id, agent_id)): Path<(u64, u64)>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    let group = store.groups.get_mut(&group_id).ok_or_else(group_not_found)?;
    if !group.agents.remove(&agent_id) {
        return Err(error(StatusCode::NOT_FOUND, "Agent is not in this group"));
    }
    Ok(StatusCode::OK)
}

async fn delete_agents(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(group_id): Path<u64>,
    Json(input): Json<Ids>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    let group = store.groups.get_mut(&group_id).ok_or_else(group_not_found)?;
    for id in input.ids {
        group.agents.remove(&id);
    }
    Ok(StatusCode::OK)
}

fn group_not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Agent group does not exist")
}
