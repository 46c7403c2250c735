use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub importance: Importance,
    pub completed: bool,
    pub user: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub completed: bool,
}

/// Omitted fields stay unchanged; `dueDate: null` clears the date.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    pub importance: Option<Importance>,
    pub completed: Option<bool>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct AuthBody {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

struct Account {
    user: User,
    password: String,
}

/// Everything the server knows. Todos keep insertion order.
#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, String>,
    todos: Vec<Todo>,
}

impl Store {
    /// Invalidate every issued token, as if they had all expired.
    pub fn revoke_all_sessions(&mut self) {
        self.sessions.clear();
    }
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, Json<Message>);
type ApiResult<T> = Result<T, Rejection>;

/// Store dates the way a date column would: accept an RFC 3339 instant or a
/// bare `YYYY-MM-DD`, keep the UTC instant with millisecond precision.
fn due_date(raw: Option<String>) -> ApiResult<Option<String>> {
    let Some(raw) = raw.filter(|d| !d.trim().is_empty()) else {
        return Ok(None);
    };
    let instant = DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        })
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Invalid due date"))?;
    Ok(Some(instant.to_rfc3339_opts(SecondsFormat::Millis, true)))
}

fn reject(status: StatusCode, message: &str) -> Rejection {
    (
        status,
        Json(Message {
            message: message.to_string(),
        }),
    )
}

pub fn app() -> Router {
    app_with_state(Db::default())
}

/// Router over caller-provided state, so tests can reach into the store.
pub fn app_with_state(db: Db) -> Router {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", patch(update_todo).delete(delete_todo))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Db::default()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

/// Resolve the bearer token to a user id.
fn authorize(store: &Store, headers: &HeaderMap) -> ApiResult<String> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "No token, authorization denied"))?;
    store
        .sessions
        .get(token)
        .cloned()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Token is not valid"))
}

fn issue_token(store: &mut Store, user_id: &str) -> String {
    let token = Uuid::new_v4().to_string();
    store.sessions.insert(token.clone(), user_id.to_string());
    token
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<Registration>,
) -> ApiResult<(StatusCode, Json<AuthBody>)> {
    if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "Name, email and password are required"));
    }
    let mut store = db.write().await;
    if store.accounts.contains_key(&input.email) {
        return Err(reject(StatusCode::BAD_REQUEST, "User already exists"));
    }
    let user = User {
        id: Uuid::new_v4().simple().to_string(),
        name: input.name,
        email: input.email,
    };
    let token = issue_token(&mut store, &user.id);
    store.accounts.insert(
        user.email.clone(),
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    info!(email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(AuthBody { token, user })))
}

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> ApiResult<Json<AuthBody>> {
    let mut store = db.write().await;
    let user = store
        .accounts
        .get(&input.email)
        .filter(|account| account.password == input.password)
        .map(|account| account.user.clone())
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    let token = issue_token(&mut store, &user.id);
    Ok(Json(AuthBody { token, user }))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<User>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    store
        .accounts
        .values()
        .find(|account| account.user.id == user_id)
        .map(|account| Json(account.user.clone()))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "User not found"))
}

async fn list_todos(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<Todo>>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    let todos = store
        .todos
        .iter()
        .filter(|todo| todo.user == user_id)
        .cloned()
        .collect();
    Ok(Json(todos))
}

async fn create_todo(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateTodo>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    if input.title.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "Title is required"));
    }
    let due_date = due_date(input.due_date)?;
    let todo = Todo {
        id: Uuid::new_v4().simple().to_string(),
        title: input.title,
        description: input.description,
        due_date,
        importance: input.importance,
        completed: input.completed,
        user: user_id,
    };
    store.todos.push(todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateTodo>,
) -> ApiResult<Json<Todo>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let due = input.due_date.map(due_date).transpose()?;
    let todo = store
        .todos
        .iter_mut()
        .find(|todo| todo.id == id && todo.user == user_id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Todo not found"))?;
    if let Some(title) = input.title {
        if title.trim().is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "Title is required"));
        }
        todo.title = title;
    }
    if let Some(description) = input.description {
        todo.description = description;
    }
    if let Some(due_date) = due {
        todo.due_date = due_date;
    }
    if let Some(importance) = input.importance {
        todo.importance = importance;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Message>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let index = store
        .todos
        .iter()
        .position(|todo| todo.id == id && todo.user == user_id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Todo not found"))?;
    store.todos.remove(index);
    Ok(Json(Message {
        message: "Todo deleted".to_string(),
    }))
}
