//! Domain DTOs for the todo API.
//!
//! # Design
//! These types mirror the server's JSON schema but are defined independently
//! of the mock-server crate; integration tests catch schema drift. Items are
//! keyed by the server-assigned `_id` and field names are camelCase on the
//! wire.
//!
//! Dates travel as absolute instants (`2024-05-01T00:00:00.000Z`). Edit forms
//! work on plain calendar dates, so `EditDraft` converts in both directions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Priority of a todo. Absent, null or unrecognised values (including
/// non-strings) read as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    pub fn as_str(self) -> &'static str {
        match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }

    /// Parse the wire form, falling back to `Medium` for anything unknown.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Importance::High),
            "medium" => Ok(Importance::Medium),
            "low" => Ok(Importance::Low),
            other => Err(format!("unknown importance `{other}` (expected high, medium or low)")),
        }
    }
}

impl<'de> Deserialize<'de> for Importance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(Importance::parse_lenient).unwrap_or_default())
    }
}

/// A single todo item as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub completed: bool,
}

impl TodoItem {
    /// Label shown next to the item: its calendar date, or `No date`.
    pub fn due_date_label(&self) -> String {
        match self.due_date {
            Some(instant) => calendar_date(instant).format("%Y-%m-%d").to_string(),
            None => "No date".to_string(),
        }
    }
}

/// Normalise a calendar date to the instant sent on the wire (UTC midnight,
/// millisecond precision).
pub fn normalize_due_date(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The UTC calendar date of an instant, as populated into an edit form.
pub fn calendar_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Read a wire date: an RFC 3339 instant, or a bare `YYYY-MM-DD` taken as
/// UTC midnight.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        })
}

/// Server-side dates never fail an item: anything unreadable becomes `None`.
fn lenient_instant<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => {
            let parsed = parse_due_date(&s);
            if parsed.is_none() {
                warn!(due_date = %s, "ignoring unreadable due date");
            }
            parsed
        }
        other => {
            warn!(due_date = %other, "ignoring unreadable due date");
            None
        }
    })
}

fn calendar_date_field<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_due_date(&raw)
            .map(|instant| Some(calendar_date(instant)))
            .ok_or_else(|| D::Error::custom(format!("invalid due date `{raw}`"))),
    }
}

fn serialize_calendar_date<S: Serializer>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serializer.serialize_str(&normalize_due_date(*date)),
        None => serializer.serialize_none(),
    }
}

/// Request payload for creating a new todo. `completed` is left to the
/// server, which defaults it to false. A non-empty title is the caller's
/// responsibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        serialize_with = "serialize_calendar_date",
        deserialize_with = "calendar_date_field"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub importance: Importance,
}

impl CreateTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date: None,
            importance: Importance::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }
}

/// Partial update for an existing todo. Omitted fields remain unchanged on
/// the server. `due_date` is tri-state: `None` leaves it alone, `Some(None)`
/// sends an explicit `null` to clear it, and a date goes out normalised.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_patch_date",
        deserialize_with = "patch_date"
    )]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<Importance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTodo {
    /// A patch touching only `completed`.
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

fn patch_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<NaiveDate>>, D::Error> {
    calendar_date_field(deserializer).map(Some)
}

fn serialize_patch_date<S: Serializer>(
    date: &Option<Option<NaiveDate>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serialize_calendar_date(&date.flatten(), serializer)
}

/// Local copy of an item open for editing. `description` stays `None` for an
/// item that never had one, so submitting leaves it absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub importance: Importance,
    pub completed: bool,
}

impl EditDraft {
    pub fn from_item(item: &TodoItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            due_date: item.due_date.map(calendar_date),
            importance: item.importance,
            completed: item.completed,
        }
    }

    /// The full patch sent on submit: every editable field, with the date
    /// normalised or explicitly null. A description the item never had is
    /// left out.
    pub fn to_patch(&self) -> UpdateTodo {
        UpdateTodo {
            title: Some(self.title.clone()),
            description: self.description.clone(),
            due_date: Some(self.due_date),
            importance: Some(self.importance),
            completed: Some(self.completed),
        }
    }
}

/// Profile record. Only the common fields are typed; everything else the
/// server sends is kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body returned by both login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(json: &str) -> TodoItem {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn todo_item_defaults_missing_fields() {
        let todo = item(r#"{"_id":"a1","title":"Buy milk"}"#);
        assert_eq!(todo.id, "a1");
        assert_eq!(todo.description, None);
        assert_eq!(todo.due_date, None);
        assert_eq!(todo.importance, Importance::Medium);
        assert!(!todo.completed);
    }

    #[test]
    fn todo_item_accepts_plain_id_and_ignores_unknown_fields() {
        let todo = item(r#"{"id":"a2","title":"x","user":"u1","__v":0}"#);
        assert_eq!(todo.id, "a2");
    }

    #[test]
    fn unknown_or_null_importance_is_medium() {
        assert_eq!(
            item(r#"{"_id":"a","title":"t","importance":"urgent"}"#).importance,
            Importance::Medium
        );
        assert_eq!(
            item(r#"{"_id":"a","title":"t","importance":null}"#).importance,
            Importance::Medium
        );
        assert_eq!(
            item(r#"{"_id":"a","title":"t","importance":"HIGH"}"#).importance,
            Importance::High
        );
        for odd in ["2", "true", r#"{"level":"high"}"#, r#"["high"]"#] {
            let json = format!(r#"{{"_id":"a","title":"t","importance":{odd}}}"#);
            assert_eq!(item(&json).importance, Importance::Medium, "importance {odd}");
        }
    }

    #[test]
    fn plain_calendar_due_date_reads_as_utc_midnight() {
        let todo = item(r#"{"_id":"a","title":"t","dueDate":"2024-05-01"}"#);
        assert_eq!(todo.due_date_label(), "2024-05-01");
        assert_eq!(
            todo.due_date.map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Some("2024-05-01T00:00:00.000Z".to_string())
        );
    }

    #[test]
    fn unreadable_due_date_does_not_fail_the_list() {
        let todos: Vec<TodoItem> = serde_json::from_str(
            r#"[
                {"_id":"a","title":"garbled","dueDate":"next tuesday"},
                {"_id":"b","title":"number","dueDate":20240501},
                {"_id":"c","title":"empty","dueDate":""},
                {"_id":"d","title":"fine","dueDate":"2024-05-01T00:00:00.000Z"}
            ]"#,
        )
        .unwrap();
        assert_eq!(todos.len(), 4);
        assert!(todos[..3].iter().all(|t| t.due_date.is_none()));
        assert_eq!(todos[3].due_date_label(), "2024-05-01");
    }

    #[test]
    fn importance_from_str_is_strict() {
        assert_eq!("low".parse::<Importance>(), Ok(Importance::Low));
        assert!("urgent".parse::<Importance>().is_err());
    }

    #[test]
    fn due_date_label() {
        let mut todo = item(r#"{"_id":"a","title":"t"}"#);
        assert_eq!(todo.due_date_label(), "No date");
        todo = item(r#"{"_id":"a","title":"t","dueDate":"2024-05-01T00:00:00.000Z"}"#);
        assert_eq!(todo.due_date_label(), "2024-05-01");
    }

    #[test]
    fn normalize_due_date_is_utc_midnight_with_millis() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(normalize_due_date(date), "2024-05-01T00:00:00.000Z");
    }

    #[test]
    fn create_todo_serializes_camel_case() {
        let input = CreateTodo::new("Buy milk")
            .importance(Importance::High)
            .due_on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["title"], "Buy milk");
        assert_eq!(json["description"], "");
        assert_eq!(json["dueDate"], "2024-05-01T00:00:00.000Z");
        assert_eq!(json["importance"], "high");
        assert!(json.get("completed").is_none());
    }

    #[test]
    fn create_todo_accepts_instant_or_calendar_date_and_rejects_garbage() {
        let from_instant: CreateTodo =
            serde_json::from_str(r#"{"title":"t","dueDate":"2024-06-01T00:00:00.000Z"}"#).unwrap();
        let from_date: CreateTodo =
            serde_json::from_str(r#"{"title":"t","dueDate":"2024-06-01"}"#).unwrap();
        assert_eq!(from_instant.due_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(from_instant, from_date);
        assert!(serde_json::from_str::<CreateTodo>(r#"{"title":"t","dueDate":"soon"}"#).is_err());

        let json = serde_json::to_value(CreateTodo::new("t")).unwrap();
        assert!(json["dueDate"].is_null());
    }

    #[test]
    fn update_todo_toggle_sends_only_completed() {
        let json = serde_json::to_value(UpdateTodo::completed(true)).unwrap();
        assert_eq!(json, serde_json::json!({ "completed": true }));
    }

    #[test]
    fn update_todo_distinguishes_null_from_missing_due_date() {
        let cleared: UpdateTodo = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));
        let untouched: UpdateTodo = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(untouched.due_date, None);

        assert_eq!(
            serde_json::to_value(&cleared).unwrap(),
            serde_json::json!({ "dueDate": null })
        );
        assert_eq!(serde_json::to_value(&untouched).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn edit_draft_round_trips_dates_through_calendar_form() {
        let todo = item(
            r#"{"_id":"a","title":"t","description":"d","dueDate":"2024-05-01T15:30:00Z","importance":"low","completed":true}"#,
        );
        let draft = EditDraft::from_item(&todo);
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2024, 5, 1));

        let patch = serde_json::to_value(draft.to_patch()).unwrap();
        assert_eq!(patch["dueDate"], "2024-05-01T00:00:00.000Z");
        assert_eq!(patch["importance"], "low");
        assert_eq!(patch["completed"], true);
        assert_eq!(patch["description"], "d");
    }

    #[test]
    fn edit_draft_without_date_sends_explicit_null() {
        let draft = EditDraft::from_item(&item(r#"{"_id":"a","title":"t"}"#));
        let patch = serde_json::to_value(draft.to_patch()).unwrap();
        assert!(patch["dueDate"].is_null());
        assert!(patch.as_object().unwrap().contains_key("dueDate"));
    }

    #[test]
    fn edit_draft_leaves_absent_description_absent() {
        let mut draft = EditDraft::from_item(&item(r#"{"_id":"a","title":"t"}"#));
        assert_eq!(draft.description, None);
        let patch = serde_json::to_value(draft.to_patch()).unwrap();
        assert!(!patch.as_object().unwrap().contains_key("description"));

        draft.description = Some("now described".to_string());
        let patch = serde_json::to_value(draft.to_patch()).unwrap();
        assert_eq!(patch["description"], "now described");
    }

    #[test]
    fn user_keeps_unknown_fields() {
        let user: User =
            serde_json::from_str(r#"{"_id":"u1","name":"Ada","email":"ada@example.com","role":"admin"}"#)
                .unwrap();
        assert_eq!(user.id.as_deref(), Some("u1"));
        assert_eq!(user.extra["role"], "admin");
    }

    #[test]
    fn login_request_debug_hides_password() {
        let req = LoginRequest {
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{req:?}").contains("hunter2"));
    }
}
