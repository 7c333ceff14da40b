//! Shared types for the Tradervue client.
//!
//! Server-owned resources (trades, comments, users) keep only the fields the
//! client reasons about as typed members; everything else the server sends is
//! preserved in a flattened `extra` map so nothing is lost on the way through.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TradervueError};

/// Execution timestamp format accepted by the importer.
const EXECUTION_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Trial-end dates are sent as ISO calendar dates.
const TRIAL_END_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Authentication material for one client instance.
///
/// Fixed for the life of the client. `target_user` switches every request to
/// act on behalf of another account (subject to server-side permissions).
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub user_agent: String,
    pub target_user: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
            user_agent: user_agent.into(),
            target_user: None,
        }
    }

    /// Impersonate another user on every request.
    pub fn impersonating(mut self, target_user: impl Into<String>) -> Self {
        self.target_user = Some(target_user.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque server identifier. The API emits numbers, but string ids are
/// accepted as well so callers can pass through whatever they stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        ResourceId(id.to_string())
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        ResourceId(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        ResourceId(id)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ResourceId::from(n),
            Raw::Text(s) => ResourceId(s),
        })
    }
}

// ---------------------------------------------------------------------------
// Executions and import batches
// ---------------------------------------------------------------------------

/// A single fill as supplied by the broker.
///
/// Stored as an opaque JSON object and sent to the importer exactly as given.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Execution(Map<String, Value>);

impl Execution {
    /// Build the four fields every importer row needs.
    pub fn fill(datetime: NaiveDateTime, symbol: &str, quantity: Decimal, price: Decimal) -> Self {
        let mut fields = Map::new();
        fields.insert(
            "datetime".into(),
            Value::String(datetime.format(EXECUTION_DATETIME_FORMAT).to_string()),
        );
        fields.insert("symbol".into(), Value::String(symbol.to_string()));
        fields.insert("quantity".into(), json!(quantity));
        fields.insert("price".into(), json!(price));
        Execution(fields)
    }

    /// Attach a broker-specific field (`option`, `account`, ...).
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Attach a monetary field such as `commission`, `transfee` or `ecnfee`.
    pub fn with_amount(mut self, key: &str, amount: Decimal) -> Self {
        self.0.insert(key.to_string(), json!(amount));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn symbol(&self) -> Option<&str> {
        self.0.get("symbol").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Execution {
    fn from(fields: Map<String, Value>) -> Self {
        Execution(fields)
    }
}

/// A set of executions submitted to the importer together.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub executions: Vec<Execution>,
    /// Account the executions belong to. Also added to `tags`, since the
    /// server does not tag imported trades with it on its own.
    pub account_tag: Option<String>,
    pub tags: Option<Vec<String>>,
    pub allow_duplicates: bool,
    pub overlay_commissions: bool,
}

impl ImportBatch {
    pub fn new(executions: Vec<Execution>) -> Self {
        Self {
            executions,
            ..Self::default()
        }
    }

    pub fn with_account_tag(mut self, account_tag: impl Into<String>) -> Self {
        self.account_tag = Some(account_tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    pub fn overlay_commissions(mut self, overlay: bool) -> Self {
        self.overlay_commissions = overlay;
        self
    }

    /// Validate the batch and produce the request body.
    pub fn into_payload(self) -> Result<ImportPayload> {
        if self.executions.is_empty() {
            return Err(TradervueError::Validation(
                "found 0 executions to import; at least 1 is required".into(),
            ));
        }

        let tags = merge_account_tag(self.tags, self.account_tag.as_deref());

        Ok(ImportPayload {
            executions: self.executions,
            allow_duplicates: self.allow_duplicates,
            overlay_commissions: self.overlay_commissions,
            account_tag: self.account_tag,
            tags,
        })
    }
}

/// Append `account_tag` to `tags` unless it is already there.
pub fn merge_account_tag(tags: Option<Vec<String>>, account_tag: Option<&str>) -> Option<Vec<String>> {
    let Some(account_tag) = account_tag else {
        return tags;
    };

    let mut tags = tags.unwrap_or_default();
    if !tags.iter().any(|t| t == account_tag) {
        tags.push(account_tag.to_string());
    }
    Some(tags)
}

/// Body of `POST /imports`.
#[derive(Debug, Clone, Serialize)]
pub struct ImportPayload {
    pub executions: Vec<Execution>,
    pub allow_duplicates: bool,
    pub overlay_commissions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Import status
// ---------------------------------------------------------------------------

/// Server-side importer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Ready,
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl ImportStatus {
    /// Still being worked on by the server.
    pub fn is_in_flight(self) -> bool {
        matches!(self, ImportStatus::Queued | ImportStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImportStatus::Ready => "ready",
            ImportStatus::Queued => "queued",
            ImportStatus::Processing => "processing",
            ImportStatus::Succeeded => "succeeded",
            ImportStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = TradervueError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ready" => Ok(ImportStatus::Ready),
            "queued" => Ok(ImportStatus::Queued),
            "processing" => Ok(ImportStatus::Processing),
            "succeeded" => Ok(ImportStatus::Succeeded),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(TradervueError::UnsupportedStatus(other.to_string())),
        }
    }
}

/// Full payload of `GET /imports`: the status plus whatever detail the
/// server attached (`info`, error lists, counts).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportState {
    pub status: ImportStatus,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ImportState {
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut details) = value else {
            return Err(TradervueError::ProtocolViolation(format!(
                "import status response is not an object: {value}"
            )));
        };

        let status = match details.remove("status") {
            Some(Value::String(s)) => s.parse()?,
            Some(other) => return Err(TradervueError::UnsupportedStatus(other.to_string())),
            None => {
                return Err(TradervueError::ProtocolViolation(
                    "no 'status' field in import status response".into(),
                ))
            }
        };

        Ok(Self { status, details })
    }
}

// ---------------------------------------------------------------------------
// Trades, comments, users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: ResourceId,
    pub symbol: String,
    /// "Long" or "Short".
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub open: Option<bool>,
    #[serde(default)]
    pub shared: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: ResourceId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /trades`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTrade {
    pub symbol: String,
    pub shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_risk: Option<Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewTrade {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Body of `PUT /trades/{id}`. Unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TradeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_risk: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TradeUpdate {
    /// Names of the fields this update would send.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.notes.is_some() {
            names.push("notes");
        }
        if self.shared.is_some() {
            names.push("shared");
        }
        if self.initial_risk.is_some() {
            names.push("initial_risk");
        }
        if self.tags.is_some() {
            names.push("tags");
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

/// Body of `POST /users`.
#[derive(Debug, Serialize)]
pub struct NewUser {
    pub username: String,
    pub plan: String,
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_trial_end"
    )]
    pub trial_end: Option<NaiveDate>,
}

/// Body of `PUT /users/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_trial_end<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match date {
        Some(d) => serializer.serialize_str(&d.format(TRIAL_END_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}
