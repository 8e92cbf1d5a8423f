//! Courrier model representing one entry of a mail register

use super::Category;
use crate::clock::truncate_to_millis;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Free-form fields supplied by the caller (subject, sender, statut, ...)
pub type Fields = Map<String, Value>;

/// Fields merged into an existing courrier by an update
pub type Patch = Fields;

/// Field name used by status updates
pub const STATUS_FIELD: &str = "statut";

/// Keys owned by the register itself. Drafts cannot set them; patches
/// may rewrite `id` and `createdAt` only.
pub const RESERVED_KEYS: [&str; 4] = ["id", "createdAt", "updatedAt", "type"];

/// Identifier of a courrier: milliseconds since the Unix epoch at creation.
///
/// Two courriers created within the same millisecond share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourrierId(pub i64);

impl CourrierId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Derive an id from a creation instant
    pub fn from_time(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Accept a JSON integer or a string holding one
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self),
            Value::String(s) => s.trim().parse().ok().map(Self),
            _ => None,
        }
    }
}

impl From<i64> for CourrierId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CourrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single entry of a register.
///
/// Serialized as a flat JSON object: caller fields next to `id`,
/// `createdAt`, `updatedAt` and `type`. Timestamps always carry
/// milliseconds (`2024-06-01T08:00:00.000Z`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Courrier {
    pub id: CourrierId,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub category: Category,
    #[serde(flatten)]
    pub fields: Fields,
}

fn serialize_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Accept an RFC 3339 string or Unix milliseconds
fn timestamp_from_json(value: &Value) -> Option<DateTime<Utc>> {
    let at = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?)?,
        _ => return None,
    };
    Some(truncate_to_millis(at))
}

impl Courrier {
    /// Rebuild a courrier from a stored JSON record.
    ///
    /// Records written by other versions may lack generated keys or carry
    /// them in another form. Missing or unreadable values are filled in:
    /// `updatedAt` and `createdAt` from each other (else `now`), `id` from
    /// `createdAt`, and `type` from `category`. Returns `None` for anything
    /// that is not a JSON object.
    pub fn from_stored(record: Value, category: Category, now: DateTime<Utc>) -> Option<Self> {
        let Value::Object(mut fields) = record else {
            return None;
        };

        let id = fields.remove("id");
        let created_at = fields.remove("createdAt");
        let updated_at = fields.remove("updatedAt");
        let stored_category = fields.remove("type");

        let created_at = created_at.as_ref().and_then(timestamp_from_json);
        let updated_at = updated_at.as_ref().and_then(timestamp_from_json);
        let created_at = created_at.or(updated_at).unwrap_or(now);
        let updated_at = updated_at.unwrap_or(created_at);

        let id = match id.as_ref().and_then(CourrierId::from_json) {
            Some(id) => id,
            None => {
                log::warn!("Stored courrier has no usable id ({:?}), deriving one", id);
                CourrierId::from_time(created_at)
            }
        };
        let category = stored_category
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or(category);

        Some(Self {
            id,
            created_at,
            updated_at,
            category,
            fields,
        })
    }

    /// Look up a caller field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Current `statut`, when it is a string
    pub fn status(&self) -> Option<&str> {
        self.field(STATUS_FIELD).and_then(Value::as_str)
    }

    /// Merge a patch into this courrier and stamp `updated_at`.
    ///
    /// Caller keys overwrite the existing value. `id` and `createdAt` are
    /// taken when they parse; `type` stays with the register and
    /// `updatedAt` is always `now`.
    pub fn apply_patch(&mut self, patch: &Patch, now: DateTime<Utc>) {
        for (key, value) in patch {
            match key.as_str() {
                "id" => match CourrierId::from_json(value) {
                    Some(id) => self.id = id,
                    None => log::warn!("Keeping id of courrier {}, patch value {} is not an id", self.id, value),
                },
                "createdAt" => match timestamp_from_json(value) {
                    Some(at) => self.created_at = at,
                    None => log::warn!(
                        "Keeping createdAt of courrier {}, patch value {} is not a timestamp",
                        self.id,
                        value
                    ),
                },
                "type" => {
                    log::warn!("Keeping type {} of courrier {}, ignoring {}", self.category, self.id, value)
                }
                "updatedAt" => {}
                _ => {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
        self.updated_at = now;
    }
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Caller-supplied partial courrier, completed by the register on `add`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourrierDraft {
    fields: Fields,
}

impl CourrierDraft {
    /// Create an empty draft
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field on the draft
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Complete the draft. Generated values win over any reserved keys the
    /// caller put in the draft.
    pub fn into_courrier(self, category: Category, now: DateTime<Utc>) -> Courrier {
        let mut fields = self.fields;
        fields.retain(|key, _| !is_reserved(key));

        Courrier {
            id: CourrierId::from_time(now),
            created_at: now,
            updated_at: now,
            category,
            fields,
        }
    }
}

impl From<Fields> for CourrierDraft {
    fn from(fields: Fields) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for CourrierDraft {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => anyhow::bail!("courrier draft must be a JSON object, got {}", other),
        }
    }
}
