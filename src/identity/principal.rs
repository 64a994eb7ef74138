use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The signed-in operator as persisted under `userInfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_expiration")]
    pub token_expiration: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(token: impl Into<String>, email: impl Into<String>, name: impl Into<String>, token_expiration: DateTime<Utc>) -> Self {
        Self { token: token.into(), email: email.into(), name: name.into(), token_expiration: Some(token_expiration) }
    }

    /// Lower-cased, trimmed email used for every directory lookup.
    pub fn normalized_email(&self) -> String { normalize_email(&self.email) }

    /// True when the token carries an expiry that is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.token_expiration, Some(exp) if exp <= now)
    }

    /// Authenticated means a non-empty token whose expiry is present and strictly in the future.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.is_empty() { return false; }
        matches!(self.token_expiration, Some(exp) if exp > now)
    }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

// Accept either an RFC 3339 string or epoch milliseconds.
fn de_expiration<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let raw = Option::<serde_json::Value>::deserialize(de)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| D::Error::custom(format!("invalid tokenExpiration '{}': {}", s, e))),
        Some(serde_json::Value::Number(n)) => {
            let ms = n.as_i64().ok_or_else(|| D::Error::custom("tokenExpiration out of range"))?;
            Utc.timestamp_millis_opt(ms)
                .single()
                .map(Some)
                .ok_or_else(|| D::Error::custom("tokenExpiration out of range"))
        }
        Some(other) => Err(D::Error::custom(format!("unsupported tokenExpiration: {}", other))),
    }
}
