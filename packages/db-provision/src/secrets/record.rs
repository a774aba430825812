use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A username/password pair, e.g. the master credentials referenced by a
/// database secret. Held in memory for the run only; `Debug` redacts the
/// password so the pair can never leak through logs or error context.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Narrow an untyped secret payload into a credentials pair.
    ///
    /// Extra fields are tolerated. The error names the offending field and
    /// its JSON type, never its value: a password stored as a bare number
    /// must not end up echoed in a message.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        Self::deserialize(value).map_err(|_| describe_credentials_mismatch(value))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Port as it appears in the raw secret JSON: some producers write a number,
/// others a numeric string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Normalize to a TCP port. Numeric strings are read with
    /// leading-integer semantics (`"5432"` and `" 5432 "` both give 5432);
    /// anything without a leading integer, or outside the valid port range,
    /// yields `None` so the caller can fail loudly.
    pub fn normalize(&self) -> Option<u16> {
        let value = match self {
            PortValue::Number(n) => *n,
            PortValue::Text(s) => parse_leading_int(s)?,
        };
        u16::try_from(value).ok().filter(|port| *port != 0)
    }
}

/// Integer prefix of a string: optional sign, then digits. `"5432/tcp"`
/// reads as 5432 while `"tcp"` is not a number at all.
fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

/// Database secret as stored in the secret store, loosely typed.
///
/// The shape is exact: unknown fields are rejected, which catches secrets
/// wired to the wrong identifier early. `masterarn` points at a second
/// secret holding the server's root credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbSecret {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    pub masterarn: String,
    pub host: String,
    pub port: PortValue,
    pub dbname: String,
    #[serde(
        default,
        rename = "dbInstanceIdentifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub db_instance_identifier: Option<String>,
    #[serde(
        default,
        rename = "dbClusterIdentifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub db_cluster_identifier: Option<String>,
}

impl fmt::Debug for DbSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSecret")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("engine", &self.engine)
            .field("masterarn", &self.masterarn)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .finish_non_exhaustive()
    }
}

/// [`DbSecret`] after normalization: `port` is a real TCP port.
#[derive(Clone)]
pub struct DbSecretStrict {
    pub username: String,
    pub password: String,
    pub engine: Option<String>,
    pub masterarn: String,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub db_instance_identifier: Option<String>,
    pub db_cluster_identifier: Option<String>,
}

impl fmt::Debug for DbSecretStrict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSecretStrict")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("engine", &self.engine)
            .field("masterarn", &self.masterarn)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .finish_non_exhaustive()
    }
}

impl DbSecret {
    /// Narrow an untyped secret payload into the loose record.
    ///
    /// As with [`Credentials::from_value`], the error describes the shape
    /// mismatch by field name and JSON type only, so misfiled credential
    /// material cannot leak through it.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        Self::deserialize(value).map_err(|_| describe_db_secret_mismatch(value))
    }

    /// Narrow into the strict record. Total: a port that cannot be
    /// normalized comes back as `Err` naming the port value's problem, never
    /// a silent zero.
    pub fn into_strict(self) -> Result<DbSecretStrict, String> {
        let Some(port) = self.port.normalize() else {
            let numeric = match &self.port {
                PortValue::Number(_) => true,
                PortValue::Text(text) => parse_leading_int(text).is_some(),
            };
            return Err(if numeric {
                "the port is outside the valid port range".to_string()
            } else {
                "the port is not a number".to_string()
            });
        };
        Ok(DbSecretStrict {
            username: self.username,
            password: self.password,
            engine: self.engine,
            masterarn: self.masterarn,
            host: self.host,
            port,
            dbname: self.dbname,
            db_instance_identifier: self.db_instance_identifier,
            db_cluster_identifier: self.db_cluster_identifier,
        })
    }
}

/// Fields [`DbSecret`] accepts, in spelling order of the stored JSON.
const DB_SECRET_FIELDS: &[&str] = &[
    "username",
    "password",
    "engine",
    "masterarn",
    "host",
    "port",
    "dbname",
    "dbInstanceIdentifier",
    "dbClusterIdentifier",
];

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Why `value` is not a [`DbSecret`], in terms of field names and JSON types
/// only. Serde's own messages quote offending values, which for a secret
/// payload can be the credential itself; these never do.
fn describe_db_secret_mismatch(value: &Value) -> String {
    let Some(object) = value.as_object() else {
        return format!("the payload is {}, not an object", json_type_name(value));
    };
    if let Some(key) = object
        .keys()
        .find(|key| !DB_SECRET_FIELDS.contains(&key.as_str()))
    {
        return format!("the field '{key}' is not part of the expected shape");
    }
    for field in ["username", "password", "masterarn", "host", "dbname"] {
        match object.get(field) {
            None => return format!("the required field '{field}' is missing"),
            Some(found) if !found.is_string() => {
                return format!(
                    "the field '{field}' is {}, not a string",
                    json_type_name(found)
                );
            }
            Some(_) => {}
        }
    }
    match object.get("port") {
        None => return "the required field 'port' is missing".to_string(),
        Some(found) => {
            let acceptable =
                found.is_string() || matches!(found, Value::Number(number) if number.is_i64());
            if !acceptable {
                return "the field 'port' is not a number or a string".to_string();
            }
        }
    }
    for field in ["engine", "dbInstanceIdentifier", "dbClusterIdentifier"] {
        if let Some(found) = object.get(field) {
            if !found.is_string() && !found.is_null() {
                return format!(
                    "the field '{field}' is {}, not a string",
                    json_type_name(found)
                );
            }
        }
    }
    "the payload does not match the expected shape".to_string()
}

fn describe_credentials_mismatch(value: &Value) -> String {
    let Some(object) = value.as_object() else {
        return format!("the payload is {}, not an object", json_type_name(value));
    };
    for field in ["username", "password"] {
        match object.get(field) {
            None => return format!("the required field '{field}' is missing"),
            Some(found) if !found.is_string() => {
                return format!(
                    "the field '{field}' is {}, not a string",
                    json_type_name(found)
                );
            }
            Some(_) => {}
        }
    }
    "the payload does not match the expected credentials shape".to_string()
}
