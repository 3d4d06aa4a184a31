//! Role extraction from session payloads.
//!
//! Session/auth collaborators hand over a decoded JSON document (token claims
//! or a session object). The role lives in one of a few conventional places;
//! this module only finds it. Interpreting it is the normalizer's job.

use serde_json::Value;

const ROLE_KEYS: [&str; 2] = ["role", "roles"];

/// Locate the role value in a session document.
///
/// Looks at `role`, then the first element of `roles`, first at the top level
/// and then under `user`. Returns `None` when no candidate is present, which
/// callers treat as an anonymous session.
pub fn role_claim(session: &Value) -> Option<&Value> {
    claim_in(session).or_else(|| session.get("user").and_then(claim_in))
}

fn claim_in(object: &Value) -> Option<&Value> {
    ROLE_KEYS.iter().find_map(|key| match object.get(key)? {
        Value::Null => None,
        Value::Array(items) => items.iter().find(|item| !item.is_null()),
        value => Some(value),
    })
}
