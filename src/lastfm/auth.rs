use serde_json::Value;

use crate::types::Session;

/// Computes the `api_sig` of a signed web service call.
///
/// All parameters except `format` and `callback` are sorted by name and
/// concatenated as name followed by value, the shared secret is appended and the
/// result is hashed with MD5.
pub(crate) fn sign(params: &[(&str, &str)], shared_secret: &str) -> String {
    let mut signed: Vec<&(&str, &str)> = params
        .iter()
        .filter(|(name, _)| *name != "format" && *name != "callback")
        .collect();
    signed.sort_by(|a, b| a.0.cmp(b.0));

    let mut payload = String::new();
    for (name, value) in signed {
        payload.push_str(name);
        payload.push_str(value);
    }
    payload.push_str(shared_secret);

    format!("{:x}", md5::compute(payload.as_bytes()))
}

/// Reads the session of an `auth.getMobileSession` response.
pub(crate) fn parse_session(json: &Value) -> Option<Session> {
    let session = &json["session"];
    let name = session["name"].as_str()?;
    let key = session["key"].as_str()?;
    let subscriber = match &session["subscriber"] {
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s == "1",
        Value::Bool(b) => *b,
        _ => false,
    };

    Some(Session {
        name: name.to_string(),
        key: key.to_string(),
        subscriber,
    })
}
