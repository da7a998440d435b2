use std::borrow::Cow;

const SECRET_KEYS: &[&str] = &["password", "pwd"];

/// Masks password-like entries of an ADO-style connection string so the
/// target can appear in logs and error messages.
pub fn redact_connection_target(target: &str) -> Cow<'_, str> {
    if !target.contains('=') {
        return target.into();
    }

    let mut changed = false;
    let parts: Vec<String> = target
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((k, _)) if SECRET_KEYS.contains(&k.trim().to_ascii_lowercase().as_str()) => {
                changed = true;
                format!("{}=[REDACTED]", k)
            }
            _ => part.to_string(),
        })
        .collect();

    if changed {
        parts.join(";").into()
    } else {
        target.into()
    }
}
