pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check only: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<String, String> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return Err("Full name is required".into());
    }
    if trimmed.chars().count() > 200 {
        return Err("Full name is too long".into());
    }
    Ok(trimmed.to_string())
}

/// Empty strings collapse to `None` so optional form fields round-trip as
/// absent.
pub fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
