use super::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 32;

/// Field-level username rules. Returns the failure message so callers can
/// build an error map.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username cannot be empty".to_string());
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be {} characters or less",
            MAX_USERNAME_LEN
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Username can only contain letters, numbers, hyphens, and underscores".to_string(),
        );
    }

    if !username.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err("Username must start with a letter".to_string());
    }

    Ok(())
}

/// Minimal structural email check. Anything fancier belongs to the mail
/// provider bouncing the message.
pub fn validate_email(email: &str) -> Result<(), String> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Enter a valid email address".to_string());
    };

    if local.is_empty()
        || domain.is_empty()
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
        || email.contains(char::is_whitespace)
    {
        return Err("Enter a valid email address".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("Password cannot be entirely numeric".to_string());
    }

    Ok(())
}

pub fn validate_page_params(page: u64, per_page: u64) -> Result<(u64, u64), ApiError> {
    const MAX_PER_PAGE: u64 = 100;

    if page == 0 {
        return Err(ApiError::validation("Page numbers start at 1"));
    }

    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(ApiError::validation(format!(
            "per_page must be between 1 and {}",
            MAX_PER_PAGE
        )));
    }

    Ok((page, per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice-b_2").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("2fast").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());
        assert!(validate_email("nope").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Secret123!").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_err());
    }

    #[test]
    fn test_validate_page_params() {
        assert!(validate_page_params(1, 20).is_ok());
        assert!(validate_page_params(0, 20).is_err());
        assert!(validate_page_params(1, 0).is_err());
        assert!(validate_page_params(1, 101).is_err());
    }
}
