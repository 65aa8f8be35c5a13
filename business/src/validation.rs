//! Field rules shared by the edit forms and the strict update validator.
//!
//! Every rule returns an empty string for a valid (or empty) value and the
//! user-facing message otherwise. Emptiness itself is not a rule violation; the
//! forms handle it through their submit-enabled flag.

use std::sync::LazyLock;

use regex::Regex;

use crate::{FieldError, UserDetails};

pub const NICKNAME_MAX_CHARS: usize = 10;
pub const PASSWORD_CHARS: std::ops::RangeInclusive<usize> = 8..=64;

pub const NICKNAME_MESSAGE: &str = "Nickname must be at most 10 characters long";
pub const EMAIL_MESSAGE: &str = "Enter a valid email address";
pub const DESCRIPTION_MESSAGE: &str =
    "Description may contain only letters, digits and spaces, up to 200 characters";
pub const PASSWORD_MESSAGE: &str = "Password must be 8 to 64 characters long";
pub const CONFIRMATION_MESSAGE: &str = "Password confirmation differs";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    )
    .expect("Invalid regex")
});

static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 ]{0,200}$").expect("Invalid regex"));

pub fn nickname(value: &str) -> &'static str {
    if value.chars().count() > NICKNAME_MAX_CHARS {
        NICKNAME_MESSAGE
    } else {
        ""
    }
}

pub fn email(value: &str) -> &'static str {
    if value.is_empty() || EMAIL_RE.is_match(value) {
        ""
    } else {
        EMAIL_MESSAGE
    }
}

pub fn description(value: &str) -> &'static str {
    if DESCRIPTION_RE.is_match(value) {
        ""
    } else {
        DESCRIPTION_MESSAGE
    }
}

/// Unlike the other rules an empty password is rejected.
pub fn password(value: &str) -> &'static str {
    if PASSWORD_CHARS.contains(&value.chars().count()) {
        ""
    } else {
        PASSWORD_MESSAGE
    }
}

pub fn password_confirmation(password: &str, confirmation: &str) -> &'static str {
    if !password.is_empty() && !confirmation.is_empty() && password != confirmation {
        CONFIRMATION_MESSAGE
    } else {
        ""
    }
}

/// Every rule violated by `user`, in form order.
pub fn user_fields(user: &UserDetails) -> Vec<FieldError> {
    [
        ("nickname", nickname(&user.nickname)),
        ("email", email(&user.email)),
        ("description", description(&user.description)),
    ]
    .into_iter()
    .filter(|(_, message)| !message.is_empty())
    .map(|(field, message)| FieldError::new(field, message))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_length() {
        assert_eq!(nickname(""), "");
        assert_eq!(nickname("Nickname10"), "");
        assert_eq!(nickname("Nickname_11"), NICKNAME_MESSAGE);
    }

    #[test]
    fn test_email_pattern() {
        assert_eq!(email(""), "");
        assert_eq!(email("nickname1@test.com"), "");
        assert_eq!(email("first.last+tag@mail.example.org"), "");
        assert_eq!(email("nickname1@test"), EMAIL_MESSAGE);
        assert_eq!(email("not an email"), EMAIL_MESSAGE);
        assert_eq!(email("a@b.com trailing"), EMAIL_MESSAGE);
    }

    #[test]
    fn test_description_characters_and_length() {
        assert_eq!(description(""), "");
        assert_eq!(description("Test description 1"), "");
        assert_eq!(description("no-dashes"), DESCRIPTION_MESSAGE);
        assert_eq!(description(&"a".repeat(200)), "");
        assert_eq!(description(&"a".repeat(201)), DESCRIPTION_MESSAGE);
    }

    #[test]
    fn test_password_bounds() {
        assert_eq!(password(""), PASSWORD_MESSAGE);
        assert_eq!(password("short"), PASSWORD_MESSAGE);
        assert_eq!(password("V@lid001"), "");
        assert_eq!(password(&"x".repeat(64)), "");
        assert_eq!(password(&"x".repeat(65)), PASSWORD_MESSAGE);
    }

    #[test]
    fn test_password_length_counts_characters() {
        assert_eq!(password("żółwżółw"), "");
    }

    #[test]
    fn test_confirmation_only_checked_when_both_present() {
        assert_eq!(password_confirmation("", "abc"), "");
        assert_eq!(password_confirmation("abc", ""), "");
        assert_eq!(password_confirmation("V@lid001", "V@lid001"), "");
        assert_eq!(password_confirmation("V@lid001", "V@lid002"), CONFIRMATION_MESSAGE);
    }

    #[test]
    fn test_user_fields_lists_violations_in_order() {
        let user = UserDetails::new("", "Way too long nick", "bad", "Fine");
        let errors = user_fields(&user);

        assert_eq!(
            errors,
            vec![
                FieldError::new("nickname", NICKNAME_MESSAGE),
                FieldError::new("email", EMAIL_MESSAGE),
            ]
        );
        assert!(user_fields(&UserDetails::new("", "Nick", "nick@test.com", "Fine")).is_empty());
    }
}
