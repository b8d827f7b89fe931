//! Form validation applied before a submission reaches a tracker.
//!
//! The feedback tracker only enforces [`rating`] itself; the remaining
//! checks are what the download and feedback forms enforce.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::feedback::{NewFeedback, MAX_RATING};

static EMAIL: OnceLock<Regex> = OnceLock::new();
static PHONE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn phone_regex() -> &'static Regex {
    PHONE.get_or_init(|| Regex::new(r"^[0-9+()\- ]{6,20}$").expect("phone pattern is valid"))
}

fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_input(field, "must not be empty"));
    }
    Ok(())
}

/// Check an email address has the `local@domain.tld` shape.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for `email` if it does not.
pub fn email(value: &str) -> Result<()> {
    if email_regex().is_match(value.trim()) {
        Ok(())
    } else {
        Err(Error::invalid_input(
            "email",
            format!("'{value}' is not a valid email address"),
        ))
    }
}

/// Check an optional phone number.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for `phone` if it is present and malformed.
pub fn phone(value: Option<&str>) -> Result<()> {
    match value {
        Some(p) if !phone_regex().is_match(p.trim()) => Err(Error::invalid_input(
            "phone",
            format!("'{p}' should be 6-20 digits, spaces or + - ( )"),
        )),
        _ => Ok(()),
    }
}

/// Check a rating lies in `[0, 5]`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for `rating` if it is out of range or NaN.
pub fn rating(value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=MAX_RATING).contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_input(
            "rating",
            format!("{value} is outside 0 to {MAX_RATING}"),
        ))
    }
}

/// Validate the download form.
///
/// # Errors
///
/// Returns the first failing field.
pub fn download(name: &str, email_address: &str) -> Result<()> {
    required("name", name)?;
    email(email_address)
}

/// Validate the feedback form.
///
/// The name may be blank for anonymous submissions.
///
/// # Errors
///
/// Returns the first failing field.
pub fn feedback(input: &NewFeedback) -> Result<()> {
    if !input.is_anonymous {
        required("name", &input.name)?;
    }
    email(&input.email)?;
    phone(input.phone.as_deref())?;
    rating(input.rating)?;
    required("title", &input.title)?;
    required("content", &input.content)?;
    if let Some(avatar) = &input.avatar {
        if !(avatar.starts_with("https://") || avatar.starts_with("http://")) {
            return Err(Error::invalid_input(
                "avatar",
                format!("'{avatar}' is not an http(s) URL"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackCategory;

    fn valid_feedback() -> NewFeedback {
        NewFeedback {
            name: "Minh".to_string(),
            email: "minh@example.vn".to_string(),
            phone: Some("(+84) 912-345-678".to_string()),
            category: FeedbackCategory::Feature,
            rating: 4.5,
            title: "Offline maps".to_string(),
            content: "Please add offline maps for the delta.".to_string(),
            is_anonymous: false,
            avatar: Some("https://example.com/a.png".to_string()),
        }
    }

    fn failing_field(result: Result<()>) -> &'static str {
        match result {
            Err(Error::InvalidInput { field, .. }) => field,
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn test_email() {
        assert!(email("a@x.com").is_ok());
        assert!(email(" a.b+c@sub.example.org ").is_ok());
        assert!(email("no-at-sign").is_err());
        assert!(email("a@nodot").is_err());
        assert!(email("a b@x.com").is_err());
        assert!(email("").is_err());
    }

    #[test]
    fn test_phone() {
        assert!(phone(None).is_ok());
        assert!(phone(Some("0901234567")).is_ok());
        assert!(phone(Some("+84 90 123 4567")).is_ok());
        assert!(phone(Some("12345")).is_err());
        assert!(phone(Some("call me maybe")).is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(rating(0.0).is_ok());
        assert!(rating(5.0).is_ok());
        assert!(rating(2.5).is_ok());
        assert!(rating(-0.5).is_err());
        assert!(rating(5.1).is_err());
        assert!(rating(f64::NAN).is_err());
        assert!(rating(f64::INFINITY).is_err());
    }

    #[test]
    fn test_download_form() {
        assert!(download("Alice", "a@x.com").is_ok());
        assert_eq!(failing_field(download("  ", "a@x.com")), "name");
        assert_eq!(failing_field(download("Alice", "nope")), "email");
    }

    #[test]
    fn test_feedback_form_valid() {
        assert!(feedback(&valid_feedback()).is_ok());
    }

    #[test]
    fn test_feedback_anonymous_may_omit_name() {
        let mut input = valid_feedback();
        input.name = String::new();
        assert_eq!(failing_field(feedback(&input)), "name");

        input.is_anonymous = true;
        assert!(feedback(&input).is_ok());
    }

    #[test]
    fn test_feedback_form_failures() {
        let mut input = valid_feedback();
        input.rating = 7.0;
        assert_eq!(failing_field(feedback(&input)), "rating");

        let mut input = valid_feedback();
        input.title = " ".to_string();
        assert_eq!(failing_field(feedback(&input)), "title");

        let mut input = valid_feedback();
        input.content = String::new();
        assert_eq!(failing_field(feedback(&input)), "content");

        let mut input = valid_feedback();
        input.avatar = Some("ftp://example.com/a.png".to_string());
        assert_eq!(failing_field(feedback(&input)), "avatar");

        let mut input = valid_feedback();
        input.phone = Some("x".to_string());
        assert_eq!(failing_field(feedback(&input)), "phone");
    }
}
