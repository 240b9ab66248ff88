use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref NUMERIC_ONLY: Regex = Regex::new(r"^\d+$").unwrap();
    static ref PHONE_NUMBER: Regex = Regex::new(r"^07[0-9]{9}$").unwrap();
}

pub fn validate_otp_length(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6 {
        let mut error = ValidationError::new("invalid_length");
        error.message = Some(Cow::from("The code must be exactly 6 digits long"));
        return Err(error);
    }

    Ok(())
}

pub fn validate_otp_format(code: &str) -> Result<(), ValidationError> {
    if !NUMERIC_ONLY.is_match(code) {
        let mut error = ValidationError::new("invalid_format");
        error.message = Some(Cow::from("The code must contain only numbers"));
        return Err(error);
    }

    Ok(())
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        let mut error = ValidationError::new("too_short");
        error.message = Some(Cow::from("The password must be at least 8 characters"));
        return Err(error);
    }

    Ok(())
}

pub fn validate_phone_number(phone_number: &str) -> Result<(), ValidationError> {
    if !PHONE_NUMBER.is_match(phone_number) {
        let mut error = ValidationError::new("invalid_phone_number");
        error.message = Some(Cow::from("The phone number must match 07XXXXXXXXX"));
        return Err(error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_must_be_six_numeric_digits() {
        assert!(validate_otp_length("123456").is_ok());
        assert!(validate_otp_length("12345").is_err());
        assert!(validate_otp_format("123456").is_ok());
        assert!(validate_otp_format("12345a").is_err());
    }

    #[test]
    fn phone_numbers_follow_the_local_format() {
        assert!(validate_phone_number("07123456789").is_ok());
        assert!(validate_phone_number("0712345678").is_err());
        assert!(validate_phone_number("08123456789").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password_strength("longenough").is_ok());
        assert!(validate_password_strength("short").is_err());
    }
}
