use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

use super::ApiError;
use super::types::OrderLineRequest;

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("static regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"))
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    if !(3..=20).contains(&username.len()) {
        return Err(ApiError::validation(
            "Username must be between 3 and 20 characters",
        ));
    }
    if !username_regex().is_match(username) {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if !(8..=20).contains(&password.len()) {
        return Err(ApiError::validation(
            "Password must be between 8 and 20 characters",
        ));
    }
    if !username_regex().is_match(password) {
        return Err(ApiError::validation(
            "Password can only contain letters, numbers, and underscores",
        ));
    }
    Ok(password)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if !email_regex().is_match(email) {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(email)
}

pub fn validate_dish_name(name: &str) -> Result<&str, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Dish name cannot be empty"));
    }
    if name.len() > 100 {
        return Err(ApiError::validation(
            "Dish name must be 100 characters or less",
        ));
    }
    Ok(name)
}

pub fn validate_description(description: &str) -> Result<&str, ApiError> {
    if description.len() > 255 {
        return Err(ApiError::validation(
            "Description must be 255 characters or less",
        ));
    }
    Ok(description)
}

pub fn validate_price(price: Decimal) -> Result<Decimal, ApiError> {
    if price < Decimal::ZERO {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    Ok(price)
}

pub fn validate_stock_quantity(quantity: i32) -> Result<i32, ApiError> {
    if quantity < 0 {
        return Err(ApiError::validation("Quantity cannot be negative"));
    }
    Ok(quantity)
}

pub fn validate_order_lines(lines: &[OrderLineRequest]) -> Result<(), ApiError> {
    if lines.is_empty() {
        return Err(ApiError::validation(
            "An order must contain at least one dish",
        ));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(ApiError::validation(format!(
                "Invalid quantity {} for dish {}. Quantity must be a positive integer",
                line.quantity, line.dish_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("bob").is_ok());
        assert!(validate_username("chef_anna42").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(21)).is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("bad@name").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret_12").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(21)).is_err());
        assert!(validate_password("has spaces!").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("anna@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
        assert!(validate_email("two@@example.com").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::new(1250, 2)).is_ok());
        assert!(validate_price(Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_validate_order_lines() {
        assert!(validate_order_lines(&[]).is_err());
        assert!(
            validate_order_lines(&[OrderLineRequest {
                dish_id: 1,
                quantity: 2
            }])
            .is_ok()
        );
        assert!(
            validate_order_lines(&[OrderLineRequest {
                dish_id: 1,
                quantity: 0
            }])
            .is_err()
        );
    }
}
