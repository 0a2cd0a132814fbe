use anyhow::{anyhow, Result};

/// Upper bound on tickets per sign-up for activities that allow several.
pub const MAX_TICKETS: u8 = 5;

pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("Name cannot be empty"));
    }

    if name.chars().count() > 50 {
        return Err(anyhow!("Name cannot be longer than 50 characters"));
    }

    if !name
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'')
    {
        return Err(anyhow!("Name can only contain letters, spaces, hyphens and apostrophes"));
    }

    Ok(name.to_string())
}

/// Normalises a phone number to `+` followed by digits.
pub fn normalize_phone(phone: &str) -> Result<String> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(anyhow!("Phone number cannot be empty"));
    }

    if !phone
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0))
    {
        return Err(anyhow!("Phone number can only contain digits, spaces, dashes and brackets"));
    }

    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(10..=15).contains(&digits.len()) {
        return Err(anyhow!("Phone number must have between 10 and 15 digits"));
    }

    Ok(format!("+{digits}"))
}

pub fn validate_theme(theme: &str) -> Result<String> {
    let theme = theme.trim();

    if theme.is_empty() {
        return Err(anyhow!("Theme cannot be empty"));
    }

    if theme.chars().count() > 100 {
        return Err(anyhow!("Theme cannot be longer than 100 characters"));
    }

    if theme.contains('\n') || theme.contains('\r') {
        return Err(anyhow!("Theme cannot contain line breaks"));
    }

    Ok(theme.to_string())
}

pub fn validate_description(description: &str) -> Result<String> {
    let description = description.trim();

    if description.is_empty() {
        return Err(anyhow!("Description cannot be empty"));
    }

    // Leaves room for the card header inside Telegram's 1024-character photo caption.
    if description.chars().count() > 900 {
        return Err(anyhow!("Description cannot be longer than 900 characters"));
    }

    Ok(description.to_string())
}

pub fn validate_question(question: &str) -> Result<String> {
    let question = question.trim();

    if question.is_empty() {
        return Err(anyhow!("Question cannot be empty"));
    }

    if question.chars().count() > 1000 {
        return Err(anyhow!("Question cannot be longer than 1000 characters"));
    }

    Ok(question.to_string())
}

pub fn parse_activity_id(input: &str) -> Result<i64> {
    let input = input.trim();

    if input.is_empty() {
        return Err(anyhow!("Activity ID is required"));
    }

    match input.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(anyhow!("Activity ID must be a positive number")),
    }
}

pub fn validate_ticket_count(count: u8, allows_multiple: bool) -> Result<u8> {
    let max = if allows_multiple { MAX_TICKETS } else { 1 };

    if count == 0 || count > max {
        return Err(anyhow!("Ticket count must be between 1 and {}", max));
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_valid() {
        assert_eq!(validate_name("  Anna  ").unwrap(), "Anna");
        assert!(validate_name("Anne-Marie").is_ok());
        assert!(validate_name("O'Neil").is_ok());
        assert!(validate_name("Мария").is_ok());
    }

    #[test]
    fn test_validate_name_invalid() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("R2D2").is_err());
        assert!(validate_name(&"a".repeat(51)).is_err());
        assert!(validate_name(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_normalize_phone_valid() {
        assert_eq!(normalize_phone("+7 (999) 123-45-67").unwrap(), "+79991234567");
        assert_eq!(normalize_phone("89991234567").unwrap(), "+89991234567");
        assert_eq!(normalize_phone("+441632960961").unwrap(), "+441632960961");
    }

    #[test]
    fn test_normalize_phone_invalid() {
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("phone: 79991234567").is_err());
        assert!(normalize_phone("7999+1234567").is_err());
        assert!(normalize_phone(&"1".repeat(16)).is_err());
    }

    #[test]
    fn test_validate_theme() {
        assert_eq!(validate_theme(" Sunflowers in oil ").unwrap(), "Sunflowers in oil");
        assert!(validate_theme("").is_err());
        assert!(validate_theme("Two\nlines").is_err());
        assert!(validate_theme(&"a".repeat(101)).is_err());
        assert!(validate_theme(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_description_and_question() {
        assert!(validate_description("Bring an apron.\nPaints provided.").is_ok());
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"a".repeat(901)).is_err());
        assert!(validate_question("Is parking available?").is_ok());
        assert!(validate_question("").is_err());
        assert!(validate_question(&"a".repeat(1001)).is_err());
    }

    #[test]
    fn test_parse_activity_id() {
        assert_eq!(parse_activity_id(" 12 ").unwrap(), 12);
        assert!(parse_activity_id("").is_err());
        assert!(parse_activity_id("0").is_err());
        assert!(parse_activity_id("-3").is_err());
        assert!(parse_activity_id("abc").is_err());
    }

    #[test]
    fn test_validate_ticket_count() {
        assert_eq!(validate_ticket_count(1, false).unwrap(), 1);
        assert!(validate_ticket_count(2, false).is_err());
        assert_eq!(validate_ticket_count(MAX_TICKETS, true).unwrap(), MAX_TICKETS);
        assert!(validate_ticket_count(MAX_TICKETS + 1, true).is_err());
        assert!(validate_ticket_count(0, true).is_err());
    }
}
