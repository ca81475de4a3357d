/// Parse an integer from a string value, or return the given default value otherwise.
pub fn parse_int_flag(value: Option<String>, default: i64) -> i64 {
    value.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_flags() {
        assert_eq!(parse_int_flag(Some(" 600 ".into()), 0), 600);
        assert_eq!(parse_int_flag(Some("x".into()), 42), 42);
        assert_eq!(parse_int_flag(None, 42), 42);
    }
}
