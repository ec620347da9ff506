//! Phone number entry helpers (`XXX-XXXX-XXXX`).

/// Formats digits progressively as they are typed: `010`, `010-1234`,
/// `010-1234-5678`. Non-digits are dropped, input past 11 digits is cut.
pub fn format_phone_number(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).take(11).collect();

    match digits.len() {
        0..=3 => digits,
        4..=7 => format!("{}-{}", &digits[..3], &digits[3..]),
        _ => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
    }
}

pub fn strip_phone_hyphens(phone: &str) -> String {
    phone.replace('-', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progressive_formatting() {
        assert_eq!(format_phone_number(""), "");
        assert_eq!(format_phone_number("010"), "010");
        assert_eq!(format_phone_number("0101"), "010-1");
        assert_eq!(format_phone_number("0101234"), "010-1234");
        assert_eq!(format_phone_number("01012345"), "010-1234-5");
        assert_eq!(format_phone_number("01012345678"), "010-1234-5678");
    }

    #[test]
    fn test_formatting_drops_noise_and_truncates() {
        assert_eq!(format_phone_number("010-1234-5678"), "010-1234-5678");
        assert_eq!(format_phone_number("010 1234 5678 99"), "010-1234-5678");
        assert_eq!(format_phone_number("abc"), "");
    }

    #[test]
    fn test_strip_hyphens() {
        assert_eq!(strip_phone_hyphens("010-1234-5678"), "01012345678");
        assert_eq!(strip_phone_hyphens("0101234"), "0101234");
    }
}
