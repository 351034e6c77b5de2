//! Number and address formatting for console reports

use rust_decimal::Decimal;

/// `1234567.891` -> `1,234,567.89`
pub fn format_amount(value: Decimal) -> String {
    let fixed = format!("{:.2}", value.round_dp(2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{}", sign, grouped, fraction)
}

/// `0x28c6c06298d514db...` -> `0x28c6c0...f21d60`
pub fn short_address(address: &str) -> String {
    match (address.get(..8), address.get(address.len().saturating_sub(6)..)) {
        (Some(head), Some(tail)) if address.len() > 14 => format!("{}...{}", head, tail),
        _ => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(dec!(5000000)), "5,000,000.00");
        assert_eq!(format_amount(dec!(143171664723.56)), "143,171,664,723.56");
        assert_eq!(format_amount(dec!(999.999)), "1,000.00");
        assert_eq!(format_amount(dec!(0)), "0.00");
        assert_eq!(format_amount(dec!(123)), "123.00");
        assert_eq!(format_amount(dec!(-1234.5)), "-1,234.50");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0x28c6c06298d514db089934071355e5743bf21d60"),
            "0x28c6c0...f21d60"
        );
        assert_eq!(short_address("0xabc"), "0xabc");
    }
}
