//! Decimal number scanning and `%g` formatting for ASCII STL.

/// Mantissa digits kept by the scanner; 19 decimal digits always fit a u64.
const MAX_MANTISSA_DIGITS: u32 = 19;

/// Largest integer exactly representable in an f64.
const MAX_EXACT_INT: u64 = 1 << 53;

/// Powers of ten exactly representable in an f64.
const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Scans `[+-]digits[.digits][(e|E)[+-]digits]` into an f64.
///
/// Returns `None` if the token is not a complete number. The mantissa, the
/// count of fractional digits and the signed exponent are accumulated in one
/// pass. When the mantissa fits 53 bits and the combined power of ten is at
/// most 22 the result is one exact IEEE multiplication or division.
///
/// Every other input (more than 19 significant digits, or a power of ten
/// outside 1e-22..=1e22) goes through `str::parse::<f64>` on the token the
/// scanner has already validated, since correct rounding there needs
/// big-integer arithmetic.
pub fn parse_float(token: &[u8]) -> Option<f64> {
    let mut i = 0;
    let negative = match token.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let mut mantissa: u64 = 0;
    let mut significant: u32 = 0;
    let mut any_digit = false;
    let mut truncated = false;
    // Power of ten correction: digits dropped from the integer part count
    // up, fractional digits kept in the mantissa count down.
    let mut scale: i64 = 0;

    while let Some(&b) = token.get(i).filter(|b| b.is_ascii_digit()) {
        any_digit = true;
        if significant < MAX_MANTISSA_DIGITS {
            mantissa = mantissa * 10 + u64::from(b - b'0');
            if mantissa != 0 {
                significant += 1;
            }
        } else {
            truncated |= b != b'0';
            scale += 1;
        }
        i += 1;
    }
    if token.get(i) == Some(&b'.') {
        i += 1;
        while let Some(&b) = token.get(i).filter(|b| b.is_ascii_digit()) {
            any_digit = true;
            if significant < MAX_MANTISSA_DIGITS {
                mantissa = mantissa * 10 + u64::from(b - b'0');
                if mantissa != 0 {
                    significant += 1;
                }
                scale -= 1;
            } else {
                truncated |= b != b'0';
            }
            i += 1;
        }
    }
    if !any_digit {
        return None;
    }

    let mut exponent: i64 = 0;
    if matches!(token.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        let exp_negative = match token.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };
        let start = i;
        while let Some(&b) = token.get(i).filter(|b| b.is_ascii_digit()) {
            // Saturate far beyond the f64 range; the value is inf or 0 anyway.
            exponent = (exponent * 10 + i64::from(b - b'0')).min(1_000_000);
            i += 1;
        }
        if i == start {
            return None;
        }
        if exp_negative {
            exponent = -exponent;
        }
    }
    if i != token.len() {
        return None;
    }

    let power = exponent + scale;
    let magnitude = if mantissa == 0 {
        0.0
    } else if !truncated && mantissa <= MAX_EXACT_INT && power.unsigned_abs() < POW10.len() as u64 {
        let m = mantissa as f64;
        if power >= 0 {
            m * POW10[power as usize]
        } else {
            m / POW10[(-power) as usize]
        }
    } else {
        let text = std::str::from_utf8(token).ok()?;
        return text.parse::<f64>().ok();
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Appends `value` formatted like C's `%.{precision}g`.
pub fn format_g(value: f64, precision: usize, out: &mut Vec<u8>) {
    if value.is_nan() {
        out.extend_from_slice(b"nan");
        return;
    }
    if value.is_infinite() {
        out.extend_from_slice(if value < 0.0 { b"-inf" } else { b"inf" });
        return;
    }
    if value == 0.0 {
        out.extend_from_slice(if value.is_sign_negative() { b"-0" } else { b"0" });
        return;
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (digits, exp) = match scientific.split_once('e') {
        Some((digits, exp)) => (digits, exp.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exp < -4 || exp >= precision as i32 {
        out.extend_from_slice(strip_zeros(digits).as_bytes());
        out.push(b'e');
        out.push(if exp < 0 { b'-' } else { b'+' });
        let abs = exp.unsigned_abs();
        if abs < 10 {
            out.push(b'0');
        }
        out.extend_from_slice(abs.to_string().as_bytes());
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        out.extend_from_slice(strip_zeros(&fixed).as_bytes());
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn g(value: f64) -> String {
        let mut out = Vec::new();
        format_g(value, 6, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scans_common_forms() {
        assert_eq!(parse_float(b"1"), Some(1.0));
        assert_eq!(parse_float(b"-0.5"), Some(-0.5));
        assert_eq!(parse_float(b"+2.25"), Some(2.25));
        assert_eq!(parse_float(b"1.5e3"), Some(1500.0));
        assert_eq!(parse_float(b"1.5E-3"), Some(0.0015));
        assert_eq!(parse_float(b".5"), Some(0.5));
        assert_eq!(parse_float(b"5."), Some(5.0));
        assert_eq!(parse_float(b"-0"), Some(-0.0));
        assert!(parse_float(b"-0").unwrap().is_sign_negative());
        assert_eq!(parse_float(b"0.1"), Some(0.1));
        assert_eq!(parse_float(b"1.00000000000000000000000001"), Some(1.0));
        for text in ["123456789012345678901234567890", "4.9e-324", "1.7976931348623157e308"] {
            assert_eq!(parse_float(text.as_bytes()), text.parse::<f64>().ok(), "{text}");
        }
    }

    #[test]
    fn rejects_malformed_tokens() {
        let tokens: [&[u8]; 11] = [
            b"", b"-", b".", b"e5", b"1e", b"1e+", b"1.2.3", b"1x", b"nan", b"inf", b"--1",
        ];
        for token in tokens {
            assert_eq!(parse_float(token), None, "{:?}", String::from_utf8_lossy(token));
        }
    }

    #[test]
    fn formats_like_printf_g() {
        assert_eq!(g(1.0), "1");
        assert_eq!(g(-1.0), "-1");
        assert_eq!(g(0.5), "0.5");
        assert_eq!(g(0.0), "0");
        assert_eq!(g(-0.0), "-0");
        assert_eq!(g(100000.0), "100000");
        assert_eq!(g(1000000.0), "1e+06");
        assert_eq!(g(123456789.0), "1.23457e+08");
        assert_eq!(g(0.0001), "0.0001");
        assert_eq!(g(0.00001), "1e-05");
        assert_eq!(g(3.14159265), "3.14159");
        assert_eq!(g(1.5e-300), "1.5e-300");
    }

    proptest! {
        #[test]
        fn scanner_matches_std_parse(value in proptest::num::f64::NORMAL | proptest::num::f64::SUBNORMAL) {
            let text = format!("{value:e}");
            prop_assert_eq!(parse_float(text.as_bytes()), Some(value));
        }

        #[test]
        fn fixed_notation_matches_std_parse(int in -1_000_000i64..1_000_000, frac in 0u32..100_000) {
            let text = format!("{int}.{frac:05}");
            prop_assert_eq!(parse_float(text.as_bytes()), text.parse::<f64>().ok());
        }

        #[test]
        fn seventeen_digits_round_trip(value in proptest::num::f64::NORMAL) {
            let mut out = Vec::new();
            format_g(value, 17, &mut out);
            prop_assert_eq!(parse_float(&out), Some(value));
        }
    }
}
