//! Shared parsers for the numeric and identifier literals that appear
//! throughout SPC700 assembly: operand addresses, `.byte`/`.word` lists,
//! and `.org`/`.patch` arguments all bottom out here.

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case};
use nom::character::complete::{char, one_of};
use nom::combinator::{complete, map, map_res, opt, recognize};
use nom::multi::{many0, many1};
use nom::sequence::{pair, preceded};
use nom::IResult;

fn sign(input: &str) -> IResult<&str, bool> {
    map(opt(alt((tag("+"), tag("-")))), |s: Option<&str>| s == Some("-"))(input)
}

fn hex_digits(input: &str) -> IResult<&str, &str> {
    recognize(many1(terminated_digit("0123456789ABCDEFabcdef")))(input)
}

fn decimal_digits(input: &str) -> IResult<&str, &str> {
    recognize(many1(terminated_digit("0123456789")))(input)
}

fn terminated_digit(charset: &'static str) -> impl Fn(&str) -> IResult<&str, char> {
    move |input: &str| {
        let (input, c) = one_of(charset)(input)?;
        let (input, _) = many0(char('_'))(input)?;
        Ok((input, c))
    }
}

fn dollar_hex(input: &str) -> IResult<&str, i64> {
    map_res(
        pair(sign, preceded(complete(tag("$")), hex_digits)),
        |(neg, digits): (bool, &str)| {
            i64::from_str_radix(&digits.replace('_', ""), 16).map(|v| if neg { -v } else { v })
        },
    )(input)
}

fn prefixed_hex(input: &str) -> IResult<&str, i64> {
    map_res(
        pair(sign, preceded(complete(tag_no_case("0x")), hex_digits)),
        |(neg, digits): (bool, &str)| {
            i64::from_str_radix(&digits.replace('_', ""), 16).map(|v| if neg { -v } else { v })
        },
    )(input)
}

fn plain_decimal(input: &str) -> IResult<&str, i64> {
    map_res(
        pair(sign, decimal_digits),
        |(neg, digits): (bool, &str)| {
            digits
                .replace('_', "")
                .parse::<i64>()
                .map(|v| if neg { -v } else { v })
        },
    )(input)
}

/// Parses `$HEX`, `0xHEX` or a (possibly signed) decimal literal, consuming
/// the whole input. This is the numeric grammar used for operand addresses,
/// `.org`/`.patch` addresses, and `.byte`/`.word` literals.
pub fn parse_int(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let result = alt((dollar_hex, prefixed_hex, plain_decimal))(trimmed);
    match result {
        Ok(("", value)) => Some(value),
        _ => None,
    }
}

/// Truncates a signed value to its low 8 bits, as `.byte` literals and
/// 1-byte operand encodings do.
pub fn trunc_u8(v: i64) -> u8 {
    (v & 0xFF) as u8
}

/// Truncates a signed value to its low 16 bits, as `.word` literals and
/// 2-byte operand encodings do.
pub fn trunc_u16(v: i64) -> u16 {
    (v & 0xFFFF) as u16
}

/// Whether `text` is a valid SPC700 assembly identifier:
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_hex_literal() {
        assert_eq!(parse_int("$1BBD"), Some(0x1BBD));
    }

    #[test]
    fn prefixed_hex_literal() {
        assert_eq!(parse_int("0xFF"), Some(0xFF));
    }

    #[test]
    fn negative_decimal_literal() {
        assert_eq!(parse_int("-1234"), Some(-1234));
    }

    #[test]
    fn negative_hex_literal() {
        assert_eq!(parse_int("-$10"), Some(-0x10));
    }

    #[test]
    fn plain_decimal_literal() {
        assert_eq!(parse_int("42"), Some(42));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_int("hello"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn identifier_rules() {
        assert!(is_ident("L1"));
        assert!(is_ident("_underscore"));
        assert!(!is_ident("1label"));
        assert!(!is_ident("has-dash"));
        assert!(!is_ident(""));
    }
}
