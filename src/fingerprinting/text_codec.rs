use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    definitions::{FINGERPRINT_BITS, FINGERPRINT_WORDS, HEX_LEN},
    Error, Fingerprint,
};

/// The text forms a fingerprint can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextFormat {
    /// 256 characters of `0`/`1`, bit 0 first.
    Binary,
    /// 64 lowercase hexadecimal digits, most significant first.
    #[default]
    Hex,
    /// The fingerprint read as an unsigned 256-bit integer, in base 10.
    Decimal,
}

impl TextFormat {
    pub fn encode(self, fp: &Fingerprint) -> String {
        match self {
            TextFormat::Binary => encode_binary(fp),
            TextFormat::Hex => encode_hex(fp),
            TextFormat::Decimal => encode_decimal(fp),
        }
    }

    pub fn decode(self, s: &str) -> Result<Fingerprint, Error> {
        let s = s.trim();
        match self {
            TextFormat::Binary => decode_binary(s),
            TextFormat::Hex => decode_hex(s),
            TextFormat::Decimal => decode_decimal(s),
        }
    }
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextFormat::Binary => "binary",
            TextFormat::Hex => "hex",
            TextFormat::Decimal => "decimal",
        };
        f.write_str(name)
    }
}

impl FromStr for TextFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bin" => Ok(TextFormat::Binary),
            "hex" => Ok(TextFormat::Hex),
            "decimal" | "dec" => Ok(TextFormat::Decimal),
            other => Err(Error::InvalidFormat(format!("unknown text format: {other}"))),
        }
    }
}

pub fn encode_binary(fp: &Fingerprint) -> String {
    fp.bits().map(|b| if b { '1' } else { '0' }).collect()
}

pub fn encode_hex(fp: &Fingerprint) -> String {
    fp.words().iter().map(|w| format!("{w:016x}")).collect()
}

pub fn encode_decimal(fp: &Fingerprint) -> String {
    let mut words = fp.words();
    let mut digits = vec![];

    //long division by 10, most significant word first.
    while words.iter().any(|w| *w != 0) {
        let mut remainder: u128 = 0;
        for word in words.iter_mut() {
            let acc = (remainder << 64) | u128::from(*word);
            *word = (acc / 10) as u64;
            remainder = acc % 10;
        }
        digits.push(b'0' + remainder as u8);
    }

    if digits.is_empty() {
        return "0".to_string();
    }

    digits.iter().rev().map(|d| char::from(*d)).collect()
}

/// Decode a fingerprint from either of its unambiguous text forms: 256 binary digits or
/// 64 hexadecimal digits (either case). Surrounding whitespace is ignored.
///
/// Decimal text is not accepted here, because 64 decimal digits are also valid hex. Use
/// [`decode_decimal`] for it.
///
/// # Errors
/// [`Error::InvalidFormat`] if the text is neither form.
pub fn decode(s: &str) -> Result<Fingerprint, Error> {
    let s = s.trim();
    match s.len() {
        FINGERPRINT_BITS => decode_binary(s),
        HEX_LEN => decode_hex(s),
        len => Err(Error::InvalidFormat(format!(
            "expected {FINGERPRINT_BITS} binary digits or {HEX_LEN} hex digits, got {len} characters"
        ))),
    }
}

fn decode_binary(s: &str) -> Result<Fingerprint, Error> {
    if s.len() != FINGERPRINT_BITS {
        return Err(Error::InvalidFormat(format!(
            "expected {FINGERPRINT_BITS} binary digits, got {} characters",
            s.len()
        )));
    }

    let bits = s
        .chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(Error::InvalidFormat(format!("not a binary digit: {other:?}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Fingerprint::from_bools(bits)
}

fn decode_hex(s: &str) -> Result<Fingerprint, Error> {
    if s.len() != HEX_LEN || !s.is_ascii() {
        return Err(Error::InvalidFormat(format!(
            "expected {HEX_LEN} hex digits, got {} characters",
            s.chars().count()
        )));
    }

    let mut words = [0u64; FINGERPRINT_WORDS];
    for (word, chunk) in words.iter_mut().zip(s.as_bytes().chunks(16)) {
        //chunks of an ascii string are valid utf8.
        let chunk = std::str::from_utf8(chunk).map_err(|e| Error::InvalidFormat(e.to_string()))?;
        if let Some(c) = chunk.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(Error::InvalidFormat(format!("not a hex digit: {c:?}")));
        }
        *word = u64::from_str_radix(chunk, 16).map_err(|e| Error::InvalidFormat(e.to_string()))?;
    }

    Ok(Fingerprint::from_words(words))
}

/// Decode a fingerprint written as a base-10 integer.
///
/// # Errors
/// [`Error::InvalidFormat`] if the text is empty, contains anything but ascii digits, or
/// is larger than 2^256 - 1.
pub fn decode_decimal(s: &str) -> Result<Fingerprint, Error> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidFormat("empty decimal string".to_string()));
    }

    let mut words = [0u64; FINGERPRINT_WORDS];
    for c in s.chars() {
        let digit = c
            .to_digit(10)
            .ok_or_else(|| Error::InvalidFormat(format!("not a decimal digit: {c:?}")))?;

        //words = words * 10 + digit, least significant word last.
        let mut carry = u128::from(digit);
        for word in words.iter_mut().rev() {
            let acc = u128::from(*word) * 10 + carry;
            *word = acc as u64;
            carry = acc >> 64;
        }

        if carry != 0 {
            return Err(Error::InvalidFormat(
                "decimal value does not fit in 256 bits".to_string(),
            ));
        }
    }

    Ok(Fingerprint::from_words(words))
}
