use thiserror::Error;

/// Decimal places of the token's smallest unit. Committed into every leaf
/// hash together with the encoding in merkledrop-hash; never change it.
pub const SCALE_DECIMALS: u32 = 18;

/// Base units per whole token (10^18).
pub const SCALE: u128 = 10u128.pow(SCALE_DECIMALS);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount string")]
    Empty,
    #[error("invalid character {0:?} in amount")]
    InvalidCharacter(char),
    #[error("amount needs more than {SCALE_DECIMALS} fractional digits; refusing to round")]
    PrecisionLoss,
    #[error("amount overflows the base-unit range")]
    Overflow,
}

/// Convert a human-scale decimal string (e.g. `"123.4567"`) to an exact
/// count of base units. Pure decimal-string arithmetic; a value that cannot
/// be represented exactly at 18 decimals is an error, never rounded.
///
/// Accepted grammar: `digits`, `digits.digits`, or `.digits`. No sign, no
/// exponent, no separators.
pub fn to_base_units(text: &str) -> Result<u128, AmountError> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Empty);
    }

    let int_units = parse_digits(int_part)?;
    let frac_units = frac_base_units(frac_part)?;

    int_units
        .checked_mul(SCALE)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or(AmountError::Overflow)
}

/// Base units contributed by the fractional digits, scaled to 18 places.
fn frac_base_units(frac: &str) -> Result<u128, AmountError> {
    let scale = SCALE_DECIMALS as usize;
    let (kept, excess) = if frac.len() > scale {
        frac.split_at(scale)
    } else {
        (frac, "")
    };
    for c in excess.chars() {
        if !c.is_ascii_digit() {
            return Err(AmountError::InvalidCharacter(c));
        }
        if c != '0' {
            return Err(AmountError::PrecisionLoss);
        }
    }
    let value = parse_digits(kept)?;
    // Pad the kept digits out to the full scale.
    let pad = 10u128.pow((scale - kept.len()) as u32);
    Ok(value * pad)
}

fn parse_digits(digits: &str) -> Result<u128, AmountError> {
    let mut value: u128 = 0;
    for c in digits.chars() {
        let d = c.to_digit(10).ok_or(AmountError::InvalidCharacter(c))? as u128;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(d))
            .ok_or(AmountError::Overflow)?;
    }
    Ok(value)
}
