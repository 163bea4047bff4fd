//! Check-digit algorithms for shape-valid numeric identifiers
//!
//! Luhn (credit cards) and ISO 7064 mod-97-10 (IBANs). Transformers recompute
//! these after encryption so anonymized identifiers still validate.

/// Whether a digit string passes the Luhn check
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    luhn_sum(digits) % 10 == 0
}

/// Compute the Luhn check digit for a payload (the digits without the final
/// check position)
pub fn luhn_check_digit(payload: &str) -> char {
    // The payload shifts one position left of where it sits in the full
    // number, so double from the rightmost payload digit.
    let mut sum: u32 = 0;
    for (i, b) in payload.bytes().rev().enumerate() {
        let mut d = (b - b'0') as u32;
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    (b'0' + ((10 - (sum % 10)) % 10) as u8) as char
}

fn luhn_sum(digits: &str) -> u32 {
    let mut sum: u32 = 0;
    for (i, b) in digits.bytes().rev().enumerate() {
        let mut d = (b - b'0') as u32;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum
}

/// ISO 7064 mod-97-10 remainder over an alphanumeric string, with letters
/// mapped A=10 .. Z=35
pub fn mod97(s: &str) -> u32 {
    let mut rem: u32 = 0;
    for c in s.chars() {
        if let Some(d) = c.to_digit(10) {
            rem = (rem * 10 + d) % 97;
        } else if c.is_ascii_uppercase() {
            let v = (c as u32) - ('A' as u32) + 10;
            rem = (rem * 100 + v) % 97;
        }
    }
    rem
}

/// Whether a normalized IBAN (no spaces, uppercase) has valid check digits
pub fn iban_valid(iban: &str) -> bool {
    if iban.len() < 5 {
        return false;
    }
    let rearranged = format!("{}{}", &iban[4..], &iban[..4]);
    mod97(&rearranged) == 1
}

/// Compute the two IBAN check digits for a country code and BBAN
pub fn iban_check_digits(country: &str, bban: &str) -> String {
    let rearranged = format!("{bban}{country}00");
    format!("{:02}", 98 - mod97(&rearranged))
}
