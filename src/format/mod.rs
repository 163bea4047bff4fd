//! Format introspection: shape masks, payload segments and signatures
//!
//! A value is decomposed into a per-codepoint class mask plus the contiguous
//! payload runs that transformers and the FPE engine operate on. Everything
//! that is not an ASCII letter or digit passes through literally.

pub mod checksum;

use crate::domain::{Result, VeilError};

/// Character class of a single codepoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Upper,
    Lower,
    Digit,
    /// Literal codepoint, preserved identically
    Other(char),
}

impl CharClass {
    pub fn of(c: char) -> Self {
        if c.is_ascii_digit() {
            Self::Digit
        } else if c.is_uppercase() {
            Self::Upper
        } else if c.is_lowercase() {
            Self::Lower
        } else {
            Self::Other(c)
        }
    }
}

/// Replacement alphabet for a payload segment or an FPE block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// `0-9`
    Digits,
    /// `a-z`
    Lower,
    /// `A-Z`
    Upper,
    /// `0-9a-f`
    LowerHex,
    /// `0-9A-Z`, the IBAN basic account number alphabet
    UpperAlnum,
}

impl Alphabet {
    pub fn chars(&self) -> &'static str {
        match self {
            Self::Digits => "0123456789",
            Self::Lower => "abcdefghijklmnopqrstuvwxyz",
            Self::Upper => "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Self::LowerHex => "0123456789abcdef",
            Self::UpperAlnum => "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ",
        }
    }

    pub fn radix(&self) -> usize {
        self.chars().len()
    }

    // Alphabets are single-byte ASCII, so byte position == symbol index
    pub fn index_of(&self, c: char) -> Option<usize> {
        self.chars().find(c)
    }

    pub fn char_at(&self, index: usize) -> char {
        self.chars().as_bytes()[index] as char
    }

    pub fn contains(&self, c: char) -> bool {
        self.index_of(c).is_some()
    }
}

/// Shape of a value: the class of every codepoint, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    classes: Vec<CharClass>,
}

impl Shape {
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[CharClass] {
        &self.classes
    }
}

/// A contiguous run of codepoints that all share one alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub alphabet: Alphabet,
    pub text: String,
}

/// Walk the string once and split it into a shape mask and payload segments
pub fn decompose(s: &str) -> (Shape, Vec<Segment>) {
    let mut classes = Vec::new();
    let mut segments: Vec<Segment> = Vec::new();

    for c in s.chars() {
        let class = CharClass::of(c);
        classes.push(class);

        let alphabet = match class {
            CharClass::Upper => Alphabet::Upper,
            CharClass::Lower => Alphabet::Lower,
            CharClass::Digit => Alphabet::Digits,
            CharClass::Other(_) => continue,
        };

        match segments.last_mut() {
            Some(seg) if seg.alphabet == alphabet && last_is_payload(&classes) => {
                seg.text.push(c);
            }
            _ => segments.push(Segment {
                alphabet,
                text: c.to_string(),
            }),
        }
    }

    (Shape { classes }, segments)
}

// A new segment starts whenever the previous codepoint was literal or of a
// different class; `classes` always ends with the current payload codepoint.
fn last_is_payload(classes: &[CharClass]) -> bool {
    if classes.len() < 2 {
        return false;
    }
    matches!(
        classes[classes.len() - 2],
        CharClass::Upper | CharClass::Lower | CharClass::Digit
    ) && std::mem::discriminant(&classes[classes.len() - 2])
        == std::mem::discriminant(&classes[classes.len() - 1])
}

/// Rebuild a string from a shape and replacement payload segments
///
/// The inverse of [`decompose`]: literal codepoints come from the shape,
/// payload codepoints are consumed from the segments in order. Segment
/// lengths must add up to the shape's payload length.
pub fn recompose(shape: &Shape, segments: &[Segment]) -> Result<String> {
    let mut out = String::with_capacity(shape.len());
    let mut seg_iter = segments.iter();
    let mut current: Option<std::str::Chars<'_>> = None;

    for class in &shape.classes {
        match class {
            CharClass::Other(c) => out.push(*c),
            _ => loop {
                if let Some(chars) = current.as_mut() {
                    if let Some(c) = chars.next() {
                        out.push(c);
                        break;
                    }
                }
                current = Some(
                    seg_iter
                        .next()
                        .ok_or_else(|| {
                            VeilError::FormatUnparseable {
                                kind: "shape",
                                detail: "payload segments shorter than shape".to_string(),
                            }
                        })?
                        .text
                        .chars(),
                );
            },
        }
    }

    Ok(out)
}

/// Format signature of a string: its class mask including length
pub fn signature(s: &str) -> Shape {
    decompose(s).0
}

/// Whether two strings have identical format signatures
pub fn same_signature(a: &str, b: &str) -> bool {
    signature(a) == signature(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_phone() {
        let (shape, segments) = decompose("+61-421");
        assert_eq!(shape.len(), 7);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "61");
        assert_eq!(segments[1].text, "421");
        assert_eq!(segments[0].alphabet, Alphabet::Digits);
    }

    #[test]
    fn test_decompose_mixed_case() {
        let (_, segments) = decompose("McGee42");
        // M, c, G, ee, 42
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[3].text, "ee");
        assert_eq!(segments[4].text, "42");
    }

    #[test]
    fn test_recompose_is_inverse() {
        for input in ["+61-421-555-829", "John.Smith@mail.com", "A1-b2", ""] {
            let (shape, segments) = decompose(input);
            assert_eq!(recompose(&shape, &segments).unwrap(), input);
        }
    }

    #[test]
    fn test_recompose_with_replacement() {
        let (shape, _) = decompose("42-ab");
        let replaced = vec![
            Segment {
                alphabet: Alphabet::Digits,
                text: "97".to_string(),
            },
            Segment {
                alphabet: Alphabet::Lower,
                text: "xy".to_string(),
            },
        ];
        assert_eq!(recompose(&shape, &replaced).unwrap(), "97-xy");
    }

    #[test]
    fn test_signature_equality() {
        assert!(same_signature("John", "Kate"));
        assert!(same_signature("+61-421", "+99-887"));
        assert!(!same_signature("John", "john"));
        assert!(!same_signature("John", "Johnny"));
        assert!(!same_signature("a-b", "a.b"));
    }

    #[test]
    fn test_other_codepoints_literal() {
        let (shape, segments) = decompose("(02) 99");
        assert!(segments.iter().all(|s| s.alphabet == Alphabet::Digits));
        assert_eq!(recompose(&shape, &segments).unwrap(), "(02) 99");
    }

    #[test]
    fn test_alphabet_lookup() {
        assert_eq!(Alphabet::Digits.index_of('7'), Some(7));
        assert_eq!(Alphabet::LowerHex.index_of('f'), Some(15));
        assert_eq!(Alphabet::UpperAlnum.index_of('Z'), Some(35));
        assert_eq!(Alphabet::Upper.char_at(0), 'A');
        assert!(Alphabet::Lower.index_of('A').is_none());
    }
}
