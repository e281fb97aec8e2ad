//! Search text normalization.

use std::fmt::Debug;

/// Turns escaped search text into a regex fragment that tolerates locale-specific
/// letters.
///
/// Input is already regex-escaped; implementations may only add constructs (such as
/// character classes) and must leave escape sequences intact.
pub trait TextNormalizer: Send + Sync + Debug {
    fn searchable(&self, text: &str) -> String;
}

/// Leaves the text unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl TextNormalizer for PlainText {
    fn searchable(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Makes Turkish letters and their plain-Latin counterparts interchangeable.
///
/// Each of `c g i o s u` and `ç ğ ı ö ş ü` becomes a class holding both forms, with
/// case preserved: `cok` matches `çok`, `İstanbul` matches `Istanbul`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TurkishSearchable;

impl TurkishSearchable {
    fn class(ch: char) -> Option<&'static str> {
        Some(match ch {
            'c' | 'ç' => "[cç]",
            'C' | 'Ç' => "[CÇ]",
            'g' | 'ğ' => "[gğ]",
            'G' | 'Ğ' => "[GĞ]",
            'i' | 'ı' => "[iı]",
            'I' | 'İ' => "[Iİ]",
            'o' | 'ö' => "[oö]",
            'O' | 'Ö' => "[OÖ]",
            's' | 'ş' => "[sş]",
            'S' | 'Ş' => "[SŞ]",
            'u' | 'ü' => "[uü]",
            'U' | 'Ü' => "[UÜ]",
            _ => return None,
        })
    }
}

impl TextNormalizer for TurkishSearchable {
    fn searchable(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() * 2);
        for ch in text.chars() {
            match Self::class(ch) {
                Some(class) => out.push_str(class),
                None => out.push(ch),
            }
        }
        out
    }
}

/// Builds the unanchored substring pattern for a raw search value.
pub fn search_pattern(value: &str, normalizer: &dyn TextNormalizer) -> String {
    format!(".*{}.*", normalizer.searchable(&regex::escape(value)))
}
