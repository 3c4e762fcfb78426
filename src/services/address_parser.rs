//! Line-oriented address parsing over OCR text
//!
//! Rules, per trimmed non-blank line:
//! - ZIP (`12345` or `12345-6789`) present: record it; all tokens but the
//!   last become the city when the line has more than one token.
//! - Otherwise, a street suffix anywhere in the line (case-insensitive
//!   substring) marks the whole line as the street.
//!
//! Later lines overwrite earlier ones for the same field.

use crate::domain::types::AddressComponents;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ZIP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{5}(-\d{4})?\b").expect("valid ZIP pattern"));

const STREET_SUFFIXES: [&str; 5] = ["st", "ave", "rd", "dr", "blvd"];

fn has_street_suffix(line: &str) -> bool {
    let lower = line.to_lowercase();
    STREET_SUFFIXES.iter().any(|s| lower.contains(s))
}

/// Parse free-form text into street / city / postal code. Coordinates stay unset.
pub fn parse_address(text: &str) -> AddressComponents {
    let mut components = AddressComponents::default();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(zip) = ZIP_PATTERN.find(line) {
            components.postal_code = zip.as_str().to_string();
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() > 1 {
                components.city = tokens[..tokens.len() - 1].join(" ");
            }
        } else if has_street_suffix(line) {
            components.street = line.to_string();
        }
    }

    debug!(
        street = %components.street,
        city = %components.city,
        postal_code = %components.postal_code,
        "address_parsed"
    );
    components
}
