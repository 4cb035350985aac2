use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

// compressed secp256k1 public key, hex encoded
static PUBKEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0[23][0-9a-f]{64}$").expect("valid pubkey regex"));

static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][\w\-\.#\+]{0,29}$").expect("valid tag regex"));

pub fn is_valid_pubkey(value: &str) -> bool {
    PUBKEY_REGEX.is_match(value)
}

pub fn validate_pubkey(value: &str) -> Result<(), ValidationError> {
    if is_valid_pubkey(&value.to_lowercase()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_pubkey")
            .with_message("Expected a 66 character hex encoded public key".into()))
    }
}

pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    for tag in tags {
        let trimmed = tag.trim();

        if trimmed.is_empty() {
            return Err(
                ValidationError::new("invalid_tags").with_message("Tag cannot be empty".into())
            );
        }

        if !TAG_REGEX.is_match(trimmed) {
            return Err(ValidationError::new("invalid_tags")
                .with_message("Tag contains forbidden symbol".into()));
        }
    }
    Ok(())
}

pub fn trim_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

pub fn lowercase_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(s.trim().to_lowercase())
}

pub fn trim_string_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

/// Trims a present value but keeps it when blank, so length rules still reject it.
pub fn trim_present_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(s.map(|v| v.trim().to_string()))
}

/// Trimmed tags in first-seen order, without duplicates.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut res: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !res.contains(&tag) {
            res.push(tag);
        }
    }
    res
}
