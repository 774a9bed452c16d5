//! Casing of serialized field names.
//!
//! Rust fields are `snake_case`; stored documents use `PascalCase` field
//! names. Both directions are needed: serialization Pascal-cases declared
//! field names, and the query builder re-cases caller-supplied names the
//! same way before they are placed into a pipeline.

/// `record_id` → `RecordId`.
pub fn to_pascal_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for segment in name.split('_') {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

/// `RecordId` → `record_id`.
pub fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    result
}
