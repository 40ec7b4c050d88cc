//! Field name sanitization for MongoDB compatibility.
//!
//! MongoDB reserves dots and dollar signs in field names for query syntax. Keys are
//! escaped on the way in and restored on the way out; values are stored untouched so
//! filters compare against exactly what the caller wrote.

use bson::{Bson, Document};

pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Recursively escapes the keys of every nested document.
    pub(crate) fn sanitize_value(value: &Bson) -> Bson {
        Self::map_keys(value, &Self::sanitize_string)
    }

    /// Inverse of [`sanitize_value`](Self::sanitize_value).
    pub(crate) fn restore_value(value: &Bson) -> Bson {
        Self::map_keys(value, &Self::restore_string)
    }

    pub(crate) fn sanitize_string(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    pub(crate) fn restore_string(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }

    fn map_keys(value: &Bson, rename: &dyn Fn(&str) -> String) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr
                    .iter()
                    .map(|item| Self::map_keys(item, rename))
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(
                doc.iter()
                    .map(|(k, v)| (rename(k), Self::map_keys(v, rename)))
                    .collect::<Document>(),
            ),
            _ => value.clone(),
        }
    }
}
