//! Utility functions for entry-name sanitization and collision handling

use crate::config::NameCollisionAction;
use crate::error::{Error, Result};
use crate::renamer::split_extension;
use std::collections::HashSet;
use tracing::warn;

/// Maximum number of suffixes tried when resolving a name collision
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Characters rejected by common filesystems
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a name safe to write into an archive
///
/// Replaces `< > : " / \ | ? *` and control characters (0–31) with `_`, and a
/// leading run of dots with a single `_`. An empty result becomes `_`.
///
/// # Examples
///
/// ```
/// use batch_rename::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("a/b:c*.txt"), "a_b_c_.txt");
/// assert_eq!(sanitize_file_name("...hidden"), "_hidden");
/// assert_eq!(sanitize_file_name("photo_01.png"), "photo_01.png");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || (c as u32) < 32 {
                '_'
            } else {
                c
            }
        })
        .collect();

    let without_dots = replaced.trim_start_matches('.');
    let sanitized = if without_dots.len() != replaced.len() {
        format!("_{}", without_dots)
    } else {
        replaced
    };

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Sanitize every name and resolve duplicates according to `action`
///
/// Names are compared case-insensitively, since archives are often extracted onto
/// case-insensitive filesystems. With [`NameCollisionAction::Rename`], the first
/// occurrence keeps its name and later ones become `stem (1).ext`, `stem (2).ext`, …
/// The output has the same length and order as the input.
pub fn resolve_entry_names<S: AsRef<str>>(
    names: &[S],
    action: NameCollisionAction,
) -> Result<Vec<String>> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut resolved = Vec::with_capacity(names.len());

    for name in names {
        let sanitized = sanitize_file_name(name.as_ref());
        if taken.insert(sanitized.to_lowercase()) {
            resolved.push(sanitized);
            continue;
        }

        match action {
            NameCollisionAction::Fail => {
                return Err(Error::NameCollision { name: sanitized });
            }
            NameCollisionAction::Rename => {
                let unique = next_free_name(&sanitized, &taken)?;
                warn!(
                    name = %sanitized,
                    renamed_to = %unique,
                    "duplicate entry name, adding suffix"
                );
                taken.insert(unique.to_lowercase());
                resolved.push(unique);
            }
        }
    }

    Ok(resolved)
}

fn next_free_name(name: &str, taken: &HashSet<String>) -> Result<String> {
    let (stem, extension) = split_extension(name);
    for i in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = if extension.is_empty() {
            format!("{} ({})", stem, i)
        } else {
            format!("{} ({}).{}", stem, i, extension)
        };
        if !taken.contains(&candidate.to_lowercase()) {
            return Ok(candidate);
        }
    }

    Err(Error::NameCollision {
        name: name.to_string(),
    })
}
