//! Pattern-based filename generation
//!
//! Renders a template such as `photo_{index:3}` for every file of an ordered
//! selection. Supported tokens:
//!
//! | Token       | Replaced with                                              |
//! |-------------|------------------------------------------------------------|
//! | `{name}`    | original name without its extension                        |
//! | `{ext}`     | original extension without the dot (empty if none)         |
//! | `{index}`   | running number, zero-padded to the length of `start_number`|
//! | `{index:N}` | running number, zero-padded to `N` digits                  |
//! | `{date}`    | render date as `YYYY-MM-DD` (UTC)                          |
//!
//! Anything else, including malformed tokens, is copied through literally.
//! Rendering never fails.

use crate::types::{NumberingOptions, RenamedEntry, SourceFile};
use chrono::{NaiveDate, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Widest `{index:N}` honoured; wider tokens stay literal
pub const MAX_PAD_WIDTH: usize = 255;

#[allow(clippy::expect_used)]
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(?:(name)|(ext)|(date)|index(?::(\d+))?)\}").expect("token regex is valid")
});

/// Render new names for `files` using today's date
///
/// The result has one entry per file, in input order. An empty `pattern` maps
/// every name to itself.
///
/// # Examples
///
/// ```
/// use batch_rename::{MemoryFile, NumberingOptions, render};
///
/// let files = vec![
///     MemoryFile::new("IMG_1.png", vec![0u8; 4]),
///     MemoryFile::new("IMG_2.png", vec![0u8; 4]),
/// ];
/// let options = NumberingOptions {
///     start_number: "01".into(),
///     gap: 1,
///     keep_extension: true,
/// };
/// let renamed = render(&files, "photo_{index}", &options);
/// assert_eq!(renamed[0].renamed, "photo_01.png");
/// assert_eq!(renamed[1].renamed, "photo_02.png");
/// ```
pub fn render<F: SourceFile>(
    files: &[F],
    pattern: &str,
    options: &NumberingOptions,
) -> Vec<RenamedEntry> {
    render_with_date(files, pattern, options, Utc::now().date_naive())
}

/// Render new names for `files` with an explicit `{date}` value
pub fn render_with_date<F: SourceFile>(
    files: &[F],
    pattern: &str,
    options: &NumberingOptions,
    date: NaiveDate,
) -> Vec<RenamedEntry> {
    let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
    render_names(&names, pattern, options, date)
}

/// Render new names for plain file names
pub fn render_names<S: AsRef<str>>(
    names: &[S],
    pattern: &str,
    options: &NumberingOptions,
    date: NaiveDate,
) -> Vec<RenamedEntry> {
    if pattern.is_empty() {
        return names
            .iter()
            .map(|n| RenamedEntry {
                original: n.as_ref().to_string(),
                renamed: n.as_ref().to_string(),
            })
            .collect();
    }

    let today = date.format("%Y-%m-%d").to_string();
    let start = parse_leading_int(&options.start_number);
    let default_width = options.start_number.chars().count();
    let gap = i64::try_from(options.gap.max(1)).unwrap_or(i64::MAX);

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.as_ref();
            let (stem, extension) = split_extension(name);
            let step = i64::try_from(i).unwrap_or(i64::MAX).saturating_mul(gap);
            let current = start.saturating_add(step);

            let mut renamed = TOKEN_RE
                .replace_all(pattern, |caps: &Captures| {
                    if caps.get(1).is_some() {
                        stem.to_string()
                    } else if caps.get(2).is_some() {
                        extension.to_string()
                    } else if caps.get(3).is_some() {
                        today.clone()
                    } else if let Some(width) = caps.get(4) {
                        match width.as_str().parse::<usize>() {
                            Ok(w) if w <= MAX_PAD_WIDTH => pad_number(current, w),
                            _ => caps[0].to_string(),
                        }
                    } else {
                        pad_number(current, default_width)
                    }
                })
                .into_owned();

            if options.keep_extension && !extension.is_empty() {
                renamed.push('.');
                renamed.push_str(extension);
            }

            RenamedEntry {
                original: name.to_string(),
                renamed,
            }
        })
        .collect()
}

/// Split a file name on its last dot into `(stem, extension)`
///
/// A name without a dot has an empty extension.
///
/// # Examples
///
/// ```
/// use batch_rename::renamer::split_extension;
///
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", "gz"));
/// assert_eq!(split_extension("README"), ("README", ""));
/// ```
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, extension)) => (stem, extension),
        None => (name, ""),
    }
}

/// Left-pad the decimal form of `n` with zeros to at least `width` characters
fn pad_number(n: i64, width: usize) -> String {
    format!("{:0>width$}", n.to_string(), width = width)
}

/// Lenient integer parse: optional leading whitespace and sign, then leading digits
///
/// Returns 0 when no digits are found. Values out of range saturate.
fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if !seen {
        0
    } else if negative {
        -value
    } else {
        value
    }
}
