//! Slug derivation and validation for post lookups.
//!
//! Titles are transliterated (Chinese through `pinyin`) and then normalised by
//! the `slug` crate, so "基线对齐" becomes `ji-xian-dui-qi`. A caller supplied
//! slug is accepted only when it is already in that canonical form.

use std::future::Future;

use pinyin::ToPinyin;
use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 255;
const MAX_SUFFIX: usize = 33;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("`{input}` has no characters usable in a slug")]
    Unrepresentable { input: String },
    #[error("slug exceeds 255 characters")]
    TooLong,
}

#[derive(Debug, Error)]
pub enum UniqueSlugError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("no free slug between `{base}` and `{base}-33`")]
    Exhausted { base: String },
    #[error(transparent)]
    Lookup(E),
}

/// Derive a canonical slug from human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let slug = slugify(transliterate(input));
    if slug.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(clamp(&slug, MAX_SLUG_LEN).to_string())
}

/// Accept only lowercase ASCII alphanumerics joined by single hyphens.
pub fn validate_slug(value: &str) -> Result<(), SlugError> {
    match value {
        "" => Err(SlugError::EmptyInput),
        v if v.len() > MAX_SLUG_LEN => Err(SlugError::TooLong),
        v if slugify(v) != v => Err(SlugError::Unrepresentable {
            input: v.to_string(),
        }),
        _ => Ok(()),
    }
}

/// First of `base`, `base-2`, `base-3`, ... that `is_taken` reports free.
/// The base is shortened when a suffix would push it past [`MAX_SLUG_LEN`].
pub async fn unique_slug<F, Fut, E>(
    base: &str,
    mut is_taken: F,
) -> Result<String, UniqueSlugError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let candidates = std::iter::once(base.to_string()).chain((2..=MAX_SUFFIX).map(|n| {
        let suffix = format!("-{n}");
        format!("{}{suffix}", clamp(base, MAX_SLUG_LEN - suffix.len()))
    }));

    for candidate in candidates {
        if !is_taken(candidate.clone())
            .await
            .map_err(UniqueSlugError::Lookup)?
        {
            return Ok(candidate);
        }
    }

    Err(UniqueSlugError::Exhausted {
        base: base.to_string(),
    })
}

fn transliterate(input: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut ascii = String::new();

    for ch in input.chars() {
        match ch.to_pinyin() {
            Some(syllable) => {
                if !ascii.is_empty() {
                    words.push(std::mem::take(&mut ascii));
                }
                words.push(syllable.plain().to_string());
            }
            None => ascii.push(ch),
        }
    }
    if !ascii.is_empty() {
        words.push(ascii);
    }

    words.join(" ")
}

/// Cut an ASCII slug to `max` bytes without leaving a trailing hyphen.
fn clamp(slug: &str, max: usize) -> &str {
    if slug.len() <= max {
        return slug;
    }
    slug[..max].trim_end_matches('-')
}
