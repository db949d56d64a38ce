//! Slug normalisation and content formatting.
//!
//! Slugs are lowercased, accent-stripped, with non-alphanumeric runs
//! collapsed to single hyphens and leading/trailing hyphens trimmed. Content
//! that carries no markup of its own is wrapped in paragraph tags.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

static MARKUP_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"<[^>]+>").expect("invalid markup regex"));

static PARAGRAPH_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\n{2,}").expect("invalid paragraph regex"));

/// Normalise `input` into a URL slug, falling back to `fallback` (usually
/// the post title) when `input` is blank. When neither yields any slug
/// characters, a generated `post-<uuid>` identifier is returned so the slug
/// is never empty.
pub fn normalize(input: &str, fallback: &str) -> String {
  let source = if input.trim().is_empty() { fallback } else { input };

  let mut slug = String::with_capacity(source.len());
  for ch in source.trim().chars().flat_map(char::to_lowercase) {
    if ch.is_ascii_alphanumeric() {
      slug.push(ch);
    } else if let Some(folded) = fold_accent(ch) {
      slug.push_str(folded);
    } else if !slug.is_empty() && !slug.ends_with('-') {
      slug.push('-');
    }
  }
  while slug.ends_with('-') {
    slug.pop();
  }

  if slug.is_empty() {
    format!("post-{}", Uuid::new_v4())
  } else {
    slug
  }
}

/// ASCII folding for the Latin letters that commonly appear in titles.
/// Input is already lowercased, so only lowercase forms are mapped.
fn fold_accent(ch: char) -> Option<&'static str> {
  Some(match ch {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
    'ç' | 'ć' | 'č' => "c",
    'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' => "e",
    'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
    'ñ' | 'ń' => "n",
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
    'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
    'ý' | 'ÿ' => "y",
    'š' | 'ś' => "s",
    'ž' | 'ź' | 'ż' => "z",
    'ł' => "l",
    'đ' => "d",
    'ß' => "ss",
    'æ' => "ae",
    'œ' => "oe",
    _ => return None,
  })
}

/// Prepare post content for storage.
///
/// Content that already contains markup is stored as-is. Plain text is
/// split into paragraphs on blank lines, with single newlines becoming
/// `<br />` inside a paragraph.
pub fn format_content(raw: &str) -> String {
  let base = raw.trim();
  if base.is_empty() {
    return String::new();
  }
  if MARKUP_RE.is_match(base) {
    return base.to_string();
  }

  PARAGRAPH_RE
    .split(base)
    .filter(|paragraph| !paragraph.trim().is_empty())
    .map(|paragraph| {
      format!("<p>{}</p>", paragraph.trim().replace('\n', "<br />"))
    })
    .collect()
}
