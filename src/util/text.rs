use regex::Regex;
use strsim::normalized_levenshtein;

const SUGGEST_MIN_SCORE: f64 = 0.6;

pub fn normalize_token(value: &str) -> String {
  value
    .to_lowercase()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<&str>>()
    .join("_")
}

/// Closest candidate to `value` by normalized Levenshtein distance over
/// normalized tokens, if any scores high enough to be worth suggesting.
pub fn closest_match<'a, I>(value: &str, candidates: I) -> Option<String>
where
  I: IntoIterator<Item = &'a str>,
{
  let needle = normalize_token(value);
  if needle.is_empty() {
    return None;
  }
  let mut best: Option<(&str, f64)> = None;
  for candidate in candidates {
    let score = normalized_levenshtein(&needle, &normalize_token(candidate));
    if score >= SUGGEST_MIN_SCORE && best.map_or(true, |(_, s)| score > s) {
      best = Some((candidate, score));
    }
  }
  best.map(|(c, _)| c.to_string())
}

pub fn clean_label(text: &str) -> String {
  let compact = text.split_whitespace().collect::<Vec<&str>>().join(" ");
  if compact.chars().count() > 200 {
    let head = compact.chars().take(197).collect::<String>();
    format!("{head}...")
  } else {
    compact
  }
}

pub fn is_valid_email(value: &str) -> bool {
  let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex");
  re.is_match(value.trim())
}
