use crate::core::{DbError, Result};
use lru::LruCache;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const REGEX_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(200) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

lazy_static::lazy_static! {
    static ref REGEX_LRU_CACHE: Arc<Mutex<LruCache<String, Arc<Regex>>>> =
        Arc::new(Mutex::new(LruCache::new(REGEX_CACHE_CAPACITY)));
}

/// Characters with special meaning inside a LIKE pattern.
const LIKE_METACHARACTERS: [char; 3] = ['%', '_', '\\'];

/// Escape user text so every character matches literally inside a LIKE pattern.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        if LIKE_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// LIKE pattern matching any text that starts with `prefix` taken literally.
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = escape_like(prefix);
    pattern.push('%');
    pattern
}

fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                regex.push_str(&regex::escape(&chars[i].to_string()));
            }
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    regex.push('$');
    regex
}

/// Patterns without escapes that reduce to equality, prefix, suffix or
/// substring checks skip the regex engine.
fn fast_path_like(text: &str, pattern: &str) -> Option<bool> {
    if pattern.contains('\\') || pattern.contains('_') {
        return None;
    }

    if !pattern.contains('%') {
        return Some(text == pattern);
    }

    let wildcards = pattern.matches('%').count();

    if wildcards == 1 && pattern.ends_with('%') {
        return Some(text.starts_with(&pattern[..pattern.len() - 1]));
    }

    if wildcards == 1 && pattern.starts_with('%') {
        return Some(text.ends_with(&pattern[1..]));
    }

    if wildcards == 2 && pattern.len() >= 2 && pattern.starts_with('%') && pattern.ends_with('%') {
        return Some(text.contains(&pattern[1..pattern.len() - 1]));
    }

    None
}

fn get_or_compile_regex(pattern: &str) -> Result<Arc<Regex>> {
    {
        let mut cache = REGEX_LRU_CACHE.lock()?;
        if let Some(regex) = cache.get(pattern) {
            return Ok(Arc::clone(regex));
        }
    }

    let compiled = Regex::new(&like_to_regex(pattern))
        .map_err(|e| DbError::ExecutionError(format!("Invalid LIKE pattern: {}", e)))?;
    let compiled = Arc::new(compiled);

    REGEX_LRU_CACHE.lock()?.put(pattern.to_string(), Arc::clone(&compiled));

    Ok(compiled)
}

/// Lowercases each character on its own, with no context rules, so text and
/// pattern always fold the same way.
fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Evaluate `text LIKE pattern`. `%` matches any run, `_` one character and
/// `\` escapes the next character.
pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    if !case_sensitive {
        return match_folded(&fold_case(text), &fold_case(pattern));
    }
    match_folded(text, pattern)
}

fn match_folded(text: &str, pattern: &str) -> Result<bool> {
    if let Some(result) = fast_path_like(text, pattern) {
        return Ok(result);
    }

    let regex = get_or_compile_regex(pattern)?;
    Ok(regex.is_match(text))
}
