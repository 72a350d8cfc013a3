//! Automatic heading anchors.

use rustc_hash::FxHashMap;

/// Hands out unique heading ids within one document.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: FxHashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an explicit `{#id}` so generated ids never collide with it.
    pub fn reserve(&mut self, id: &str) {
        self.seen.entry(id.to_string()).or_insert(0);
    }

    /// Unique id for heading `text`: `intro`, `intro-1`, `intro-2`, ...
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut candidate = base.clone();
        loop {
            match self.seen.get_mut(&base) {
                None => break,
                Some(count) => {
                    *count += 1;
                    candidate = format!("{base}-{count}");
                    if !self.seen.contains_key(&candidate) {
                        break;
                    }
                }
            }
        }
        self.seen.insert(candidate.clone(), 0);
        candidate
    }
}

/// Lowercase, keep alphanumerics, turn whitespace and `-` into `-`,
/// drop everything else.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            slug.push('-');
        }
    }

    if slug.is_empty() {
        "heading".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  What's new?  "), "whats-new");
        assert_eq!(slugify("v1.2 - Notes"), "v12---notes");
        assert_eq!(slugify("Über"), "über");
        assert_eq!(slugify("!!!"), "heading");
    }

    #[test]
    fn test_duplicates_get_suffixes() {
        let mut slugger = Slugger::new();
        assert_eq!(slugger.slug("Intro"), "intro");
        assert_eq!(slugger.slug("Intro"), "intro-1");
        assert_eq!(slugger.slug("Intro"), "intro-2");
    }

    #[test]
    fn test_suffix_skips_taken_ids() {
        let mut slugger = Slugger::new();
        assert_eq!(slugger.slug("Intro 1"), "intro-1");
        assert_eq!(slugger.slug("Intro"), "intro");
        assert_eq!(slugger.slug("Intro"), "intro-2");
    }

    #[test]
    fn test_reserved_ids_are_avoided() {
        let mut slugger = Slugger::new();
        slugger.reserve("setup");
        assert_eq!(slugger.slug("Setup"), "setup-1");
    }
}
