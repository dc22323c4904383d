//! Wildcard matching for save file names
//!
//! Supports:
//! - `*` - Matches any run of characters, including none (e.g., `SAVE*.DAT`)
//! - `?` - Matches exactly one character (e.g., `SAVE?.DAT`)
//!
//! Everything else is literal. Matching is case-sensitive and covers the
//! whole name.

/// Pattern matcher for file names
pub struct PatternMatcher;

impl PatternMatcher {
    /// Check if a name matches a pattern
    ///
    /// # Examples
    /// ```
    /// use savegame_goggles::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("*", "SAVE1.DAT"));
    /// assert!(PatternMatcher::matches("SAVE?.*", "SAVE1.DAT"));
    /// assert!(!PatternMatcher::matches("*.dat", "SAVE1.DAT"));
    /// ```
    pub fn matches(pattern: &str, name: &str) -> bool {
        // Exact match
        if pattern == name {
            return true;
        }

        if !Self::has_wildcards(pattern) {
            return false;
        }

        let pattern: Vec<char> = pattern.chars().collect();
        let name: Vec<char> = name.chars().collect();

        Self::match_chars(&pattern, &name)
    }

    /// True if the pattern contains `*` or `?`
    pub fn has_wildcards(pattern: &str) -> bool {
        pattern.contains(['*', '?'])
    }

    /// Greedy match with single-star backtracking
    fn match_chars(pattern: &[char], name: &[char]) -> bool {
        let (mut p, mut n) = (0, 0);
        // Position of the last `*` seen, and the name position it was tried at
        let mut star: Option<(usize, usize)> = None;

        while n < name.len() {
            match pattern.get(p) {
                Some('*') => {
                    star = Some((p, n));
                    p += 1;
                }
                Some('?') => {
                    p += 1;
                    n += 1;
                }
                Some(&c) if c == name[n] => {
                    p += 1;
                    n += 1;
                }
                _ => match star {
                    // Let the last star swallow one more character
                    Some((sp, sn)) => {
                        star = Some((sp, sn + 1));
                        p = sp + 1;
                        n = sn + 1;
                    }
                    None => return false,
                },
            }
        }

        // Name exhausted - only trailing stars may remain
        pattern[p..].iter().all(|&c| c == '*')
    }
}
