//! Wildmat pattern matching for newsgroup name filters.
//!
//! Implements the subset used by LIST and NEWGROUPS arguments per RFC 3977
//! section 4: `*` and `?` wildcards, comma-separated alternatives, and `!`
//! negation where the last matching element decides.

/// Match a single glob element (`*`, `?`, literals) against `text`.
///
/// Iterative matcher with single-star backtracking, which is sufficient for
/// the wildcard set wildmat allows.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            // backtrack: let the star consume one more character
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Match a full wildmat expression against `text`.
///
/// The expression is a comma-separated list of elements; elements prefixed
/// with `!` subtract. The last element that matches determines the result.
#[must_use]
pub fn wildmat(expression: &str, text: &str) -> bool {
    let mut matched = false;
    for element in expression.split(',') {
        let element = element.trim();
        if element.is_empty() {
            continue;
        }
        if let Some(negated) = element.strip_prefix('!') {
            if glob_match(negated, text) {
                matched = false;
            }
        } else if glob_match(element, text) {
            matched = true;
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::wildmat;

    #[test]
    fn literals_and_wildcards() {
        assert!(wildmat("comp.test", "comp.test"));
        assert!(!wildmat("comp.test", "comp.misc"));
        assert!(wildmat("comp.*", "comp.lang.rust"));
        assert!(wildmat("comp.?ang.rust", "comp.lang.rust"));
        assert!(!wildmat("comp.*", "misc.test"));
    }

    #[test]
    fn star_backtracking() {
        assert!(wildmat("*.rust", "comp.lang.rust"));
        assert!(wildmat("a*b*c", "axxbyyc"));
        assert!(!wildmat("a*b*c", "axxbyy"));
        assert!(wildmat("*", "anything.at.all"));
    }

    #[test]
    fn negation_last_match_wins() {
        assert!(wildmat("comp.*,!comp.lang.*", "comp.misc"));
        assert!(!wildmat("comp.*,!comp.lang.*", "comp.lang.rust"));
        assert!(wildmat("comp.*,!comp.lang.*,comp.lang.rust", "comp.lang.rust"));
    }

    #[test]
    fn empty_elements_ignored() {
        assert!(wildmat("comp.*,,", "comp.misc"));
        assert!(!wildmat("", "comp.misc"));
    }
}
