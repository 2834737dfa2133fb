//! Version comparison for the in-memory backend.
//!
//! A reduced rendition of rpm's evr ordering: optional numeric epoch before
//! `:`, version and release separated by the last `-`, segments compared
//! numerically when both are numeric and lexically otherwise.

use std::cmp::Ordering;

fn split_evr(evr: &str) -> (u64, &str, Option<&str>) {
    let (epoch, rest) = match evr.split_once(':') {
        Some((e, rest)) => (e.parse().unwrap_or(0), rest),
        None => (0, evr),
    };
    match rest.rsplit_once('-') {
        Some((version, release)) => (epoch, version, Some(release)),
        None => (epoch, rest, None),
    }
}

fn segments(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let trimmed = rest.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
        if trimmed.is_empty() {
            break;
        }
        let end = if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            trimmed
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(trimmed.len())
        } else {
            trimmed
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(trimmed.len())
        };
        out.push(&trimmed[..end]);
        rest = &trimmed[end..];
    }
    out
}

fn vercmp(a: &str, b: &str) -> Ordering {
    let sa = segments(a);
    let sb = segments(b);
    for (x, y) in sa.iter().zip(sb.iter()) {
        let xn = x.parse::<u64>();
        let yn = y.parse::<u64>();
        let ord = match (xn, yn) {
            (Ok(xn), Ok(yn)) => xn.cmp(&yn),
            // numeric segments sort above alphabetic ones
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len())
}

/// Total order over full evr strings.
pub(super) fn compare(a: &str, b: &str) -> Ordering {
    let (ea, va, ra) = split_evr(a);
    let (eb, vb, rb) = split_evr(b);
    ea.cmp(&eb)
        .then_with(|| vercmp(va, vb))
        .then_with(|| match (ra, rb) {
            (Some(ra), Some(rb)) => vercmp(ra, rb),
            _ => Ordering::Equal,
        })
}

/// Whether `candidate` satisfies the relation `<flags> wanted`. A `wanted`
/// without a release part is compared version-only, matching how the solver
/// treats incomplete evr specifications.
pub(super) fn satisfies(candidate: &str, wanted: &str, flags: u32) -> bool {
    use crate::flags::{REL_EQ, REL_GT, REL_LT};

    let candidate = if wanted.contains('-') {
        candidate.to_string()
    } else {
        let (epoch, version, _) = split_evr(candidate);
        if epoch != 0 {
            format!("{epoch}:{version}")
        } else {
            version.to_string()
        }
    };
    match compare(&candidate, wanted) {
        Ordering::Less => flags & REL_LT != 0,
        Ordering::Equal => flags & REL_EQ != 0,
        Ordering::Greater => flags & REL_GT != 0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flags::{REL_EQ, REL_GT, REL_LT};

    #[test]
    fn test_ordering() {
        assert_eq!(compare("1.0-1", "1.0-1"), Ordering::Equal);
        assert_eq!(compare("1.0-1", "1.0-2"), Ordering::Less);
        assert_eq!(compare("1.10-1", "1.9-1"), Ordering::Greater);
        assert_eq!(compare("2:1.0-1", "1:9.9-9"), Ordering::Greater);
        assert_eq!(compare("1.0a-1", "1.0-1"), Ordering::Greater);
    }

    #[test]
    fn test_satisfies_version_only() {
        assert!(satisfies("1.0-3", "1.0", REL_EQ));
        assert!(satisfies("1.2-1", "1.0", REL_GT));
        assert!(!satisfies("1.2-1", "1.2", REL_LT));
    }

    #[test]
    fn test_satisfies_full_evr() {
        assert!(satisfies("1.0-1", "1.0-1", REL_EQ));
        assert!(!satisfies("1.0-2", "1.0-1", REL_EQ));
        assert!(satisfies("1.0-2", "1.0-1", REL_GT | REL_EQ));
    }
}
