//! Version parsing, comparison, and range matching.
//!
//! Versions use a structured ordering rather than plain text comparison:
//! - Segments are split on `.` and `-`
//! - Numeric segments compare as numbers
//! - String qualifiers have a defined ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - A shorter segment sequence is padded with zero, so `1.0` equals `1.0.0`

use std::cmp::Ordering;
use std::fmt;

use girder_util::errors::GirderError;

/// A parsed version with comparable segments.
///
/// The original text is retained for display; two versions that compare
/// equal may still carry distinct literals (`2.0` vs `2.0.0`).
#[derive(Debug, Clone)]
pub struct ExactVersion {
    pub original: String,
    segments: Vec<Segment>,
}

impl PartialEq for ExactVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ExactVersion {}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl ExactVersion {
    pub fn parse(version: &str) -> Self {
        let segments = parse_segments(version);
        Self {
            original: version.to_string(),
            segments,
        }
    }

    /// Leading numeric blocks, used by `X.Y.+` prefix matching.
    fn numeric_prefix(&self) -> Vec<u64> {
        self.segments
            .iter()
            .map_while(|s| match s {
                Segment::Numeric(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ExactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for ExactVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let a = self.segments.get(i);
            let b = other.segments.get(i);
            let ord = compare_segments(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ExactVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(s) if s.is_empty() => Ordering::Equal,
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Qualifier(_)) => Ordering::Greater,
        (Segment::Qualifier(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for ch in version.chars() {
        if ch == '.' || ch == '-' {
            if !current.is_empty() {
                segments.push(classify(&current));
                current.clear();
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        segments.push(classify(&current));
    }

    segments
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "" | "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// A version requirement: an exact version, a `X.Y.+` prefix shorthand,
/// or a bracketed interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionReq {
    Exact(ExactVersion),
    /// `1.2.+` — any version whose leading numeric blocks equal the prefix.
    Prefix(Vec<u64>),
    /// `[a,b]` / `[a,b)` / `(a,b]` / `(a,b)`, either bound optional.
    Interval {
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: ExactVersion,
    pub inclusive: bool,
}

impl VersionReq {
    /// Parse a version requirement string.
    ///
    /// Bare text is an exact version; `1.2.+` is a prefix range; text in
    /// `[`/`(` brackets is an interval.
    pub fn parse(spec: &str) -> Result<Self, GirderError> {
        let s = spec.trim();
        if s.is_empty() {
            return Err(GirderError::Coordinate {
                message: "empty version text".to_string(),
            });
        }

        if let Some(prefix) = s.strip_suffix(".+") {
            let blocks: Result<Vec<u64>, _> =
                prefix.split('.').map(|b| b.parse::<u64>()).collect();
            return match blocks {
                Ok(blocks) if !blocks.is_empty() => Ok(VersionReq::Prefix(blocks)),
                _ => Err(GirderError::Coordinate {
                    message: format!("invalid prefix range `{s}`: expected numeric blocks before `.+`"),
                }),
            };
        }

        if s.starts_with('[') || s.starts_with('(') {
            return parse_interval(s);
        }

        Ok(VersionReq::Exact(ExactVersion::parse(s)))
    }

    /// Whether a version satisfies this requirement.
    pub fn matches(&self, version: &ExactVersion) -> bool {
        match self {
            VersionReq::Exact(v) => v == version,
            VersionReq::Prefix(blocks) => {
                let head = version.numeric_prefix();
                head.len() >= blocks.len() && head[..blocks.len()] == blocks[..]
            }
            VersionReq::Interval { lower, upper } => {
                if let Some(lower) = lower {
                    let cmp = version.cmp(&lower.version);
                    if lower.inclusive {
                        if cmp == Ordering::Less {
                            return false;
                        }
                    } else if cmp != Ordering::Greater {
                        return false;
                    }
                }
                if let Some(upper) = upper {
                    let cmp = version.cmp(&upper.version);
                    if upper.inclusive {
                        if cmp == Ordering::Greater {
                            return false;
                        }
                    } else if cmp != Ordering::Less {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Select the highest candidate satisfying this requirement.
    ///
    /// Candidates may arrive in any order; selection sorts a local copy
    /// descending so the result is deterministic. Failure names the
    /// requirement and the nearest candidates considered.
    pub fn resolve(
        &self,
        module: &str,
        candidates: &[ExactVersion],
    ) -> Result<ExactVersion, GirderError> {
        let mut sorted: Vec<&ExactVersion> = candidates.iter().collect();
        sorted.sort_by(|a, b| b.cmp(a));

        for candidate in &sorted {
            if self.matches(candidate) {
                return Ok((*candidate).clone());
            }
        }

        let nearest: Vec<String> = sorted
            .iter()
            .take(5)
            .map(|v| v.original.clone())
            .collect();
        Err(GirderError::NoMatchingVersion {
            module: module.to_string(),
            range: self.to_string(),
            candidates: if nearest.is_empty() {
                "none".to_string()
            } else {
                nearest.join(", ")
            },
        })
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionReq::Exact(v) => f.write_str(&v.original),
            VersionReq::Prefix(blocks) => {
                let head: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
                write!(f, "{}.+", head.join("."))
            }
            VersionReq::Interval { lower, upper } => {
                let open = match lower {
                    Some(b) if b.inclusive => '[',
                    _ => '(',
                };
                let close = match upper {
                    Some(b) if b.inclusive => ']',
                    _ => ')',
                };
                write!(
                    f,
                    "{open}{},{}{close}",
                    lower.as_ref().map(|b| b.version.original.as_str()).unwrap_or(""),
                    upper.as_ref().map(|b| b.version.original.as_str()).unwrap_or(""),
                )
            }
        }
    }
}

fn parse_interval(s: &str) -> Result<VersionReq, GirderError> {
    let open_inclusive = s.starts_with('[');
    let close_inclusive = s.ends_with(']');
    if !s.ends_with(']') && !s.ends_with(')') {
        return Err(GirderError::Coordinate {
            message: format!("unterminated version range `{s}`"),
        });
    }
    let inner = &s[1..s.len() - 1];

    let Some((lower, upper)) = inner.split_once(',') else {
        // Exact pin: [1.0] means exactly 1.0
        if !open_inclusive || !close_inclusive || inner.trim().is_empty() {
            return Err(GirderError::Coordinate {
                message: format!("invalid version range `{s}`"),
            });
        }
        let v = ExactVersion::parse(inner.trim());
        return Ok(VersionReq::Interval {
            lower: Some(Bound {
                version: v.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version: v,
                inclusive: true,
            }),
        });
    };

    let lower = lower.trim();
    let upper = upper.trim();
    if lower.is_empty() && upper.is_empty() {
        return Err(GirderError::Coordinate {
            message: format!("version range `{s}` has no bounds"),
        });
    }
    Ok(VersionReq::Interval {
        lower: if lower.is_empty() {
            None
        } else {
            Some(Bound {
                version: ExactVersion::parse(lower),
                inclusive: open_inclusive,
            })
        },
        upper: if upper.is_empty() {
            None
        } else {
            Some(Bound {
                version: ExactVersion::parse(upper),
                inclusive: close_inclusive,
            })
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ExactVersion {
        ExactVersion::parse(s)
    }

    #[test]
    fn basic_ordering() {
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.9.9") < v("2.0.0"));
    }

    #[test]
    fn qualifier_ordering() {
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("1.0-beta") < v("1.0-rc"));
        assert!(v("1.0-rc") < v("1.0"));
        assert!(v("1.0") < v("1.0-sp"));
    }

    #[test]
    fn qualifier_before_release() {
        assert!(v("1.0.0-beta") < v("1.0.0"));
    }

    #[test]
    fn trailing_zeros_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("2.0"), v("2.0.0"));
    }

    #[test]
    fn numeric_vs_text() {
        // Numeric 0 > text qualifier
        assert!(v("1.0.0") > v("1.0.0-jre"));
    }

    #[test]
    fn prefix_range_parse_and_match() {
        let req = VersionReq::parse("1.2.+").unwrap();
        assert!(req.matches(&v("1.2.0")));
        assert!(req.matches(&v("1.2.5")));
        assert!(!req.matches(&v("1.3.0")));
        assert!(!req.matches(&v("2.2.0")));
    }

    #[test]
    fn prefix_range_resolves_maximum() {
        let req = VersionReq::parse("1.2.+").unwrap();
        let candidates = [v("1.0.0"), v("1.2.0"), v("1.2.5"), v("2.0.0")];
        let picked = req.resolve("org.example:lib", &candidates).unwrap();
        assert_eq!(picked.original, "1.2.5");
    }

    #[test]
    fn prefix_range_requires_numeric_blocks() {
        assert!(VersionReq::parse("a.b.+").is_err());
        assert!(VersionReq::parse(".+").is_err());
    }

    #[test]
    fn interval_inclusive() {
        let req = VersionReq::parse("[1.0,2.0]").unwrap();
        assert!(req.matches(&v("1.0")));
        assert!(req.matches(&v("1.5")));
        assert!(req.matches(&v("2.0")));
        assert!(!req.matches(&v("0.9")));
        assert!(!req.matches(&v("2.1")));
    }

    #[test]
    fn interval_exclusive_upper() {
        let req = VersionReq::parse("[1.0,2.0)").unwrap();
        assert!(req.matches(&v("1.0")));
        assert!(req.matches(&v("1.9.9")));
        assert!(!req.matches(&v("2.0")));
    }

    #[test]
    fn interval_exclusive_lower() {
        let req = VersionReq::parse("(1.0,2.0]").unwrap();
        assert!(!req.matches(&v("1.0")));
        assert!(req.matches(&v("2.0")));
    }

    #[test]
    fn interval_open_lower() {
        let req = VersionReq::parse("(,2.0)").unwrap();
        assert!(req.matches(&v("1.0")));
        assert!(!req.matches(&v("2.0")));
    }

    #[test]
    fn interval_exact_pin() {
        let req = VersionReq::parse("[1.5]").unwrap();
        assert!(req.matches(&v("1.5")));
        assert!(!req.matches(&v("1.4")));
        assert!(!req.matches(&v("1.6")));
    }

    #[test]
    fn unterminated_range_rejected() {
        assert!(VersionReq::parse("[1.0,2.0").is_err());
    }

    #[test]
    fn bare_version_is_exact() {
        let req = VersionReq::parse("1.0").unwrap();
        assert_eq!(req, VersionReq::Exact(v("1.0")));
    }

    #[test]
    fn no_matching_version_names_range_and_candidates() {
        let req = VersionReq::parse("3.+").unwrap();
        let candidates = [v("1.0.0"), v("2.0.0")];
        let err = req.resolve("org.example:lib", &candidates).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("3.+"));
        assert!(msg.contains("2.0.0"));
        assert!(msg.contains("org.example:lib"));
    }

    #[test]
    fn resolve_unordered_candidates_still_picks_highest() {
        let req = VersionReq::parse("[1.0,)").unwrap();
        let candidates = [v("1.2.0"), v("2.0.0"), v("1.0.0")];
        let picked = req.resolve("org.example:lib", &candidates).unwrap();
        assert_eq!(picked.original, "2.0.0");
    }

    #[test]
    fn display_roundtrip() {
        for s in ["1.2.+", "[1.0,2.0)", "(,2.0]", "1.8.0"] {
            assert_eq!(VersionReq::parse(s).unwrap().to_string(), s);
        }
    }
}
