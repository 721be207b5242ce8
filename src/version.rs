use std::cmp::Ordering;
use std::fmt;

/// Version of the running build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dotted-integer version, e.g. `1.5` or `2.0.1`.
///
/// Segments that do not parse as a non-negative integer count as `0`, and
/// missing trailing segments compare as `0`, so `1.5` and `1.5.0` are equal.
#[derive(Debug, Clone)]
pub struct DottedVersion {
    pub original: String,
    pub segments: Vec<u64>,
}

impl DottedVersion {
    pub fn parse(version: &str) -> Self {
        let segments = version
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect();

        DottedVersion {
            original: version.to_string(),
            segments,
        }
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Strip surrounding whitespace and a single leading `v` from a release tag.
pub fn normalize_tag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('v').unwrap_or(tag)
}

/// Check if version `a` is strictly newer than version `b`
pub fn is_newer_version(a: &str, b: &str) -> bool {
    DottedVersion::parse(a) > DottedVersion::parse(b)
}
