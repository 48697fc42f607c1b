use std::cmp::Ordering;
use std::fmt;

/// A dotted numeric build string such as `10.0.22631.3447`.
///
/// Fields compare numerically from left to right, so `22621.10` ranks above
/// `22621.9`. When one build is a prefix of the other the longer one wins.
/// Equality follows the same rule, so `10.00` and `10.0` are the same build.
#[derive(Debug, Clone)]
pub struct BuildNumber {
    raw: String,
    fields: Vec<u64>,
}

impl BuildNumber {
    /// Returns `None` unless every dot-separated field is a non-negative integer.
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }

        let fields = raw
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            raw: raw.to_string(),
            fields,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for BuildNumber {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for BuildNumber {}

impl Ord for BuildNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fields.cmp(&other.fields)
    }
}

impl PartialOrd for BuildNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> BuildNumber {
        BuildNumber::parse(s).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(b("10.0.19041.1").fields, vec![10, 0, 19041, 1]);
        assert_eq!(b(" 22631.3447 ").as_str(), "22631.3447");
        assert!(BuildNumber::parse("").is_none());
        assert!(BuildNumber::parse("22631.x").is_none());
        assert!(BuildNumber::parse("10..1").is_none());
    }

    #[test]
    fn test_ordering() {
        assert!(b("10.0.19041.2") > b("10.0.19041.1"));
        assert!(b("10.0.19045.1") > b("10.0.19041.2"));
        assert!(b("22621.10") > b("22621.9"));
        assert!(b("22621.1") > b("22621"));
        assert_eq!(b("26100.1").cmp(&b("26100.1")), Ordering::Equal);
    }

    #[test]
    fn test_equality_agrees_with_ordering() {
        assert_eq!(b("10.00"), b("10.0"));
        assert_eq!(b("10.00").cmp(&b("10.0")), Ordering::Equal);
        assert_eq!(b("10.00").as_str(), "10.00");
        assert_ne!(b("10.0"), b("10.0.0"));
    }

    #[test]
    fn test_max_is_transitive_pick() {
        let builds = ["10.0.19041.1", "10.0.19041.2", "10.0.19045.1"];
        let max = builds.iter().map(|s| b(s)).max().unwrap();
        assert_eq!(max.as_str(), "10.0.19045.1");
    }
}
