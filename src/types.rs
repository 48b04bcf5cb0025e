use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Qualitative valence of an annotated genotype
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
pub enum Repute {
    Good,
    Bad,
    #[default]
    Neutral,
}

impl Repute {
    /// Anything other than "Good" or "Bad" (including an empty label) is neutral.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("good") {
            Repute::Good
        } else if label.eq_ignore_ascii_case("bad") {
            Repute::Bad
        } else {
            Repute::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Repute::Good => "Good",
            Repute::Bad => "Bad",
            Repute::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Repute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Repute {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label: Option<String> = Option::deserialize(deserializer)?;
        Ok(label.map(|l| Repute::from_label(&l)).unwrap_or_default())
    }
}

/// Annotation attached to one genotype of one rsid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub gene: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub magnitude: f64,
    #[serde(default)]
    pub repute: Repute,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Unordered genotype call, normalized so that "AG" and "GA" share one key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalAllelePair {
    first: String,
    second: String,
}

impl CanonicalAllelePair {
    /// Trims and uppercases both calls, then orders them. Returns `None` when
    /// either call is empty after trimming.
    pub fn new(allele1: &str, allele2: &str) -> Option<Self> {
        let a = allele1.trim().to_uppercase();
        let b = allele2.trim().to_uppercase();
        if a.is_empty() || b.is_empty() {
            return None;
        }

        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Some(Self { first, second })
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

impl fmt::Display for CanonicalAllelePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.first, self.second)
    }
}

/// A genotype observation that hit an annotated reference entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// `rsid(allele1;allele2)` using the canonical pair
    pub key: String,
    pub gene: String,
    pub summary: String,
    pub magnitude: f64,
    pub repute: Repute,
}

impl Match {
    pub fn new(rsid: &str, pair: &CanonicalAllelePair, entry: &ReferenceEntry) -> Self {
        Self {
            key: format!("{}({})", rsid, pair),
            gene: entry.gene.clone(),
            summary: entry.summary.clone(),
            magnitude: entry.magnitude,
            repute: entry.repute,
        }
    }

    /// The rsid portion of the key
    pub fn rsid(&self) -> &str {
        self.key.split('(').next().unwrap_or(&self.key)
    }
}

/// Which reputes are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputeSet {
    pub good: bool,
    pub bad: bool,
    pub neutral: bool,
}

impl Default for ReputeSet {
    fn default() -> Self {
        Self::all()
    }
}

impl ReputeSet {
    pub fn all() -> Self {
        Self {
            good: true,
            bad: true,
            neutral: true,
        }
    }

    pub fn none() -> Self {
        Self {
            good: false,
            bad: false,
            neutral: false,
        }
    }

    pub fn from_reputes(reputes: &[Repute]) -> Self {
        let mut set = Self::none();
        for repute in reputes {
            set.insert(*repute);
        }
        set
    }

    pub fn insert(&mut self, repute: Repute) {
        match repute {
            Repute::Good => self.good = true,
            Repute::Bad => self.bad = true,
            Repute::Neutral => self.neutral = true,
        }
    }

    pub fn contains(&self, repute: Repute) -> bool {
        match repute {
            Repute::Good => self.good,
            Repute::Bad => self.bad,
            Repute::Neutral => self.neutral,
        }
    }
}

/// Criteria for the visible subset of matches
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub reputes: ReputeSet,
    pub min_magnitude: f64,
    /// Case-insensitive substring matched against rsid, gene and summary
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_order_independent() {
        let ag = CanonicalAllelePair::new("a", "g").unwrap();
        let ga = CanonicalAllelePair::new(" G", "A\r").unwrap();
        assert_eq!(ag, ga);
        assert_eq!(ag.first(), "A");
        assert_eq!(ag.second(), "G");
        assert_eq!(ag.to_string(), "A;G");
    }

    #[test]
    fn test_pair_rejects_blank_calls() {
        assert!(CanonicalAllelePair::new("", "G").is_none());
        assert!(CanonicalAllelePair::new("A", "  ").is_none());
    }

    #[test]
    fn test_reference_entry_tolerates_nulls() {
        let entry: ReferenceEntry = serde_json::from_str(
            r#"{"gene": null, "summary": "s", "magnitude": null, "repute": null}"#,
        )
        .unwrap();
        assert_eq!(entry.gene, "");
        assert_eq!(entry.magnitude, 0.0);
        assert_eq!(entry.repute, Repute::Neutral);

        let entry: ReferenceEntry =
            serde_json::from_str(r#"{"summary": "s", "magnitude": 2.5, "repute": "Bad"}"#)
                .unwrap();
        assert_eq!(entry.repute, Repute::Bad);
        assert_eq!(entry.magnitude, 2.5);
    }

    #[test]
    fn test_repute_labels() {
        assert_eq!(Repute::from_label("Good"), Repute::Good);
        assert_eq!(Repute::from_label("bad"), Repute::Bad);
        assert_eq!(Repute::from_label(""), Repute::Neutral);
        assert_eq!(Repute::from_label("Mixed"), Repute::Neutral);
    }

    #[test]
    fn test_match_key_and_rsid() {
        let pair = CanonicalAllelePair::new("T", "C").unwrap();
        let entry = ReferenceEntry {
            gene: "MTHFR".to_string(),
            summary: "reduced activity".to_string(),
            magnitude: 1.5,
            repute: Repute::Bad,
        };
        let m = Match::new("rs1801133", &pair, &entry);
        assert_eq!(m.key, "rs1801133(C;T)");
        assert_eq!(m.rsid(), "rs1801133");
    }

    #[test]
    fn test_repute_set() {
        let set = ReputeSet::from_reputes(&[Repute::Good, Repute::Bad]);
        assert!(set.contains(Repute::Good));
        assert!(set.contains(Repute::Bad));
        assert!(!set.contains(Repute::Neutral));
        assert!(ReputeSet::default().contains(Repute::Neutral));
    }
}
