//! Version strings and constraint evaluation
//!
//! Versions follow PEP 440 ordering: `1.0.dev0 < 1.0a1 < 1.0rc1 < 1.0 <
//! 1.0.post1`. Missing trailing release segments count as zero
//! (`1.2 == 1.2.0`) and local labels (`+cpu`) are ignored.

use std::cmp::Ordering;
use std::fmt;

/// Pre-release phase, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Alpha,
    Beta,
    Candidate,
}

impl Phase {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "a" | "alpha" => Some(Self::Alpha),
            "b" | "beta" => Some(Self::Beta),
            "c" | "rc" | "pre" | "preview" => Some(Self::Candidate),
            _ => None,
        }
    }
}

/// A parsed package version
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(Phase, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    /// Unrecognised trailing text, compared last
    rest: String,
}

impl Version {
    /// Parse a version string; never fails, unknown trailing text compares textually
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let without_prefix = lowered.strip_prefix('v').unwrap_or(&lowered);
        // local version labels (`+cpu`) do not take part in comparison
        let public = without_prefix.split('+').next().unwrap_or_default();

        let (epoch, public) = match public.split_once('!') {
            Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|b| b.is_ascii_digit()) => {
                (epoch.parse().unwrap_or(0), rest)
            }
            _ => (0, public),
        };

        let mut version = Self {
            raw: trimmed.to_string(),
            epoch,
            release: Vec::new(),
            pre: None,
            post: None,
            dev: None,
            rest: String::new(),
        };

        let mut tail = public;
        loop {
            let (number, after) = take_number(tail);
            match number {
                Some(n) => version.release.push(n),
                None => break,
            }
            match after.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => tail = next,
                _ => {
                    tail = after;
                    break;
                }
            }
        }

        version.rest = version.parse_qualifiers(tail).to_string();
        version
    }

    /// Consume pre/post/dev qualifiers, returning whatever is not understood
    fn parse_qualifiers<'a>(&mut self, mut tail: &'a str) -> &'a str {
        while !tail.is_empty() {
            let body = tail.trim_start_matches(['.', '-', '_']);
            let label_len = body.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(body.len());
            let (label, after) = body.split_at(label_len);
            let (number, after) = take_number(after.trim_start_matches(['.', '-', '_']));

            // `1.0-1` is an implicit post-release
            if label.is_empty() && tail.starts_with('-') && number.is_some() && self.post.is_none() {
                self.post = number;
            } else if let Some(phase) = Phase::from_label(label).filter(|_| self.pre.is_none()) {
                self.pre = Some((phase, number.unwrap_or(0)));
            } else if matches!(label, "post" | "rev" | "r") && self.post.is_none() {
                self.post = Some(number.unwrap_or(0));
            } else if label == "dev" && self.dev.is_none() {
                self.dev = Some(number.unwrap_or(0));
            } else {
                return tail;
            }
            tail = after;
        }
        tail
    }

    /// Number of release segments as written
    pub fn len(&self) -> usize {
        self.release.len()
    }

    /// Whether the version had no release segments at all
    pub fn is_empty(&self) -> bool {
        self.release.is_empty()
    }

    /// Whether this is a pre-release or development release
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    fn segment(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    /// Whether the release starts with `prefix`'s release segments
    fn starts_with(&self, prefix: &Version) -> bool {
        self.epoch == prefix.epoch && (0..prefix.len()).all(|i| self.segment(i) == prefix.segment(i))
    }

    /// Release without its last segment or qualifiers (`1.4.5.post1` becomes `1.4`)
    fn parent(&self) -> Version {
        let keep = self.release.len().saturating_sub(1);
        let release: Vec<u64> = self.release[..keep].to_vec();
        let raw = release.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(".");
        Version {
            raw,
            epoch: self.epoch,
            release,
            pre: None,
            post: None,
            dev: None,
            rest: String::new(),
        }
    }

    /// Sort key of the pre-release part; a bare dev release sorts before `a0`
    fn pre_key(&self) -> (u8, Option<(Phase, u64)>) {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => (0, None),
            (Some(pre), _, _) => (1, Some(pre)),
            (None, _, _) => (2, None),
        }
    }

    /// Sort key of the dev part; no dev marker sorts last
    fn dev_key(&self) -> (u8, u64) {
        match self.dev {
            Some(n) => (0, n),
            None => (1, 0),
        }
    }
}

fn take_number(s: &str) -> (Option<u64>, &str) {
    let digits = s.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return (None, s);
    }
    (s[..digits].parse().ok(), &s[digits..])
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.release.len().max(other.release.len());
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| {
                (0..width)
                    .map(|i| self.segment(i).cmp(&other.segment(i)))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.rest.cmp(&other.rest))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Comparison operator of one constraint clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Exact,
    NotEqual,
    AtLeast,
    AtMost,
    Greater,
    Less,
    Compatible,
}

impl Operator {
    /// Split a leading operator off `s`, longest match first
    fn split(s: &str) -> Option<(Self, &str)> {
        const TABLE: [(&str, Operator); 7] = [
            ("~=", Operator::Compatible),
            ("==", Operator::Exact),
            ("!=", Operator::NotEqual),
            (">=", Operator::AtLeast),
            ("<=", Operator::AtMost),
            (">", Operator::Greater),
            ("<", Operator::Less),
        ];
        TABLE
            .iter()
            .find_map(|(token, op)| s.strip_prefix(token).map(|rest| (*op, rest)))
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "==",
            Self::NotEqual => "!=",
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::Compatible => "~=",
        }
    }
}

/// A single `<op><version>` clause
#[derive(Debug, Clone)]
pub struct Clause {
    pub operator: Operator,
    pub version: Version,
    /// Trailing `.*` on `==`/`!=`
    pub wildcard: bool,
}

impl Clause {
    /// Parse a clause such as `>=1.2` or `==2.*`
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        let (operator, rest) = Operator::split(s).ok_or_else(|| format!("missing operator in '{}'", s))?;
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(format!("missing version after '{}'", operator.as_str()));
        }

        let (text, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (rest, false),
        };
        if wildcard && !matches!(operator, Operator::Exact | Operator::NotEqual) {
            return Err(format!("wildcard not allowed with '{}'", operator.as_str()));
        }
        if !text.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_' | '!')) {
            return Err(format!("invalid version '{}'", text));
        }

        let version = Version::parse(text);
        if operator == Operator::Compatible && version.len() < 2 {
            return Err(format!("'~={}' needs at least two release segments", text));
        }

        Ok(Self {
            operator,
            version,
            wildcard,
        })
    }

    /// Whether `installed` satisfies this clause
    pub fn matches(&self, installed: &Version) -> bool {
        match self.operator {
            Operator::Exact if self.wildcard => installed.starts_with(&self.version),
            Operator::Exact => installed == &self.version,
            Operator::NotEqual if self.wildcard => !installed.starts_with(&self.version),
            Operator::NotEqual => installed != &self.version,
            Operator::AtLeast => installed >= &self.version,
            Operator::AtMost => installed <= &self.version,
            Operator::Greater => installed > &self.version,
            Operator::Less => installed < &self.version,
            Operator::Compatible => installed >= &self.version && installed.starts_with(&self.version.parent()),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.as_str(), self.version)?;
        if self.wildcard {
            write!(f, ".*")?;
        }
        Ok(())
    }
}

/// Conjunction of clauses; empty means any version satisfies
#[derive(Debug, Clone, Default)]
pub struct VersionSpec {
    clauses: Vec<Clause>,
}

impl VersionSpec {
    /// Spec accepting every version
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a comma separated clause list (`>=1.0, <2`)
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::any());
        }
        let clauses = s.split(',').map(Clause::parse).collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { clauses })
    }

    /// Whether no clause is declared
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Clauses in declaration order
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Append clauses from another spec for the same package
    pub fn extend(&mut self, other: VersionSpec) {
        self.clauses.extend(other.clauses);
    }

    /// Whether an installed version string satisfies every clause
    pub fn matches(&self, installed: &str) -> bool {
        let installed = Version::parse(installed);
        self.clauses.iter().all(|c| c.matches(&installed))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
