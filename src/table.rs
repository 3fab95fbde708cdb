// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! The static name-to-address table the server answers from.
//!
//! A [`LookupTable`] is built once, at start-up, from `(Key, address)`
//! pairs and never changes afterwards; the server shares it read-only
//! between all of its workers. It holds two kinds of entries:
//!
//! * **exact** names, looked up in a hash map; and
//! * **wildcard** patterns, keys containing `*`, where each `*` stands
//!   for any sequence of characters (including dots and the empty
//!   sequence) in the full query name. `*.example.com` thus matches
//!   `www.example.com` and `a.b.example.com`, but not `example.com`.
//!
//! Exact entries take precedence over wildcards. Among wildcards, the
//! most specific pattern wins: patterns are tried in order of
//! decreasing number of literal (non-`*`) characters, with ties broken
//! by comparing the patterns as strings. This order depends only on the
//! set of patterns, not on the order they were configured in.
//!
//! All matching is ASCII-case-insensitive, and a trailing dot on either
//! side is ignored.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use regex::Regex;

////////////////////////////////////////////////////////////////////////
// KEYS                                                               //
////////////////////////////////////////////////////////////////////////

/// A normalized table key: lowercase, without a trailing dot.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Key {
    Exact(String),
    Wildcard(String),
}

impl Key {
    /// Returns the normalized key text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(name) => name,
            Self::Wildcard(pattern) => pattern,
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.strip_suffix('.').unwrap_or(text);
        if text.is_empty() {
            return Err(Error::EmptyKey);
        } else if text.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidKey(text.to_owned()));
        }
        let normalized = text.to_ascii_lowercase();
        if normalized.contains('*') {
            Ok(Self::Wildcard(normalized))
        } else {
            Ok(Self::Exact(normalized))
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

////////////////////////////////////////////////////////////////////////
// LOOKUP TABLE                                                       //
////////////////////////////////////////////////////////////////////////

/// The immutable table of exact names and wildcard patterns. See the
/// [module documentation](self) for matching rules.
#[derive(Debug, Default)]
pub struct LookupTable {
    exact: HashMap<String, Ipv4Addr>,
    wildcards: Vec<Wildcard>,
}

/// A compiled wildcard pattern.
#[derive(Debug)]
struct Wildcard {
    pattern: String,
    regex: Regex,
    address: Ipv4Addr,
}

/// The result of a successful [`LookupTable::lookup`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Hit<'a> {
    Exact(Ipv4Addr),
    Wildcard { pattern: &'a str, address: Ipv4Addr },
}

impl Hit<'_> {
    /// Returns the address to answer with.
    pub fn address(&self) -> Ipv4Addr {
        match *self {
            Self::Exact(address) => address,
            Self::Wildcard { address, .. } => address,
        }
    }
}

impl LookupTable {
    /// Builds a table from `(key, address)` entries. Two entries whose
    /// keys normalize to the same text are an error.
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Key, Ipv4Addr)>,
    {
        let mut exact = HashMap::new();
        let mut wildcards = Vec::new();
        for (key, address) in entries {
            match key {
                Key::Exact(name) => {
                    if exact.contains_key(&name) {
                        return Err(Error::DuplicateKey(name));
                    }
                    exact.insert(name, address);
                }
                Key::Wildcard(pattern) => {
                    if wildcards.iter().any(|w: &Wildcard| w.pattern == pattern) {
                        return Err(Error::DuplicateKey(pattern));
                    }
                    let regex = compile_wildcard(&pattern)?;
                    wildcards.push(Wildcard {
                        pattern,
                        regex,
                        address,
                    });
                }
            }
        }
        wildcards.sort_by(|a, b| {
            literal_len(&b.pattern)
                .cmp(&literal_len(&a.pattern))
                .then_with(|| a.pattern.cmp(&b.pattern))
        });
        Ok(Self { exact, wildcards })
    }

    /// Looks up `qname`: first as an exact name, then against each
    /// wildcard pattern in precedence order.
    pub fn lookup(&self, qname: &str) -> Option<Hit> {
        let qname = qname.strip_suffix('.').unwrap_or(qname);
        let qname = qname.to_ascii_lowercase();
        if let Some(address) = self.exact.get(&qname) {
            return Some(Hit::Exact(*address));
        }
        self.wildcards
            .iter()
            .find(|w| w.regex.is_match(&qname))
            .map(|w| Hit::Wildcard {
                pattern: &w.pattern,
                address: w.address,
            })
    }

    /// Returns the number of exact names.
    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }

    /// Returns the wildcard patterns in the order they are tried.
    pub fn wildcard_patterns(&self) -> impl Iterator<Item = &str> {
        self.wildcards.iter().map(|w| w.pattern.as_str())
    }

    /// Returns whether the table has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcards.is_empty()
    }
}

/// Turns a wildcard key into an anchored regular expression: the key is
/// escaped, and then each (escaped) `*` becomes `(.*)`.
fn compile_wildcard(pattern: &str) -> Result<Regex> {
    let expr = format!("^{}$", regex::escape(pattern).replace(r"\*", "(.*)"));
    Regex::new(&expr).map_err(|e| Error::InvalidPattern(pattern.to_owned(), e))
}

fn literal_len(pattern: &str) -> usize {
    pattern.chars().filter(|&c| c != '*').count()
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a table could not be built.
#[derive(Clone, Debug)]
pub enum Error {
    EmptyKey,
    InvalidKey(String),
    DuplicateKey(String),
    InvalidPattern(String, regex::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::EmptyKey => f.write_str("empty name"),
            Self::InvalidKey(key) => write!(f, "invalid name {key:?}"),
            Self::DuplicateKey(key) => write!(f, "{key} is listed more than once"),
            Self::InvalidPattern(key, err) => write!(f, "invalid wildcard {key}: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible table operations.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> LookupTable {
        LookupTable::new(
            entries
                .iter()
                .map(|(key, addr)| (key.parse().unwrap(), addr.parse().unwrap())),
        )
        .unwrap()
    }

    fn address_of(table: &LookupTable, qname: &str) -> Option<Ipv4Addr> {
        table.lookup(qname).map(|hit| hit.address())
    }

    #[test]
    fn key_normalizes() {
        assert_eq!(
            "Foo.COM.".parse::<Key>().unwrap(),
            Key::Exact("foo.com".to_owned())
        );
        assert_eq!(
            "*.Foo.com".parse::<Key>().unwrap(),
            Key::Wildcard("*.foo.com".to_owned())
        );
        assert!(matches!("".parse::<Key>(), Err(Error::EmptyKey)));
        assert!(matches!(".".parse::<Key>(), Err(Error::EmptyKey)));
        assert!(matches!("a b".parse::<Key>(), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn exact_match() {
        let table = table(&[("foo.com", "1.2.3.4")]);
        assert_eq!(table.lookup("foo.com"), Some(Hit::Exact([1, 2, 3, 4].into())));
        assert_eq!(address_of(&table, "FOO.com."), Some([1, 2, 3, 4].into()));
        assert_eq!(table.lookup("www.foo.com"), None);
        assert_eq!(table.lookup("oo.com"), None);
    }

    #[test]
    fn wildcard_match() {
        let table = table(&[("*.foo.com", "5.6.7.8")]);
        assert_eq!(
            table.lookup("bar.foo.com"),
            Some(Hit::Wildcard {
                pattern: "*.foo.com",
                address: [5, 6, 7, 8].into(),
            })
        );
        assert_eq!(address_of(&table, "a.b.foo.com"), Some([5, 6, 7, 8].into()));
        assert_eq!(table.lookup("foo.com"), None);
        assert_eq!(table.lookup("barfoo.com"), None);
        assert_eq!(table.lookup("bar.foo.com.evil"), None);
    }

    #[test]
    fn wildcard_escapes_metacharacters() {
        let table = table(&[("a+b.*.com", "1.1.1.1")]);
        assert_eq!(address_of(&table, "a+b.x.com"), Some([1, 1, 1, 1].into()));
        assert_eq!(table.lookup("aab.x.com"), None);
        assert_eq!(table.lookup("a+bxx.com"), None);
    }

    #[test]
    fn exact_takes_precedence_over_wildcard() {
        let table = table(&[("*.foo.com", "5.6.7.8"), ("www.foo.com", "1.2.3.4")]);
        assert_eq!(address_of(&table, "www.foo.com"), Some([1, 2, 3, 4].into()));
        assert_eq!(address_of(&table, "mail.foo.com"), Some([5, 6, 7, 8].into()));
    }

    #[test]
    fn most_specific_wildcard_wins() {
        let forwards = table(&[
            ("*.com", "1.1.1.1"),
            ("*.foo.com", "2.2.2.2"),
            ("*.bar.foo.com", "3.3.3.3"),
        ]);
        let backwards = table(&[
            ("*.bar.foo.com", "3.3.3.3"),
            ("*.foo.com", "2.2.2.2"),
            ("*.com", "1.1.1.1"),
        ]);
        for table in [&forwards, &backwards] {
            assert_eq!(address_of(table, "x.bar.foo.com"), Some([3, 3, 3, 3].into()));
            assert_eq!(address_of(table, "x.foo.com"), Some([2, 2, 2, 2].into()));
            assert_eq!(address_of(table, "x.com"), Some([1, 1, 1, 1].into()));
        }
        assert_eq!(
            forwards.wildcard_patterns().collect::<Vec<_>>(),
            ["*.bar.foo.com", "*.foo.com", "*.com"],
        );
    }

    #[test]
    fn equally_specific_wildcards_are_ordered_by_text() {
        let table = table(&[("b.*", "2.2.2.2"), ("*.b", "1.1.1.1")]);
        assert_eq!(table.wildcard_patterns().collect::<Vec<_>>(), ["*.b", "b.*"]);
        assert_eq!(address_of(&table, "b.b"), Some([1, 1, 1, 1].into()));
    }

    #[test]
    fn empty_table_matches_nothing() {
        let empty = LookupTable::new([]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.lookup("foo.com"), None);
        assert!(!table(&[("*.foo.com", "5.6.7.8")]).is_empty());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = LookupTable::new([
            ("foo.com".parse().unwrap(), Ipv4Addr::LOCALHOST),
            ("FOO.com.".parse().unwrap(), Ipv4Addr::BROADCAST),
        ]);
        assert!(matches!(result, Err(Error::DuplicateKey(key)) if key == "foo.com"));
    }
}
