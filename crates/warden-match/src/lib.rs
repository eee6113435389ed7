//! warden-match
#![deny(unsafe_code)]
//!
//! Matching predicates for matcher expressions and pattern-enabled role links.
//!
//! Path-style patterns (`key_match2` .. `key_match5`) are translated into
//! anchored regular expressions. Pattern text outside of the parameter
//! placeholders is passed to the regex engine unchanged, so `.` in a pattern
//! matches any character.

use globset::GlobBuilder;
use ipnet::IpNet;
use regex::{NoExpand, Regex};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, LazyLock};

/// Comparator shape used by pattern-enabled role managers.
pub type MatchingFn = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Failure raised by a matching function on malformed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// The pattern did not compile as a regular expression.
    #[error("invalid regex `{pattern}`: {message}")]
    InvalidRegex {
        /// Pattern text after placeholder translation.
        pattern: String,
        /// Compiler message.
        message: String,
    },
    /// The argument is not an IP address.
    #[error("invalid IP address `{0}`")]
    InvalidIp(String),
    /// The argument is neither an IP address nor a CIDR block.
    #[error("invalid IP address or CIDR `{0}`")]
    InvalidIpOrCidr(String),
    /// The glob pattern did not compile.
    #[error("invalid glob `{pattern}`: {message}")]
    InvalidGlob {
        /// Pattern text.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}

static COLON_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":[^/]+").expect("static regex"));
static BRACE_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^/]+?\}").expect("static regex"));

fn compile(pattern: &str) -> Result<Regex, MatchError> {
    Regex::new(pattern).map_err(|e| MatchError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn anchored(body: &str) -> String {
    format!("^{body}$")
}

/// `*` in `key2` matches any suffix: `/foo/*` matches `/foo/bar/baz`.
pub fn key_match(key1: &str, key2: &str) -> bool {
    match key2.find('*') {
        None => key1 == key2,
        Some(i) if key1.len() > i => key1.get(..i) == key2.get(..i),
        Some(i) => Some(key1) == key2.get(..i),
    }
}

/// Returns the part of `key1` covered by the `*` in `key2`, or `""`.
///
/// `key_get("/foo/bar/baz", "/foo/*")` is `"bar/baz"`.
pub fn key_get(key1: &str, key2: &str) -> String {
    let Some(i) = key2.find('*') else {
        return String::new();
    };
    if key1.len() > i && key1.get(..i) == key2.get(..i) {
        return key1.get(i..).unwrap_or_default().to_string();
    }
    String::new()
}

/// `:name` matches one path segment, `*` matches anything.
///
/// `/resource/:id` matches `/resource/123`.
pub fn key_match2(key1: &str, key2: &str) -> Result<bool, MatchError> {
    let key2 = key2.replace("/*", "/.*");
    let body = COLON_PARAM.replace_all(&key2, NoExpand("[^/]+"));
    regex_match(key1, &anchored(&body))
}

/// Value bound to the `:name` parameter of `key2` when matching `key1`, or `""`.
pub fn key_get2(key1: &str, key2: &str, path_var: &str) -> Result<String, MatchError> {
    let key2 = key2.replace("/*", "/.*");
    let names: Vec<&str> = COLON_PARAM.find_iter(&key2).map(|m| &m.as_str()[1..]).collect();
    let body = COLON_PARAM.replace_all(&key2, NoExpand("([^/]+)"));
    let re = compile(&anchored(&body))?;
    let Some(caps) = re.captures(key1) else {
        return Ok(String::new());
    };
    for (i, name) in names.iter().enumerate() {
        if *name == path_var {
            return Ok(caps
                .get(i + 1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default());
        }
    }
    Ok(String::new())
}

/// `{name}` matches one path segment, `*` matches anything.
pub fn key_match3(key1: &str, key2: &str) -> Result<bool, MatchError> {
    let key2 = key2.replace("/*", "/.*");
    let body = BRACE_PARAM.replace_all(&key2, NoExpand("[^/]+"));
    regex_match(key1, &anchored(&body))
}

/// Like [`key_match3`], but repeated parameter names must bind equal values.
///
/// `/parent/{id}/child/{id}` matches `/parent/1/child/1` but not
/// `/parent/1/child/2`.
pub fn key_match4(key1: &str, key2: &str) -> Result<bool, MatchError> {
    let key2 = key2.replace("/*", "/.*");
    let names: Vec<&str> = BRACE_PARAM
        .find_iter(&key2)
        .map(|m| {
            let s = m.as_str();
            &s[1..s.len() - 1]
        })
        .collect();
    let body = BRACE_PARAM.replace_all(&key2, NoExpand("([^/]+)"));
    let re = compile(&anchored(&body))?;
    let Some(caps) = re.captures(key1) else {
        return Ok(false);
    };
    let mut bound: HashMap<&str, &str> = HashMap::new();
    for (i, name) in names.iter().enumerate() {
        let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
        match bound.get(name) {
            Some(prev) if *prev != value => return Ok(false),
            Some(_) => {}
            None => {
                bound.insert(name, value);
            }
        }
    }
    Ok(true)
}

/// [`key_match3`] semantics after dropping a `?query` suffix from `key1`.
pub fn key_match5(key1: &str, key2: &str) -> Result<bool, MatchError> {
    let key1 = key1.split_once('?').map_or(key1, |(path, _)| path);
    key_match3(key1, key2)
}

/// Unanchored regular-expression search of `pattern` in `key1`.
pub fn regex_match(key1: &str, pattern: &str) -> Result<bool, MatchError> {
    Ok(compile(pattern)?.is_match(key1))
}

/// `ip1` equals `ip2`, or lies inside the CIDR block `ip2`.
pub fn ip_match(ip1: &str, ip2: &str) -> Result<bool, MatchError> {
    let addr: IpAddr = ip1
        .trim()
        .parse()
        .map_err(|_| MatchError::InvalidIp(ip1.to_string()))?;
    if let Ok(net) = ip2.trim().parse::<IpNet>() {
        return Ok(net.contains(&addr));
    }
    let other: IpAddr = ip2
        .trim()
        .parse()
        .map_err(|_| MatchError::InvalidIpOrCidr(ip2.to_string()))?;
    Ok(addr == other)
}

/// Shell glob match where `*` does not cross `/`.
pub fn glob_match(key1: &str, pattern: &str) -> Result<bool, MatchError> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| MatchError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
    Ok(glob.compile_matcher().is_match(key1))
}

/// Two-argument comparator for the builtin function `name`.
///
/// Malformed input makes the comparator return `false`.
pub fn predicate(name: &str) -> Option<MatchingFn> {
    let f: MatchingFn = match name {
        "keyMatch" => Arc::new(key_match),
        "keyMatch2" => Arc::new(|a, b| key_match2(a, b).unwrap_or(false)),
        "keyMatch3" => Arc::new(|a, b| key_match3(a, b).unwrap_or(false)),
        "keyMatch4" => Arc::new(|a, b| key_match4(a, b).unwrap_or(false)),
        "keyMatch5" => Arc::new(|a, b| key_match5(a, b).unwrap_or(false)),
        "regexMatch" => Arc::new(|a, b| regex_match(a, b).unwrap_or(false)),
        "ipMatch" => Arc::new(|a, b| ip_match(a, b).unwrap_or(false)),
        "globMatch" => Arc::new(|a, b| glob_match(a, b).unwrap_or(false)),
        _ => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_match_wildcard_suffix() {
        assert!(key_match("/foo/bar", "/foo/*"));
        assert!(key_match("/foo/bar/baz", "/foo/*"));
        assert!(key_match("/foo", "/foo*"));
        assert!(!key_match("/bar", "/foo/*"));
        assert!(key_match("/foo", "/foo"));
        assert!(!key_match("/foo", "/foo/*"));
    }

    #[test]
    fn key_get_returns_wildcard_part() {
        assert_eq!(key_get("/foo/bar/baz", "/foo/*"), "bar/baz");
        assert_eq!(key_get("/foo", "/foo"), "");
        assert_eq!(key_get("/bar/x", "/foo/*"), "");
    }

    #[test]
    fn key_match2_path_params() {
        assert!(key_match2("/resource/123", "/resource/:id").unwrap());
        assert!(!key_match2("/resource/123/x", "/resource/:id").unwrap());
        assert!(key_match2("/alice_data/anything/here", "/alice_data/*").unwrap());
        assert!(key_match2("/proxy/myid/res", "/proxy/:id/*").unwrap());
        assert!(!key_match2("/foo", "/bar").unwrap());
    }

    #[test]
    fn key_get2_extracts_named_param() {
        assert_eq!(
            key_get2("/resource1/myid/x", "/resource1/:id/:rest", "id").unwrap(),
            "myid"
        );
        assert_eq!(
            key_get2("/resource1/myid/x", "/resource1/:id/:rest", "rest").unwrap(),
            "x"
        );
        assert_eq!(key_get2("/other", "/resource1/:id", "id").unwrap(), "");
        assert_eq!(key_get2("/resource1/1", "/resource1/:id", "nope").unwrap(), "");
    }

    #[test]
    fn key_match3_brace_params() {
        assert!(key_match3("/foo/bar", "/foo/{name}").unwrap());
        assert!(!key_match3("/foo/bar/baz", "/foo/{name}").unwrap());
        assert!(key_match3("/foo/bar/baz", "/foo/*").unwrap());
    }

    #[test]
    fn key_match4_repeated_params_must_agree() {
        assert!(key_match4("/parent/123/child/123", "/parent/{id}/child/{id}").unwrap());
        assert!(!key_match4("/parent/123/child/456", "/parent/{id}/child/{id}").unwrap());
        assert!(key_match4("/parent/1/child/2", "/parent/{a}/child/{b}").unwrap());
        assert!(!key_match4("/other", "/parent/{id}").unwrap());
    }

    #[test]
    fn key_match5_ignores_query() {
        assert!(key_match5("/foo/bar?status=1&type=2", "/foo/{id}").unwrap());
        assert!(key_match5("/foo/bar", "/foo/*").unwrap());
        assert!(!key_match5("/foo/bar/baz?x=1", "/foo/{id}").unwrap());
    }

    #[test]
    fn regex_match_is_unanchored() {
        assert!(regex_match("GET", "(GET)|(POST)").unwrap());
        assert!(regex_match("/topic/create/123", "/topic/create").unwrap());
        assert!(!regex_match("DELETE", "^(GET)|(POST)$").unwrap());
        assert!(regex_match("x", "(").is_err());
    }

    #[test]
    fn ip_match_cidr_and_exact() {
        assert!(ip_match("192.168.2.123", "192.168.2.0/24").unwrap());
        assert!(!ip_match("192.168.3.1", "192.168.2.0/24").unwrap());
        assert!(ip_match("10.0.0.1", "10.0.0.1").unwrap());
        assert!(ip_match("::1", "::1/128").unwrap());
        assert!(matches!(
            ip_match("not-an-ip", "10.0.0.0/8"),
            Err(MatchError::InvalidIp(_))
        ));
        assert!(matches!(
            ip_match("10.0.0.1", "garbage"),
            Err(MatchError::InvalidIpOrCidr(_))
        ));
    }

    #[test]
    fn glob_star_stays_in_segment() {
        assert!(glob_match("/foo/bar", "/foo/*").unwrap());
        assert!(!glob_match("/foo/bar/baz", "/foo/*").unwrap());
        assert!(glob_match("/foo/bar/baz", "/foo/*/baz").unwrap());
        assert!(glob_match("/prefix/file.txt", "/prefix/*.txt").unwrap());
    }

    #[test]
    fn predicate_lookup_by_name() {
        let f = predicate("keyMatch2").expect("builtin");
        assert!(f("/book/1", "/book/:id"));
        let f = predicate("regexMatch").expect("builtin");
        assert!(!f("x", "("));
        assert!(predicate("noSuchFn").is_none());
    }
}
