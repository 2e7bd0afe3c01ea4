//! Minimal address handling needed to key the identity table.
//!
//! Addresses are treated as opaque `scheme://host[:port]/path[;params][?query][#fragment]`
//! strings. Only three things are interpreted here: the fragment tag, redundant
//! `.`/`..` path segments, and relative references against a base address.

/// Borrowed view of the components of an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Parts<'a> {
    /// Scheme including the trailing colon, e.g. `http:`.
    scheme: &'a str,
    /// Authority including the leading `//`, e.g. `//host:80`.
    authority: &'a str,
    path: &'a str,
    /// Query with its leading `?`, possibly empty.
    query: &'a str,
}

fn scheme_len(addr: &str) -> usize {
    let Some(colon) = addr.find(':') else {
        return 0;
    };
    let candidate = &addr[..colon];
    let mut chars = candidate.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        colon + 1
    } else {
        0
    }
}

fn parts(addr: &str) -> Parts<'_> {
    let (addr, _) = addr.split_once('#').unwrap_or((addr, ""));
    let scheme_end = scheme_len(addr);
    let scheme = &addr[..scheme_end];
    let rest = &addr[scheme_end..];
    let (authority, rest) = if let Some(after) = rest.strip_prefix("//") {
        let end = after.find(['/', '?']).map_or(rest.len(), |i| i + 2);
        rest.split_at(end)
    } else {
        ("", rest)
    };
    let (path, query) = match rest.find('?') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    Parts {
        scheme,
        authority,
        path,
        query,
    }
}

/// Split off the fragment tag. The tag is `None` when absent or empty.
pub fn split_fragment(addr: &str) -> (&str, Option<&str>) {
    match addr.split_once('#') {
        Some((base, tag)) if !tag.is_empty() => (base, Some(tag)),
        Some((base, _)) => (base, None),
        None => (addr, None),
    }
}

/// Whether the address carries an explicit scheme such as `http:`.
pub fn has_scheme(addr: &str) -> bool {
    scheme_len(addr) > 0
}

/// Collapse `.` and `..` segments in the path of `addr`.
///
/// Only the path is rewritten; scheme, authority, query and fragment are kept
/// verbatim. `..` never climbs above the root of an absolute path.
pub fn simplify(addr: &str) -> String {
    let (body, fragment) = match addr.split_once('#') {
        Some((body, frag)) => (body, Some(frag)),
        None => (addr, None),
    };
    let p = parts(body);
    let mut out = String::with_capacity(addr.len());
    out.push_str(p.scheme);
    out.push_str(p.authority);
    out.push_str(&collapse_path(p.path));
    out.push_str(p.query);
    if let Some(frag) = fragment {
        out.push('#');
        out.push_str(frag);
    }
    out
}

fn collapse_path(path: &str) -> String {
    if !path.split('/').any(|seg| seg == "." || seg == "..") {
        return path.to_string();
    }
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/')
        || path.ends_with("/.")
        || path.ends_with("/..")
        || path == "."
        || path == "..";
    let body = path.strip_prefix('/').unwrap_or(path);
    let body = body.strip_suffix('/').unwrap_or(body);

    let mut segments: Vec<&str> = Vec::new();
    for seg in body.split('/') {
        match seg {
            "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        out.push('/');
    }
    out
}

/// Resolve `href` against `base` and simplify the result.
///
/// A fragment on `href` is kept; a fragment on `base` is dropped.
pub fn resolve_relative(href: &str, base: &str) -> String {
    if has_scheme(href) {
        return simplify(href);
    }
    let b = parts(base);
    let joined = if href.is_empty() {
        format!("{}{}{}{}", b.scheme, b.authority, b.path, b.query)
    } else if href.starts_with("//") {
        format!("{}{href}", b.scheme)
    } else if href.starts_with('/') {
        format!("{}{}{href}", b.scheme, b.authority)
    } else if href.starts_with('#') {
        format!("{}{}{}{}{href}", b.scheme, b.authority, b.path, b.query)
    } else if href.starts_with('?') {
        format!("{}{}{}{href}", b.scheme, b.authority, b.path)
    } else {
        let dir = match b.path.rfind('/') {
            Some(i) => &b.path[..=i],
            None if !b.authority.is_empty() => "/",
            None => "",
        };
        format!("{}{}{dir}{href}", b.scheme, b.authority)
    };
    simplify(&joined)
}

/// Bucket index of a normalized address in a table of `buckets` slots.
pub fn bucket_hash(addr: &str, buckets: usize) -> usize {
    let buckets = buckets.max(1);
    addr.bytes()
        .fold(0usize, |hash, byte| (hash * 3 + byte as usize) % buckets)
}
