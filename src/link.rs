//! Typed edges between anchors.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::anchor::AnchorId;

/// Operation a link was (or will be) traversed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Invalid,
    Get,
    Head,
    Post,
    Put,
    Delete,
    Link,
    Unlink,
}

/// Bitwise union of [`Method::bit`] values, as carried by an `Allow` header.
pub type MethodSet = u32;

impl Method {
    /// Return the canonical token for this method.
    pub fn as_atom(self) -> &'static str {
        match self {
            Method::Invalid => "INVALID",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Link => "LINK",
            Method::Unlink => "UNLINK",
        }
    }

    /// Parse a method token, case-insensitively.
    pub fn from_atom(atom: &str) -> Result<Method> {
        match atom.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "LINK" => Ok(Method::Link),
            "UNLINK" => Ok(Method::Unlink),
            other => bail!("unknown method `{other}`"),
        }
    }

    pub fn bit(self) -> MethodSet {
        match self {
            Method::Invalid => 0,
            Method::Get => 0x01,
            Method::Head => 0x02,
            Method::Post => 0x04,
            Method::Put => 0x08,
            Method::Delete => 0x10,
            Method::Link => 0x20,
            Method::Unlink => 0x40,
        }
    }
}

/// Relation token of a link, e.g. `stylesheet` or `redirect`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LinkType(String);

impl LinkType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LinkType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Outcome of the last operation performed across a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkResult {
    #[default]
    Invalid,
    Ok,
    Error,
}

/// A directed edge to `dest`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub dest: AnchorId,
    pub link_type: Option<LinkType>,
    pub method: Method,
    pub result: LinkResult,
}

impl Link {
    pub fn new(dest: AnchorId, link_type: Option<LinkType>, method: Method) -> Self {
        Self {
            dest,
            link_type,
            method,
            result: LinkResult::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_atoms_roundtrip() -> Result<()> {
        for method in [Method::Get, Method::Post, Method::Unlink] {
            assert_eq!(Method::from_atom(method.as_atom())?, method);
        }
        assert_eq!(Method::from_atom("head")?, Method::Head);
        assert!(Method::from_atom("BREW").is_err());
        Ok(())
    }

    #[test]
    fn method_bits_are_disjoint() {
        let all = [
            Method::Get,
            Method::Head,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Link,
            Method::Unlink,
        ];
        let mut seen: MethodSet = 0;
        for m in all {
            assert_eq!(seen & m.bit(), 0);
            seen |= m.bit();
        }
        assert_eq!(Method::Invalid.bit(), 0);
    }
}
