//! Entity metadata held by parent anchors.

use std::time::SystemTime;

use crate::link::{Method, MethodSet};

/// Content type assigned to anchors whose format is not yet known.
pub const UNKNOWN_FORMAT: &str = "www/unknown";

/// Entity header information and cache bookkeeping for one resource.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    content_type: String,
    charset: Option<String>,
    level: Option<String>,
    encoding: Option<String>,
    language: Option<String>,
    transfer_encoding: Option<String>,
    content_length: Option<u64>,
    methods: MethodSet,
    title: Option<String>,
    version: Option<String>,
    derived_from: Option<String>,
    date: Option<SystemTime>,
    expires: Option<SystemTime>,
    last_modified: Option<SystemTime>,
    extra_headers: Vec<String>,
    header_parsed: bool,
    is_index: bool,
    cache_hit: bool,
    protocol: Option<String>,
    physical: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            content_type: UNKNOWN_FORMAT.to_string(),
            charset: None,
            level: None,
            encoding: None,
            language: None,
            transfer_encoding: None,
            content_length: None,
            methods: 0,
            title: None,
            version: None,
            derived_from: None,
            date: None,
            expires: None,
            last_modified: None,
            extra_headers: Vec::new(),
            header_parsed: false,
            is_index: false,
            cache_hit: false,
            protocol: None,
            physical: None,
        }
    }
}

impl Metadata {
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn set_content_type(&mut self, format: impl Into<String>) {
        self.content_type = format.into();
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn set_charset(&mut self, charset: Option<String>) {
        self.charset = charset;
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    pub fn set_level(&mut self, level: Option<String>) {
        self.level = level;
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn set_encoding(&mut self, encoding: Option<String>) {
        self.encoding = encoding;
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, language: Option<String>) {
        self.language = language;
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.transfer_encoding.as_deref()
    }

    pub fn set_transfer_encoding(&mut self, cte: Option<String>) {
        self.transfer_encoding = cte;
    }

    /// Declared body length, `None` when unknown.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn set_content_length(&mut self, length: Option<u64>) {
        self.content_length = length;
    }

    pub fn methods(&self) -> MethodSet {
        self.methods
    }

    pub fn allows(&self, method: Method) -> bool {
        method.bit() != 0 && self.methods & method.bit() != 0
    }

    pub fn set_methods(&mut self, methods: MethodSet) {
        self.methods = methods;
    }

    pub fn append_methods(&mut self, methods: MethodSet) {
        self.methods |= methods;
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Append to the title, starting one if none is set.
    pub fn append_title(&mut self, more: &str) {
        self.title.get_or_insert_with(String::new).push_str(more);
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
    }

    pub fn derived_from(&self) -> Option<&str> {
        self.derived_from.as_deref()
    }

    pub fn set_derived_from(&mut self, derived: impl Into<String>) {
        self.derived_from = Some(derived.into());
    }

    pub fn date(&self) -> Option<SystemTime> {
        self.date
    }

    pub fn set_date(&mut self, date: Option<SystemTime>) {
        self.date = date;
    }

    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    pub fn set_expires(&mut self, expires: Option<SystemTime>) {
        self.expires = expires;
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn set_last_modified(&mut self, last_modified: Option<SystemTime>) {
        self.last_modified = last_modified;
    }

    /// Unrecognised header lines, in arrival order.
    pub fn extra_headers(&self) -> &[String] {
        &self.extra_headers
    }

    pub fn add_extra(&mut self, header: impl Into<String>) {
        self.extra_headers.push(header.into());
    }

    pub fn header_parsed(&self) -> bool {
        self.header_parsed
    }

    pub fn set_header_parsed(&mut self) {
        self.header_parsed = true;
    }

    pub fn is_index(&self) -> bool {
        self.is_index
    }

    pub fn set_index(&mut self, is_index: bool) {
        self.is_index = is_index;
    }

    pub fn cache_hit(&self) -> bool {
        self.cache_hit
    }

    pub fn set_cache_hit(&mut self, hit: bool) {
        self.cache_hit = hit;
    }

    /// Name of the protocol module that serves this resource.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub fn set_protocol(&mut self, protocol: Option<String>) {
        self.protocol = protocol;
    }

    /// Physical location after proxying or redirection, if different from the address.
    pub fn physical(&self) -> Option<&str> {
        self.physical.as_deref()
    }

    pub fn set_physical(&mut self, physical: impl Into<String>) {
        self.physical = Some(physical.into());
    }

    /// Forget everything learned from a response header.
    ///
    /// Title, index and cache flags, protocol and physical address survive.
    pub fn clear_header(&mut self) {
        self.methods = 0;
        self.encoding = None;
        self.language = None;
        self.content_length = None;
        self.transfer_encoding = None;
        self.content_type = UNKNOWN_FORMAT.to_string();
        self.charset = None;
        self.level = None;
        self.date = None;
        self.expires = None;
        self.last_modified = None;
        self.derived_from = None;
        self.version = None;
        self.extra_headers.clear();
        self.header_parsed = false;
    }
}
