//! ESMTP extension features discovered from an EHLO reply.

use std::collections::HashMap;

/// Server capabilities advertised in an EHLO reply.
///
/// Maps the lower-cased extension keyword (e.g. `starttls`, `auth`, `size`)
/// to its parameter string (empty when the extension takes none). The map is
/// populated only by a successful EHLO; a HELO greeting leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsmtpFeatures {
    features: HashMap<String, String>,
}

impl EsmtpFeatures {
    /// Parses the lines of an EHLO logical reply into a feature map.
    ///
    /// Each line is `KEYWORD[ SP params]`. A server that opens the reply
    /// with a hostname banner contributes one inert entry keyed by that
    /// hostname, which never collides with a real extension keyword.
    #[must_use]
    pub fn parse(lines: &[String]) -> Self {
        let mut features = HashMap::new();
        for line in lines {
            let mut parts = line.splitn(2, ' ');
            let Some(keyword) = parts.next() else {
                continue;
            };
            if keyword.is_empty() {
                continue;
            }
            let params = parts.next().unwrap_or("");
            features.insert(keyword.to_ascii_lowercase(), params.to_string());
        }
        Self { features }
    }

    /// Pure lookup: true iff `name` (case-insensitive) was advertised.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.features.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the parameter string for `name`, if advertised.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.features
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns true if no features have been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of discovered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }
}
