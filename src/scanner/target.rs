use std::fmt;

/// A single host to scan, optionally with the domain name it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub host: String,
    pub domain: Option<String>,
}

impl ScanTarget {
    pub fn new(host: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            host: host.into(),
            domain: domain.filter(|d| !d.is_empty()),
        }
    }

    /// Parses `host` or `host,domain`. Returns `None` when the host is empty.
    pub fn parse(line: &str) -> Option<Self> {
        let (host, domain) = match line.split_once(',') {
            Some((host, domain)) => (host.trim(), Some(domain.trim().to_string())),
            None => (line.trim(), None),
        };
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, domain))
    }

    /// Name to present to the server, e.g. for SNI.
    pub fn server_name(&self) -> &str {
        self.domain.as_deref().unwrap_or(&self.host)
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.domain {
            Some(domain) => write!(f, "{} ({})", self.host, domain),
            None => f.write_str(&self.host),
        }
    }
}
