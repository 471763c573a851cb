use std::fmt;
use std::str::FromStr;

/// `hostPort:containerPort` binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

impl FromStr for PortMapping {
    type Err = PortMappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| PortMappingError {
            entry: s.to_owned(),
            reason,
        };

        let (host, container) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected hostPort:containerPort"))?;
        if container.contains(':') {
            return Err(invalid("expected exactly one ':'"));
        }

        Ok(Self {
            host: parse_port(host).ok_or_else(|| invalid("host port must be 1-65535"))?,
            container: parse_port(container)
                .ok_or_else(|| invalid("container port must be 1-65535"))?,
        })
    }
}

fn parse_port(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u16>()
        // arch-lint: allow(no-silent-result-drop) reason="out-of-range digits are reported as an invalid port by the caller"
        .ok()
        .filter(|p| *p != 0)
}

/// Parse every entry; the first malformed one fails the whole set.
pub fn parse_port_mappings(entries: &[String]) -> Result<Vec<PortMapping>, PortMappingError> {
    entries.iter().map(|e| e.parse()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid port mapping {entry:?}: {reason}")]
pub struct PortMappingError {
    pub entry: String,
    pub reason: &'static str,
}
