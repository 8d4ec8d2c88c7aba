//! Parsing of human-entered network and port fields

use crate::error::ParseError;
use ipnet::IpNet;
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

/// Address family of a network block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => AddressFamily::V4,
            IpNet::V6(_) => AddressFamily::V6,
        }
    }
}

/// Ordered list of CIDR blocks parsed from one comma-separated field.
/// Never empty; every block shares one address family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSet {
    blocks: Vec<IpNet>,
}

impl NetworkSet {
    /// Parse a comma-separated list of CIDR blocks or bare host addresses
    pub fn parse(field: &str, column: &str) -> Result<Self, ParseError> {
        if field.trim().is_empty() {
            return Err(ParseError::EmptyField {
                field: column.to_string(),
            });
        }

        let mut blocks = Vec::new();
        let mut family = None;

        for raw in field.split(',') {
            let token = raw.trim();
            let block = parse_block(token).ok_or_else(|| ParseError::InvalidNetwork {
                field: column.to_string(),
                token: token.to_string(),
            })?;

            let block_family = AddressFamily::of(&block);
            match family {
                None => family = Some(block_family),
                Some(f) if f != block_family => {
                    return Err(ParseError::MixedFamily {
                        field: column.to_string(),
                        token: token.to_string(),
                    });
                }
                Some(_) => {}
            }

            blocks.push(block);
        }

        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[IpNet] {
        &self.blocks
    }

    pub fn family(&self) -> AddressFamily {
        // Non-empty by construction
        AddressFamily::of(&self.blocks[0])
    }

    /// True if every block of `self` lies inside at least one block of `other`
    pub fn is_subset_of(&self, other: &NetworkSet) -> bool {
        self.blocks
            .iter()
            .all(|block| other.blocks.iter().any(|outer| outer.contains(block)))
    }

    /// True if any block of `self` lies inside any of the given supernets
    pub fn any_within(&self, supernets: &[IpNet]) -> bool {
        self.blocks
            .iter()
            .any(|block| supernets.iter().any(|outer| outer.contains(block)))
    }
}

impl fmt::Display for NetworkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.blocks.iter().map(|b| b.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse one CIDR token. A bare address becomes a host route.
/// Host bits are cleared, so `10.0.0.7/24` yields `10.0.0.0/24`.
fn parse_block(token: &str) -> Option<IpNet> {
    if token.contains('/') {
        return token.parse::<IpNet>().ok().map(|net| net.trunc());
    }

    let addr = token.parse::<IpAddr>().ok()?;
    let prefix = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNet::new(addr, prefix).ok()
}

/// Set of destination ports expanded from singles and inclusive ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSet {
    ports: BTreeSet<u16>,
}

impl PortSet {
    /// Parse a comma-separated list of ports and `low-high` ranges
    pub fn parse(field: &str, column: &str) -> Result<Self, ParseError> {
        if field.trim().is_empty() {
            return Err(ParseError::EmptyField {
                field: column.to_string(),
            });
        }

        let mut ports = BTreeSet::new();

        for raw in field.split(',') {
            let token = raw.trim();
            let invalid = || ParseError::InvalidPort {
                field: column.to_string(),
                token: token.to_string(),
            };

            match token.split_once('-') {
                Some((low, high)) => {
                    let low = parse_port(low.trim()).ok_or_else(invalid)?;
                    let high = parse_port(high.trim()).ok_or_else(invalid)?;
                    if low > high {
                        return Err(ParseError::InvertedRange {
                            field: column.to_string(),
                            token: token.to_string(),
                        });
                    }
                    ports.extend(low..=high);
                }
                None => {
                    ports.insert(parse_port(token).ok_or_else(invalid)?);
                }
            }
        }

        Ok(Self { ports })
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    pub fn intersects(&self, other: &PortSet) -> bool {
        // Iterate over the smaller side
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|p| large.contains(p))
    }

    pub fn intersection(&self, other: &PortSet) -> PortSet {
        PortSet {
            ports: self.ports.intersection(&other.ports).copied().collect(),
        }
    }
}

impl fmt::Display for PortSet {
    /// Compact form: consecutive runs are collapsed into `low-high`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let mut iter = self.iter().peekable();

        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(&next) = iter.peek() {
                if end.checked_add(1) == Some(next) {
                    end = next;
                    iter.next();
                } else {
                    break;
                }
            }

            if start == end {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{}-{}", start, end));
            }
        }

        write!(f, "{}", parts.join(","))
    }
}

/// Parse a decimal port number. Only ASCII digits are accepted, so `+22` is rejected.
fn parse_port(token: &str) -> Option<u16> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
