//! Port publication specs: `[ip:][hostPort:]containerPort[/proto]`.
//!
//! Both port fields accept ranges (`8000-8009`); IPv6 addresses are bracketed
//! (`[::1]:8080:80`). An empty host port (`127.0.0.1::80`) lets the runtime pick.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        })
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            other => Err(Error::config(format!("unsupported protocol {:?}", other))),
        }
    }
}

/// Container-side port, e.g. `80/tcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortKey {
    pub port: u16,
    pub protocol: Protocol,
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

impl FromStr for PortKey {
    type Err = Error;

    /// Parses `80` or `80/udp`.
    fn from_str(s: &str) -> Result<Self> {
        let (port, protocol) = match s.split_once('/') {
            Some((port, proto)) => (port, proto.parse()?),
            None => (s, Protocol::Tcp),
        };
        let port = port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| Error::config(format!("invalid port {:?}", s)))?;
        Ok(PortKey { port, protocol })
    }
}

/// Host side of a publication. Empty fields are chosen by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

pub type PortMap = BTreeMap<PortKey, Vec<PortBinding>>;

/// Parses every spec into one port map. Any malformed spec fails the whole call.
pub fn parse_port_specs<S: AsRef<str>>(specs: &[S]) -> Result<PortMap> {
    let mut map = PortMap::new();
    for spec in specs {
        for (key, binding) in parse_spec(spec.as_ref())? {
            map.entry(key).or_default().push(binding);
        }
    }
    Ok(map)
}

fn parse_spec(spec: &str) -> Result<Vec<(PortKey, PortBinding)>> {
    let invalid = |reason: &str| Error::config(format!("invalid port spec {:?}: {}", spec, reason));

    let raw = spec.trim();
    let (rest, protocol) = match raw.rsplit_once('/') {
        Some((rest, proto)) => (rest, proto.parse::<Protocol>()?),
        None => (raw, Protocol::Tcp),
    };

    let (ip, host, container) = if let Some(bracketed) = rest.strip_prefix('[') {
        let (ip, tail) = bracketed
            .split_once("]:")
            .ok_or_else(|| invalid("unterminated IPv6 address"))?;
        let (host, container) = tail
            .split_once(':')
            .ok_or_else(|| invalid("missing container port"))?;
        (ip, host, container)
    } else {
        let parts: Vec<&str> = rest.split(':').collect();
        match parts.as_slice() {
            [container] => ("", "", *container),
            [host, container] => ("", *host, *container),
            [ip, host, container] => (*ip, *host, *container),
            _ => return Err(invalid("too many fields")),
        }
    };

    if !ip.is_empty() && ip.parse::<IpAddr>().is_err() {
        return Err(invalid("invalid host ip"));
    }
    if container.is_empty() {
        return Err(invalid("missing container port"));
    }

    let (c_start, c_end) = parse_range(container).ok_or_else(|| invalid("invalid container port"))?;
    if c_start == 0 {
        return Err(invalid("container port must be non-zero"));
    }
    let host_range = if host.is_empty() {
        None
    } else {
        Some(parse_range(host).ok_or_else(|| invalid("invalid host port"))?)
    };

    let c_len = c_end - c_start;
    let mut out = Vec::with_capacity(usize::from(c_len) + 1);

    for (i, port) in (c_start..=c_end).enumerate() {
        let host_port = match host_range {
            None => String::new(),
            Some((h_start, h_end)) if h_end - h_start == c_len => {
                (u32::from(h_start) + i as u32).to_string()
            }
            // Single container port against a host range: the runtime picks one.
            Some((h_start, h_end)) if c_len == 0 => format!("{}-{}", h_start, h_end),
            Some(_) => return Err(invalid("host and container port ranges differ in size")),
        };

        out.push((
            PortKey { port, protocol },
            PortBinding {
                host_ip: ip.to_string(),
                host_port,
            },
        ));
    }

    Ok(out)
}

fn parse_range(s: &str) -> Option<(u16, u16)> {
    let (start, end) = match s.split_once('-') {
        Some((start, end)) => (start.parse().ok()?, end.parse().ok()?),
        None => {
            let port = s.parse().ok()?;
            (port, port)
        }
    };
    (start <= end).then_some((start, end))
}
