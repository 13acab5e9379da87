pub mod clash;
pub mod hysteria;
pub mod xray;

use std::fmt;

use crate::error::{Error, Result};
use crate::proxy::{Proxy, UniqueKey};

/// A parsed record together with the key it deduplicates under.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub key: UniqueKey,
    pub proxy: Proxy,
}

impl Candidate {
    pub fn keyed_by_type(proxy: Proxy) -> Self {
        Self {
            key: UniqueKey::for_proxy(&proxy),
            proxy,
        }
    }
}

/// Outcome of one document: the records extracted in order, each either a candidate or the
/// reason that entry was skipped.
pub type Entries = Vec<Result<Candidate>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    ClashMeta,
    Hysteria,
    Hysteria2,
    Xray,
}

impl SourceFormat {
    /// Within-source index given to the first record: routing-YAML entries count from 1, the
    /// single-record JSON formats use 0 so their names never collide with a YAML entry.
    pub fn first_position(self) -> usize {
        match self {
            SourceFormat::ClashMeta => 1,
            _ => 0,
        }
    }

    pub fn parse(self, document: &str) -> Result<Entries> {
        match self {
            SourceFormat::ClashMeta => clash::parse(document),
            SourceFormat::Hysteria => hysteria::parse_v1(document).map(|c| vec![Ok(c)]),
            SourceFormat::Hysteria2 => hysteria::parse_v2(document).map(|c| vec![Ok(c)]),
            SourceFormat::Xray => xray::parse(document).map(|c| vec![Ok(c)]),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceFormat::ClashMeta => "Clash Meta",
            SourceFormat::Hysteria => "Hysteria",
            SourceFormat::Hysteria2 => "Hysteria2",
            SourceFormat::Xray => "Xray",
        })
    }
}

/// Splits `host:port[,extra...]` at the last colon.
pub(crate) fn split_server(server: &str) -> Result<(&str, &str)> {
    let (host, ports) = server.rsplit_once(':').ok_or_else(|| Error::InvalidField {
        field: "server",
        value: server.to_string(),
    })?;
    if host.is_empty() {
        return Err(Error::InvalidField {
            field: "server",
            value: server.to_string(),
        });
    }
    Ok((host, ports))
}

pub(crate) fn parse_port(segment: &str) -> Result<u16> {
    segment.trim().parse().map_err(|_| Error::InvalidField {
        field: "port",
        value: segment.to_string(),
    })
}
