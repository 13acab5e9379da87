pub mod opts;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use opts::{
    Bandwidth, GrpcOpts, H2Opts, Hysteria, Hysteria2, Other, Ports, RealityOpts, Shadowsocks,
    Tuic, Vless, Vmess, WsOpts, XhttpOpts,
};

/// Canonical proxy record. Field spelling follows the Clash Meta profile format so a record
/// serializes straight into the `proxies` list. Entries whose type tag is not listed here, or
/// that do not fit their typed view, fall back to [`Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Proxy {
    #[serde(rename = "vless")]
    Vless(Vless),
    #[serde(rename = "vmess")]
    Vmess(Vmess),
    #[serde(rename = "ss")]
    Shadowsocks(Shadowsocks),
    #[serde(rename = "hysteria")]
    Hysteria(Hysteria),
    #[serde(rename = "hysteria2")]
    Hysteria2(Hysteria2),
    #[serde(rename = "tuic")]
    Tuic(Tuic),
    #[serde(untagged)]
    Other(Other),
}

impl Proxy {
    pub fn type_name(&self) -> &str {
        match self {
            Proxy::Vless(_) => "vless",
            Proxy::Vmess(_) => "vmess",
            Proxy::Shadowsocks(_) => "ss",
            Proxy::Hysteria(_) => "hysteria",
            Proxy::Hysteria2(_) => "hysteria2",
            Proxy::Tuic(_) => "tuic",
            Proxy::Other(p) => &p.type_name,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Proxy::Vless(p) => &p.name,
            Proxy::Vmess(p) => &p.name,
            Proxy::Shadowsocks(p) => &p.name,
            Proxy::Hysteria(p) => &p.name,
            Proxy::Hysteria2(p) => &p.name,
            Proxy::Tuic(p) => &p.name,
            Proxy::Other(p) => &p.name,
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            Proxy::Vless(p) => p.name = name,
            Proxy::Vmess(p) => p.name = name,
            Proxy::Shadowsocks(p) => p.name = name,
            Proxy::Hysteria(p) => p.name = name,
            Proxy::Hysteria2(p) => p.name = name,
            Proxy::Tuic(p) => p.name = name,
            Proxy::Other(p) => p.name = name,
        }
    }

    pub fn server(&self) -> &str {
        match self {
            Proxy::Vless(p) => &p.server,
            Proxy::Vmess(p) => &p.server,
            Proxy::Shadowsocks(p) => &p.server,
            Proxy::Hysteria(p) => &p.server,
            Proxy::Hysteria2(p) => &p.server,
            Proxy::Tuic(p) => &p.server,
            Proxy::Other(p) => &p.server,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Proxy::Vless(p) => p.port,
            Proxy::Vmess(p) => p.port,
            Proxy::Shadowsocks(p) => p.port,
            Proxy::Hysteria(p) => p.port,
            Proxy::Hysteria2(p) => p.port,
            Proxy::Tuic(p) => p.port,
            Proxy::Other(p) => p.port,
        }
    }

    /// Transport name for the protocols that have one.
    pub fn network(&self) -> Option<&str> {
        match self {
            Proxy::Vless(p) => p.network.as_deref(),
            Proxy::Vmess(p) => p.network.as_deref(),
            _ => None,
        }
    }

    /// Host header of the websocket transport, if configured.
    pub fn ws_host(&self) -> Option<&str> {
        match self {
            Proxy::Vless(p) => p.ws_opts.as_ref().and_then(WsOpts::host),
            Proxy::Vmess(p) => p.ws_opts.as_ref().and_then(WsOpts::host),
            _ => None,
        }
    }
}

/// Deduplication identity of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey(String);

impl UniqueKey {
    /// `<server>:<port>-<type>`
    pub fn typed(server: &str, port: u16, type_name: &str) -> Self {
        UniqueKey(format!("{}:{}-{}", server, port, type_name))
    }

    /// `<server>:<port>-<host>-ws`, for endpoints routed by websocket host header.
    pub fn ws_host(server: &str, port: u16, host: &str) -> Self {
        UniqueKey(format!("{}:{}-{}-ws", server, port, host))
    }

    pub fn for_proxy(proxy: &Proxy) -> Self {
        Self::typed(proxy.server(), proxy.port(), proxy.type_name())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
