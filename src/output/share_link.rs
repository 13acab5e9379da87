use std::fmt::Write as _;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{error, info};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::proxy::{Hysteria, Hysteria2, Proxy, Shadowsocks, Tuic, Vless, Vmess};

/// Assembles `scheme://[userinfo@]host:port[/]?query#name`.
struct ShareLink {
    scheme: &'static str,
    userinfo: Option<String>,
    host: String,
    port: u16,
    slash: bool,
    query: Vec<String>,
    name: String,
}

impl ShareLink {
    fn new(scheme: &'static str, host: &str, port: u16, name: &str) -> Result<Self> {
        if host.is_empty() || port == 0 {
            return Err(Error::InvalidEndpoint(format!("{}:{}", host, port)));
        }
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        Ok(Self {
            scheme,
            userinfo: None,
            host,
            port,
            slash: false,
            query: Vec::new(),
            name: name.to_string(),
        })
    }

    fn user(mut self, user: &str) -> Self {
        self.userinfo = Some(urlencoding::encode(user).into_owned());
        self
    }

    fn user_pass(mut self, user: &str, pass: &str) -> Self {
        self.userinfo = Some(format!(
            "{}:{}",
            urlencoding::encode(user),
            urlencoding::encode(pass)
        ));
        self
    }

    fn raw_user(mut self, userinfo: String) -> Self {
        self.userinfo = Some(userinfo);
        self
    }

    fn with_slash(mut self) -> Self {
        self.slash = true;
        self
    }

    /// Values are percent-encoded (`%20`, never `+`).
    fn param(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.query.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value.as_ref())
        ));
        self
    }

    fn flag(self, key: &str, value: bool) -> Self {
        self.param(key, if value { "1" } else { "0" })
    }

    fn finish(self) -> String {
        let mut link = format!("{}://", self.scheme);
        if let Some(userinfo) = &self.userinfo {
            let _ = write!(link, "{}@", userinfo);
        }
        let _ = write!(link, "{}:{}", self.host, self.port);
        if self.slash {
            link.push('/');
        }
        if !self.query.is_empty() {
            link.push('?');
            link.push_str(&self.query.join("&"));
        }
        link.push('#');
        link.push_str(&urlencoding::encode(&self.name));
        link
    }
}

/// Encodes one record as a client-importable share link.
pub fn share_link(proxy: &Proxy) -> Result<String> {
    match proxy {
        Proxy::Vless(p) => vless(p),
        Proxy::Vmess(p) => vmess(p),
        Proxy::Shadowsocks(p) => shadowsocks(p),
        Proxy::Hysteria(p) => hysteria(p),
        Proxy::Hysteria2(p) => hysteria2(p),
        Proxy::Tuic(p) => tuic(p),
        Proxy::Other(p) => Err(Error::UnsupportedProtocol(p.type_name.clone())),
    }
}

fn vless(p: &Vless) -> Result<String> {
    let network = p.network.as_deref().unwrap_or("tcp");
    let flow = p.flow.as_deref().unwrap_or_default();
    let service_name = p
        .grpc_opts
        .as_ref()
        .map(|o| o.service_name.as_str())
        .unwrap_or_default();
    let host = p.ws_opts.as_ref().and_then(|o| o.host()).unwrap_or_default();
    let path = if network == "xhttp" {
        p.xhttp_opts.as_ref().map(|o| o.path.as_str())
    } else {
        p.ws_opts.as_ref().map(|o| o.path.as_str())
    }
    .unwrap_or_default();
    let sni = p.servername.as_deref().unwrap_or_default();
    let fp = p.client_fingerprint.as_deref().unwrap_or_default();

    let link = ShareLink::new("vless", &p.server, p.port, &p.name)?
        .user(&p.uuid)
        .param("encryption", "none")
        .param("flow", flow);

    let link = match (&p.reality_opts, p.tls) {
        (_, false) => link.param("security", "none"),
        (Some(reality), true) => link
            .param("security", "reality")
            .param("sni", sni)
            .param("fp", fp)
            .param("pbk", &reality.public_key)
            .param("sid", &reality.short_id),
        (None, true) => link
            .param("security", "tls")
            .param("sni", sni)
            .param("fp", fp)
            .flag("insecure", p.skip_cert_verify.unwrap_or(false)),
    };

    Ok(link
        .param("type", network)
        .param("serviceName", service_name)
        .param("host", host)
        .param("path", path)
        .finish())
}

#[derive(Serialize)]
struct VmessShare<'a> {
    v: &'a str,
    ps: &'a str,
    add: &'a str,
    port: u16,
    id: &'a str,
    aid: u32,
    net: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    host: String,
    path: &'a str,
    tls: &'a str,
    sni: &'a str,
    alpn: &'a str,
}

fn vmess(p: &Vmess) -> Result<String> {
    if p.server.is_empty() || p.port == 0 {
        return Err(Error::InvalidEndpoint(format!("{}:{}", p.server, p.port)));
    }
    let network = p.network.as_deref().unwrap_or("tcp");
    // 传输方式 -> (type, host, path)
    let (kind, host, path) = match network {
        "ws" => {
            let ws = p.ws_opts.as_ref();
            (
                "none",
                ws.and_then(|o| o.host()).unwrap_or_default().to_string(),
                ws.map(|o| o.path.as_str()).unwrap_or_default(),
            )
        }
        "grpc" => (
            "gun",
            String::new(),
            p.grpc_opts
                .as_ref()
                .map(|o| o.service_name.as_str())
                .unwrap_or_default(),
        ),
        "h2" => {
            let h2 = p.h2_opts.as_ref();
            (
                "none",
                h2.map(|o| o.host.join(",")).unwrap_or_default(),
                h2.map(|o| o.path.as_str()).unwrap_or_default(),
            )
        }
        _ => ("none", String::new(), ""),
    };

    let meta = VmessShare {
        v: "2",
        ps: &p.name,
        add: &p.server,
        port: p.port,
        id: &p.uuid,
        aid: p.alter_id,
        net: network,
        kind,
        host,
        path,
        tls: if p.tls { "tls" } else { "" },
        sni: p.servername.as_deref().unwrap_or_default(),
        alpn: "",
    };
    let body = serde_json::to_vec(&meta)?;
    Ok(format!("vmess://{}", STANDARD.encode(body)))
}

fn shadowsocks(p: &Shadowsocks) -> Result<String> {
    let userinfo = STANDARD.encode(format!("{}:{}", p.cipher, p.password));
    Ok(ShareLink::new("ss", &p.server, p.port, &p.name)?
        .raw_user(userinfo)
        .finish())
}

fn hysteria(p: &Hysteria) -> Result<String> {
    Ok(ShareLink::new("hysteria", &p.server, p.port, &p.name)?
        .with_slash()
        .param("protocol", p.protocol.as_deref().unwrap_or("udp"))
        .flag("insecure", p.skip_cert_verify)
        .param("peer", p.sni.as_deref().unwrap_or_default())
        .param("auth", p.auth_str.as_deref().unwrap_or_default())
        .param(
            "upmbps",
            p.up.as_ref().map_or_else(|| "11".to_string(), ToString::to_string),
        )
        .param(
            "downmbps",
            p.down.as_ref().map_or_else(|| "55".to_string(), ToString::to_string),
        )
        .param("alpn", p.alpn.join(","))
        .param("obfs", p.obfs.as_deref().unwrap_or_default())
        .finish())
}

fn hysteria2(p: &Hysteria2) -> Result<String> {
    let mut link = ShareLink::new("hysteria2", &p.server, p.port, &p.name)?
        .user(&p.password)
        .with_slash()
        .param("sni", p.sni.as_deref().unwrap_or_default())
        .flag("insecure", p.skip_cert_verify);
    if let Some(obfs) = p.obfs.as_deref().filter(|o| !o.is_empty()) {
        link = link
            .param("obfs", obfs)
            .param("obfs-password", p.obfs_password.as_deref().unwrap_or_default());
    }
    Ok(link.finish())
}

fn tuic(p: &Tuic) -> Result<String> {
    Ok(ShareLink::new("tuic", &p.server, p.port, &p.name)?
        .user_pass(&p.uuid, &p.password)
        .param("sni", &p.sni)
        .param("alpn", p.alpn.join(","))
        .flag("allow_insecure", p.skip_cert_verify)
        .param("congestion_control", &p.congestion_controller)
        .param("udp_relay_mode", &p.udp_relay_mode)
        .flag("reduce_rtt", p.reduce_rtt)
        .finish())
}

/// Writes one share link per line; records that cannot be encoded are logged and left out.
pub fn write_share_links<P: AsRef<Path>>(path: P, proxies: &[Proxy]) -> Result<usize> {
    let mut links = Vec::with_capacity(proxies.len());
    for proxy in proxies {
        match share_link(proxy) {
            Ok(link) => links.push(link),
            Err(e) => error!("[ShareLink] skipping {}: {}", proxy.name(), e),
        }
    }

    let mut text = links.join("\n");
    text.push('\n');
    std::fs::write(path.as_ref(), text)?;
    info!(
        "[ShareLink] wrote {} links to {}",
        links.len(),
        path.as_ref().display()
    );
    Ok(links.len())
}
