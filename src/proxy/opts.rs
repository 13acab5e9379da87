use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Vless {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_port")]
    pub port: u16,
    #[serde(default, deserialize_with = "scalar_string")]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOpts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOpts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOpts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xhttp_opts: Option<XhttpOpts>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Vmess {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_port")]
    pub port: u16,
    #[serde(default, deserialize_with = "scalar_string")]
    pub uuid: String,
    #[serde(rename = "alterId", default)]
    pub alter_id: u32,
    #[serde(default = "default_cipher")]
    pub cipher: String,
    #[serde(default)]
    pub tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOpts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOpts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Opts>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shadowsocks {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_port")]
    pub port: u16,
    #[serde(default, deserialize_with = "scalar_string")]
    pub cipher: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hysteria {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,
    #[serde(
        alias = "auth_str",
        default,
        deserialize_with = "opt_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<Bandwidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<Bandwidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default)]
    pub skip_cert_verify: bool,
    #[serde(default)]
    pub alpn: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hysteria2 {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_port")]
    pub port: u16,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default)]
    pub skip_cert_verify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// TUIC entries always carry every field, defaults filled in when the source omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tuic {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_port")]
    pub port: u16,
    #[serde(default, deserialize_with = "scalar_string")]
    pub uuid: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: String,
    #[serde(default)]
    pub sni: String,
    #[serde(default)]
    pub alpn: Vec<String>,
    #[serde(default)]
    pub skip_cert_verify: bool,
    #[serde(default = "default_udp_relay_mode")]
    pub udp_relay_mode: String,
    #[serde(default = "default_congestion_controller")]
    pub congestion_controller: String,
    #[serde(default)]
    pub reduce_rtt: bool,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WsOpts {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl WsOpts {
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get("host")
            .or_else(|| self.headers.get("Host"))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrpcOpts {
    #[serde(rename = "grpc-service-name", alias = "serviceName", default)]
    pub service_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct H2Opts {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub host: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RealityOpts {
    pub public_key: String,
    #[serde(default)]
    pub short_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XhttpOpts {
    #[serde(default)]
    pub path: String,
}

/// Hopping ports: a single port or a range string such as `20000-30000`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ports {
    Single(u16),
    Range(String),
}

impl Ports {
    pub fn parse(segment: &str) -> Self {
        let segment = segment.trim();
        match segment.parse::<u16>() {
            Ok(port) => Ports::Single(port),
            Err(_) => Ports::Range(segment.to_string()),
        }
    }
}

impl fmt::Display for Ports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ports::Single(port) => write!(f, "{}", port),
            Ports::Range(range) => f.write_str(range),
        }
    }
}

/// Bandwidth hint, either plain Mbps or a unit-suffixed string (`"30 Mbps"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bandwidth {
    Mbps(u64),
    Text(String),
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bandwidth::Mbps(v) => write!(f, "{}", v),
            Bandwidth::Text(v) => f.write_str(v),
        }
    }
}

/// Entry of a type this crate does not model. Only the endpoint is read; every other key is
/// carried through untouched so it still reaches the profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Other {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_port")]
    pub port: u16,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Subscriptions routinely write passwords and ports as bare YAML numbers or quoted strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(v) => f.write_str(v),
            Scalar::Unsigned(v) => write!(f, "{}", v),
            Scalar::Signed(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
        }
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Scalar::deserialize(deserializer)?.to_string())
}

fn opt_scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|v| v.to_string()))
}

fn scalar_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let value = Scalar::deserialize(deserializer)?;
    let port = match &value {
        Scalar::Unsigned(v) => u16::try_from(*v).ok(),
        Scalar::Signed(v) => u16::try_from(*v).ok(),
        Scalar::Text(v) => v.trim().parse().ok(),
        Scalar::Float(_) | Scalar::Bool(_) => None,
    };
    port.ok_or_else(|| D::Error::custom(format!("invalid port: {}", value)))
}

fn default_cipher() -> String {
    "auto".to_string()
}

fn default_udp_relay_mode() -> String {
    "native".to_string()
}

fn default_congestion_controller() -> String {
    "bbr".to_string()
}
