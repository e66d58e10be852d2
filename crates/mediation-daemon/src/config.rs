//! Daemon configuration.
//!
//! Command-line flags (each also readable from the environment) override the
//! optional TOML file. The registration envelope comes from the file's
//! `[[probes]]` entries.
//!
//! ```toml
//! backoff_secs = 10
//!
//! [endpoint]
//! server_address = "10.10.173.154:8080"
//! local_address = "http://10.10.173.10"
//! username = "administrator"
//!
//! [[probes]]
//! probe_type = "Kubernetes"
//! probe_category = "Container"
//!
//! [[probes.account_definitions]]
//! name = "masterAddress"
//! mandatory = true
//! ```

use anyhow::{Context, bail};
use clap::Parser;
use mediation_client::DEFAULT_BACKOFF;
use mediation_core::{AccountDefEntry, ClientMessage, ContainerInfo, Endpoint, ProbeInfo};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "mediation-daemon", version, about = "Remote mediation probe daemon")]
pub struct Args {
    /// Mediation server `host[:port]`.
    #[arg(long, env = "MEDIATION_SERVER_ADDRESS")]
    pub server_address: Option<String>,

    /// Local address presented as the handshake origin.
    #[arg(long, env = "MEDIATION_LOCAL_ADDRESS")]
    pub local_address: Option<String>,

    #[arg(long, env = "MEDIATION_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "MEDIATION_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// TOML file with endpoint defaults and the probes to register.
    #[arg(long, short, env = "MEDIATION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds to wait before reconnecting.
    #[arg(long, env = "MEDIATION_BACKOFF_SECS")]
    pub backoff_secs: Option<u64>,

    /// Run without a handler set; server requests are logged and dropped.
    #[arg(long)]
    pub no_handlers: bool,
}

/// Contents of the TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub endpoint: EndpointSection,
    pub backoff_secs: Option<u64>,
    #[serde(default)]
    pub probes: Vec<ProbeSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSection {
    pub server_address: Option<String>,
    pub local_address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSection {
    pub probe_type: String,
    pub probe_category: String,
    #[serde(default)]
    pub account_definitions: Vec<AccountDefinitionSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountDefinitionSection {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub secret: bool,
}

impl From<ProbeSection> for ProbeInfo {
    fn from(section: ProbeSection) -> Self {
        Self {
            probe_type: section.probe_type,
            probe_category: section.probe_category,
            account_definitions: section
                .account_definitions
                .into_iter()
                .map(|d| AccountDefEntry {
                    display_name: d.display_name.unwrap_or_else(|| d.name.clone()),
                    name: d.name,
                    description: d.description,
                    mandatory: d.mandatory,
                    secret: d.secret,
                })
                .collect(),
        }
    }
}

/// Everything the supervisor needs.
#[derive(Debug)]
pub struct Settings {
    pub endpoint: Endpoint,
    pub registration: ClientMessage,
    pub backoff: Duration,
    pub handlers: bool,
}

impl Settings {
    /// Read the config file named by `args`, if any, and merge.
    pub fn load(args: Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    pub fn resolve(args: Args, file: FileConfig) -> anyhow::Result<Self> {
        let section = file.endpoint;
        let Some(server_address) = args.server_address.or(section.server_address) else {
            bail!("server address is required (--server-address or [endpoint].server_address)");
        };
        let Some(username) = args.username.or(section.username) else {
            bail!("username is required (--username or [endpoint].username)");
        };
        let local_address = args.local_address.or(section.local_address).unwrap_or_default();
        let password = args.password.or(section.password).unwrap_or_default();

        let endpoint = Endpoint::new(server_address, local_address, username, password)
            .context("invalid endpoint")?;

        if file.probes.is_empty() {
            bail!("at least one [[probes]] entry is required to register");
        }
        let registration = ClientMessage::ContainerInfo(ContainerInfo {
            probes: file.probes.into_iter().map(ProbeInfo::from).collect(),
        });

        let backoff = args
            .backoff_secs
            .or(file.backoff_secs)
            .map_or(DEFAULT_BACKOFF, Duration::from_secs);

        Ok(Self {
            endpoint,
            registration,
            backoff,
            handlers: !args.no_handlers,
        })
    }
}

fn read_file(path: &Path) -> anyhow::Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}
