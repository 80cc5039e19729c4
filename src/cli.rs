use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::config::SandboxConfigOverrides;

const DEFAULT_CONFIG_PATH: &str = "pinchbox.json";
const DEFAULT_PORT: u16 = 3000;

/// Flags of the headless sandbox host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxArgs {
    pub config_path: PathBuf,
    pub recording: Option<PathBuf>,
    pub max_frames: Option<usize>,
    snapshot_path: Option<PathBuf>,
    user_id: Option<String>,
    endpoint: Option<String>,
}

impl Default for SandboxArgs {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            recording: None,
            max_frames: None,
            snapshot_path: None,
            user_id: None,
            endpoint: None,
        }
    }
}

impl SandboxArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = SandboxArgs::default();
        for (flag, value) in flag_pairs(args)? {
            match flag.as_str() {
                "config" => parsed.config_path = PathBuf::from(value),
                "recording" => parsed.recording = Some(PathBuf::from(value)),
                "snapshot" => parsed.snapshot_path = Some(PathBuf::from(value)),
                "user" => parsed.user_id = Some(value),
                "endpoint" => parsed.endpoint = Some(value),
                "frames" => {
                    parsed.max_frames = Some(
                        value
                            .parse::<usize>()
                            .with_context(|| format!("Invalid frame count '{value}'"))?,
                    );
                }
                _ => bail!(
                    "Unknown flag '--{flag}'. Supported flags: --config, --recording, \
                     --snapshot, --frames, --user, --endpoint."
                ),
            }
        }
        Ok(parsed)
    }

    pub fn config_overrides(&self) -> SandboxConfigOverrides {
        SandboxConfigOverrides {
            snapshot_path: self.snapshot_path.clone(),
            user_id: self.user_id.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Flags of the menu-content server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerArgs {
    pub port: u16,
    /// Directory holding one `{userId}/database.json` per user.
    pub root: PathBuf,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            root: PathBuf::from("."),
        }
    }
}

impl ServerArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = ServerArgs::default();
        for (flag, value) in flag_pairs(args)? {
            match flag.as_str() {
                "port" => {
                    parsed.port = value
                        .parse::<u16>()
                        .with_context(|| format!("Invalid port '{value}'"))?;
                }
                "root" => parsed.root = PathBuf::from(value),
                _ => bail!("Unknown flag '--{flag}'. Supported flags: --port, --root."),
            }
        }
        Ok(parsed)
    }
}

/// Splits `--flag value` pairs, skipping the program name.
fn flag_pairs<I, S>(args: I) -> Result<Vec<(String, String)>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pairs = Vec::new();
    let mut iter = args.into_iter();
    let _ = iter.next();

    while let Some(raw_flag) = iter.next() {
        let flag = raw_flag.as_ref();
        let Some(key) = flag.strip_prefix("--") else {
            bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
        };
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?
            .as_ref()
            .to_string();
        pairs.push((key.to_string(), value));
    }

    Ok(pairs)
}
