use crate::infra::LineParsePolicy;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

pub const SESSIONS_DIR_ENV: &str = "AGENTOPS_SESSIONS_DIR";
pub const STATIC_DIR_ENV: &str = "AGENTOPS_STATIC_DIR";
pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_PORT: u16 = 8000;

pub const USAGE: &str = "\
usage: agentops [serve] [options]

options:
  --sessions-dir DIR   directory holding sessions.json and *.jsonl logs
                       (env AGENTOPS_SESSIONS_DIR, default ~/.openclaw/agents/main/sessions)
  --host ADDR          bind address (default 0.0.0.0)
  --port N             bind port (env PORT, default 8000)
  --static-dir DIR     serve a built frontend from DIR (env AGENTOPS_STATIC_DIR)
  --lenient            skip malformed log lines instead of failing the request
  -h, --help           print this help";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub sessions_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub line_policy: LineParsePolicy,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Serve(ServerConfig),
    Help,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("home directory not found; pass --sessions-dir")]
    HomeDirNotFound,

    #[error("missing value for {0}")]
    MissingValue(&'static str),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid host: {0}")]
    InvalidHost(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Default location of the agent runtime's sessions directory.
pub fn resolve_sessions_dir(
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(override_dir) = env(SESSIONS_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(override_dir));
    }

    let Some(home) = dirs::home_dir() else {
        return Err(ConfigError::HomeDirNotFound);
    };
    Ok(home
        .join(".openclaw")
        .join("agents")
        .join("main")
        .join("sessions"))
}

/// Parses `argv` (program name first). Flags win over environment variables.
pub fn parse_args(
    argv: &[String],
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<CliCommand, ConfigError> {
    let mut args = argv.iter().skip(1).map(String::as_str).peekable();
    if args.peek() == Some(&"serve") {
        args.next();
    }

    let mut sessions_dir: Option<PathBuf> = None;
    let mut static_dir: Option<PathBuf> = env(STATIC_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);
    let mut host = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    let mut port = match env(PORT_ENV) {
        Some(raw) => parse_port(&raw)?,
        None => DEFAULT_PORT,
    };
    let mut line_policy = LineParsePolicy::Strict;

    while let Some(arg) = args.next() {
        match arg {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "--sessions-dir" => {
                let value = args.next().ok_or(ConfigError::MissingValue("--sessions-dir"))?;
                sessions_dir = Some(PathBuf::from(value));
            }
            "--static-dir" => {
                let value = args.next().ok_or(ConfigError::MissingValue("--static-dir"))?;
                static_dir = Some(PathBuf::from(value));
            }
            "--host" => {
                let value = args.next().ok_or(ConfigError::MissingValue("--host"))?;
                host = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidHost(value.to_string()))?;
            }
            "--port" => {
                let value = args.next().ok_or(ConfigError::MissingValue("--port"))?;
                port = parse_port(value)?;
            }
            "--lenient" => line_policy = LineParsePolicy::Lenient,
            other => return Err(ConfigError::UnknownArgument(other.to_string())),
        }
    }

    let sessions_dir = match sessions_dir {
        Some(dir) => dir,
        None => resolve_sessions_dir(env)?,
    };

    Ok(CliCommand::Serve(ServerConfig {
        bind: SocketAddr::new(host, port),
        sessions_dir,
        static_dir,
        line_policy,
    }))
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}
