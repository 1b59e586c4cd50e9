// Server configuration, read from flags with environment fallbacks.
// main() loads a .env file first, so secrets like GEMINI_API_KEY can live there.

use clap::builder::NonEmptyStringValueParser;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SIGN_IN_URL: &str = "/sign-in";

/// Path prefixes that require a signed-in session.
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/chat",
    "/pro-chat",
    "/code",
    "/image",
    "/video",
    "/music",
];

/// How long the "copied" acknowledgement stays on a turn.
pub const COPY_ACK_MS: u64 = 2000;

#[derive(clap::Args, Debug, Clone)]
pub struct ServerConfig {
    /// API key for the generative language service.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    pub api_key: String,

    /// Model used for every completion.
    #[arg(long, env = "NEST_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the generative language service.
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Port for the web server.
    #[arg(long, env = "NEST_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Where anonymous visitors of protected pages are sent.
    #[arg(long, env = "NEST_SIGN_IN_URL", default_value = DEFAULT_SIGN_IN_URL)]
    pub sign_in_url: String,

    /// Accepted sessions as TOKEN=USER; repeat or separate with commas.
    #[arg(long = "session", env = "NEST_SESSIONS", value_delimiter = ',', value_parser = parse_session)]
    pub sessions: Vec<(String, String)>,

    /// Path prefixes that require a session.
    #[arg(
        long = "protect",
        env = "NEST_PROTECTED_PREFIXES",
        value_delimiter = ',',
        default_values_t = DEFAULT_PROTECTED_PREFIXES.iter().map(|p| p.to_string()).collect::<Vec<_>>()
    )]
    pub protected_prefixes: Vec<String>,

    /// Directory holding the page templates.
    #[arg(long = "templates", env = "NEST_TEMPLATES", default_value = "templates")]
    pub templates_dir: PathBuf,

    /// Directory served under /static.
    #[arg(long, env = "NEST_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

fn parse_session(raw: &str) -> Result<(String, String), String> {
    let (token, user) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TOKEN=USER, got '{}'", raw))?;
    let (token, user) = (token.trim(), user.trim());
    if token.is_empty() || user.is_empty() {
        return Err(format!("expected TOKEN=USER, got '{}'", raw));
    }
    Ok((token.to_string(), user.to_string()))
}
