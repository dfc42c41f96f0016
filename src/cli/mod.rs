use clap::{ Args as ClapArgs, Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the streaming chat relay over HTTP(S).
    Serve(ServeArgs),
    /// Open an interactive chat session against a running relay.
    Chat(ChatArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the relay to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Path the relay answers on (POST for chat, OPTIONS for pre-flight).
    #[arg(long, env = "RELAY_ROUTE", default_value = "/ai-chat")]
    pub route: String,

    // --- Upstream Chat Provider Args ---
    /// Full URL of the upstream chat-completions endpoint.
    #[arg(
        long,
        env = "CHAT_BASE_URL",
        default_value = "https://ai.gateway.lovable.dev/v1/chat/completions"
    )]
    pub chat_base_url: String,

    /// API Key sent to the upstream provider. Requests fail with a generic 500 while unset.
    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    pub chat_api_key: Option<String>,

    /// Model name requested from the upstream provider.
    #[arg(long, env = "CHAT_MODEL", default_value = "google/gemini-3-flash-preview")]
    pub chat_model: String,

    /// Optional text file replacing the built-in assistant persona.
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<String>,

    // --- TLS Args ---
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    /// Full URL of the relay route.
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:4000/ai-chat")]
    pub relay_url: String,

    /// Bearer token presented to the platform hosting the relay.
    #[arg(long, env = "RELAY_TOKEN", hide_env_values = true)]
    pub relay_token: Option<String>,

    /// Further reads a malformed data frame may wait for before the turn fails.
    #[arg(long, env = "MAX_FRAME_RETRIES", default_value = "3")]
    pub max_frame_retries: u32,

    /// Seconds to wait for the relay to start answering. Unbounded when unset.
    #[arg(long, env = "CHAT_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Opening assistant message. Pass an empty string to start silent.
    #[arg(long, env = "CHAT_GREETING")]
    pub greeting: Option<String>,
}
