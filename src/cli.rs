//! Command-line interface definitions for the deep-sea trend bot.
//!
//! Every secret and endpoint can be given as a flag or through the
//! environment variable named next to it. The keyword list and run policies
//! live in the optional YAML trend profile (see [`crate::config`]).

use crate::utils::redact;
use clap::Parser;
use tracing::info;

/// Command-line arguments for the trend bot.
///
/// # Examples
///
/// ```sh
/// # Serve the trigger endpoints and collect every hour
/// deepsea_trends
///
/// # Custom keyword profile, single run, then exit
/// deepsea_trends --config profile.yaml --once
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML trend profile (keywords, limits, failure policies)
    #[arg(short, long, env = "TREND_PROFILE")]
    pub config: Option<String>,

    /// Twitter API v2 app-only bearer token
    #[arg(long, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    pub twitter_bearer_token: String,

    /// Sender address, also used as the SMTP login
    #[arg(long, env = "EMAIL_ADDRESS")]
    pub email_address: String,

    /// SMTP password (for Gmail, an app password)
    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub email_password: String,

    /// Digest recipient address
    #[arg(long, env = "EMAIL_RECEIVER")]
    pub email_receiver: String,

    /// SMTP relay, reached over implicit TLS on port 465
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// Name of the Google spreadsheet to append to
    #[arg(long, env = "GOOGLE_SHEET_NAME")]
    pub sheet_name: String,

    /// Spreadsheet id; skips the lookup by name when set
    #[arg(long, env = "GOOGLE_SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// Service-account JSON key file
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE", default_value = "credentials.json")]
    pub credentials_file: String,

    /// Address the HTTP server binds to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server binds to
    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    /// Run a single collection and exit instead of serving
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    pub fn log_redacted(&self) {
        info!(
            config = ?self.config,
            twitter_bearer_token = %redact(&self.twitter_bearer_token),
            email_address = %self.email_address,
            email_password = %redact(&self.email_password),
            email_receiver = %self.email_receiver,
            smtp_host = %self.smtp_host,
            sheet_name = %self.sheet_name,
            spreadsheet_id = ?self.spreadsheet_id,
            credentials_file = %self.credentials_file,
            "Configuration loaded"
        );
    }
}
