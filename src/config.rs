//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Which inference backend serves invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamKind {
    /// AWS Bedrock runtime API
    Bedrock,
    /// Local development backend that echoes the prompt
    Echo,
}

/// Which payment processor sells credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Stripe,
    /// Instantly "completes" checkouts, for development
    Dummy,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required): HMAC secret for dashboard session tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `API_BASE_URL` (optional): public base URL used for callback and checkout URLs
/// - `UPSTREAM_PROVIDER` (optional): `bedrock` or `echo`, defaults to `bedrock`
/// - `AWS_REGION`, `BEDROCK_ENDPOINT`, `BEDROCK_API_KEY`, `UPSTREAM_TIMEOUT_SECS`
/// - `PAYMENT_PROVIDER` (optional): `stripe` or `dummy`, defaults to `dummy`
/// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`, `STRIPE_PRICE_ID` (a 1 US-cent unit price)
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub jwt_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_upstream_provider")]
    pub upstream_provider: UpstreamKind,

    #[serde(default = "default_aws_region")]
    pub aws_region: String,

    /// Overrides `https://bedrock-runtime.{region}.amazonaws.com`
    pub bedrock_endpoint: Option<String>,

    pub bedrock_api_key: Option<String>,

    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    #[serde(default = "default_payment_provider")]
    pub payment_provider: PaymentKind,

    pub stripe_secret_key: Option<String>,

    pub stripe_webhook_secret: Option<String>,

    /// Price sold once per credit, so the checkout quantity is the credit count
    pub stripe_price_id: Option<String>,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_api_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_upstream_provider() -> UpstreamKind {
    UpstreamKind::Bedrock
}

fn default_aws_region() -> String {
    "us-west-1".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    120
}

fn default_payment_provider() -> PaymentKind {
    PaymentKind::Dummy
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL, JWT_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Bedrock runtime base URL for the configured region.
    pub fn bedrock_endpoint(&self) -> String {
        self.bedrock_endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-runtime.{}.amazonaws.com", self.aws_region)
        })
    }
}
