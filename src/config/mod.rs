use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub members: MembersConfig,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub uploads: UploadsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of this service, used to build gateway callback URLs.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_duration_hours: i64,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub store_id: String,
    pub store_password: String,
    #[serde(default)]
    pub is_live: bool,
    pub sandbox_url: String,
    pub live_url: String,
    pub currency: String,
    pub timeout_secs: u64,
    /// Cross-check success callbacks against the validation endpoint.
    pub verify_callbacks: bool,
    /// Allowed difference, in major currency units, between paid and expected amounts.
    pub amount_tolerance: i64,
}

impl GatewayConfig {
    pub fn api_base(&self) -> &str {
        if self.is_live {
            &self.live_url
        } else {
            &self.sandbox_url
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontendConfig {
    pub url: String,
    /// Shown in notification emails.
    #[serde(default = "default_organization_name")]
    pub organization_name: String,
}

fn default_organization_name() -> String {
    "Fundline".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MembersConfig {
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub require_completed_payment_for_approval: bool,
}

impl Default for MembersConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
            require_completed_payment_for_approval: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    pub dir: String,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self { dir: "uploads".to_string() }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.base_url", "http://localhost:5000")?
            .set_default("database.url", "sqlite://fundline.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("auth.secure_cookies", false)?
            .set_default("gateway.store_id", "")?
            .set_default("gateway.store_password", "")?
            .set_default("gateway.is_live", false)?
            .set_default("gateway.sandbox_url", "https://sandbox.sslcommerz.com")?
            .set_default("gateway.live_url", "https://securepay.sslcommerz.com")?
            .set_default("gateway.currency", "BDT")?
            .set_default("gateway.timeout_secs", 30)?
            .set_default("gateway.verify_callbacks", true)?
            .set_default("gateway.amount_tolerance", 1)?
            .set_default("frontend.url", "http://localhost:3000")?
            .set_default("frontend.organization_name", "Fundline")?
            .set_default("members.session_ttl_hours", 24)?
            .set_default("members.require_completed_payment_for_approval", false)?
            .set_default("uploads.dir", "uploads")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with FUNDLINE__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("FUNDLINE").separator("__"))

            .build()?;

        config.try_deserialize()
    }

    pub fn callback_url(&self, flow_path: &str, outcome: &str) -> String {
        format!(
            "{}/api/v1/{}/payment/{}",
            self.server.base_url.trim_end_matches('/'),
            flow_path,
            outcome
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                base_url: "http://localhost:5000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://fundline.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                session_duration_hours: 24,
                secure_cookies: false,
            },
            gateway: GatewayConfig {
                store_id: String::new(),
                store_password: String::new(),
                is_live: false,
                sandbox_url: "https://sandbox.sslcommerz.com".to_string(),
                live_url: "https://securepay.sslcommerz.com".to_string(),
                currency: "BDT".to_string(),
                timeout_secs: 30,
                verify_callbacks: true,
                amount_tolerance: 1,
            },
            frontend: FrontendConfig {
                url: "http://localhost:3000".to_string(),
                organization_name: default_organization_name(),
            },
            members: MembersConfig::default(),
            smtp: None,
            uploads: UploadsConfig::default(),
        }
    }
}
