use log::warn;
use std::env;
use std::str::FromStr;

/// Server configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface the HTTP server binds to
    pub bind_address: String,
    pub port: u16,
    /// SQLite database file
    pub database_path: String,
    /// Directory that receives uploaded files
    pub upload_dir: String,
    /// Public origin prepended to upload paths; empty keeps them relative
    pub base_url: String,
    /// Origin of the web client, used in password reset links
    pub frontend_url: String,
    /// Exact origins accepted by CORS in addition to the built-in list
    pub allowed_origins: Vec<String>,
    pub session_ttl_hours: i64,
    pub smtp: SmtpConfig,
    /// Admin account created on first start when no admin exists
    pub admin_seed: Option<AdminSeed>,
}

/// Outgoing mail settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

/// Credentials for the bootstrap admin
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "portfolio.db".to_string(),
            upload_dir: "./uploads".to_string(),
            base_url: String::new(),
            frontend_url: "http://localhost:3001".to_string(),
            allowed_origins: Vec::new(),
            session_ttl_hours: 24,
            smtp: SmtpConfig::default(),
            admin_seed: None,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from: "MySE Portfolio <noreply@localhost>".to_string(),
        }
    }
}

impl SmtpConfig {
    /// Whether enough is configured to actually deliver mail
    pub fn is_configured(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let admin_seed = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(AdminSeed { email: email.trim().to_string(), password })
            }
            _ => None,
        };

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().trim_end_matches('/').to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bind_address: text("BIND_ADDRESS", defaults.bind_address),
            port: parse_or(&lookup, "PORT", defaults.port),
            database_path: text("DATABASE_PATH", defaults.database_path),
            upload_dir: text("UPLOAD_DIR", defaults.upload_dir),
            base_url: text("BASE_URL", defaults.base_url).trim_end_matches('/').to_string(),
            frontend_url: text("FRONTEND_URL", defaults.frontend_url)
                .trim_end_matches('/')
                .to_string(),
            allowed_origins,
            session_ttl_hours: parse_or(&lookup, "SESSION_TTL_HOURS", defaults.session_ttl_hours),
            smtp: SmtpConfig {
                host: text("SMTP_HOST", defaults.smtp.host),
                port: parse_or(&lookup, "SMTP_PORT", defaults.smtp.port),
                user: text("SMTP_USER", defaults.smtp.user),
                password: lookup("SMTP_PASSWORD").unwrap_or(defaults.smtp.password),
                from: text("SMTP_FROM", defaults.smtp.from),
            },
            admin_seed,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid value {:?} for {}, using {}", raw, key, default);
                default
            }
        },
        _ => default,
    }
}
