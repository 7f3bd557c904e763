use std::{path::PathBuf, str::FromStr};

use anyhow::Context;

/// Static site details shown in the footer and on the contact page.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub name: String,
    pub tagline: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        SiteInfo {
            name: "Hotel Serenity".to_owned(),
            tagline: "Rest easy, stay longer.".to_owned(),
            address: "12 Harbour Road".to_owned(),
            phone: "+1 555 0100".to_owned(),
            email: "stay@example.com".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub public_key: String,
    pub booking_template: String,
    pub contact_template: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub public_url: String,
    pub storage_dir: PathBuf,
    pub admin_emails: Vec<String>,
    pub session_inactivity_minutes: i64,
    pub dashboard_poll_seconds: u64,
    pub oauth_clients_file: Option<PathBuf>,
    pub emailjs: Option<EmailJsConfig>,
    pub site: SiteInfo,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite://hotelbook.db?mode=rwc".to_owned(),
            bind_addr: "0.0.0.0:8080".to_owned(),
            public_url: "http://localhost:8080".to_owned(),
            storage_dir: PathBuf::from("storage"),
            admin_emails: Vec::new(),
            session_inactivity_minutes: 2,
            dashboard_poll_seconds: 3,
            oauth_clients_file: None,
            emailjs: None,
            site: SiteInfo::default(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    dotenv::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(v) => v.trim().parse().with_context(|| format!("invalid {key}: {v}")),
        None => Ok(default),
    }
}

impl Config {
    /// Reads `.env` and the process environment. Missing keys fall back to defaults.
    pub fn from_env() -> anyhow::Result<Config> {
        let defaults = Config::default();
        let site = SiteInfo {
            name: var("SITE_NAME").unwrap_or(defaults.site.name),
            tagline: var("SITE_TAGLINE").unwrap_or(defaults.site.tagline),
            address: var("SITE_ADDRESS").unwrap_or(defaults.site.address),
            phone: var("SITE_PHONE").unwrap_or(defaults.site.phone),
            email: var("SITE_EMAIL").unwrap_or(defaults.site.email),
        };

        let emailjs = match (var("EMAILJS_SERVICE_ID"), var("EMAILJS_PUBLIC_KEY")) {
            (Some(service_id), Some(public_key)) => Some(EmailJsConfig {
                service_id,
                public_key,
                booking_template: var("EMAILJS_BOOKING_TEMPLATE").unwrap_or("booking".to_owned()),
                contact_template: var("EMAILJS_CONTACT_TEMPLATE").unwrap_or("contact".to_owned()),
            }),
            _ => None,
        };

        Ok(Config {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_url: var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.public_url),
            storage_dir: var("STORAGE_DIR").map(PathBuf::from).unwrap_or(defaults.storage_dir),
            admin_emails: var("ADMIN_EMAILS")
                .map(|list| parse_email_list(&list))
                .unwrap_or_default(),
            session_inactivity_minutes: parsed("SESSION_INACTIVITY_MINUTES", defaults.session_inactivity_minutes)?,
            dashboard_poll_seconds: parsed("DASHBOARD_POLL_SECONDS", defaults.dashboard_poll_seconds)?,
            oauth_clients_file: var("OAUTH_CLIENTS_FILE").map(PathBuf::from),
            emailjs,
            site,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn parse_email_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}
