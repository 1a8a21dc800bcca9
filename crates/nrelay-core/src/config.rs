use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, pacing::PacingMode, Result};

/// Typed configuration, built once at startup and handed to each component.
#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub data_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub bootstrap_admin_password: Option<String>,

    // Dispatch
    pub dispatch_delay: Duration,
    pub pacing: PacingMode,
    pub http_timeout: Duration,

    // Channels / directory
    pub ldap: LdapConfig,
    pub telegram: TelegramConfig,
    pub email: EmailConfig,
    pub sms: SmsConfig,
}

#[derive(Clone, Debug)]
pub struct LdapConfig {
    pub enabled: bool,
    pub url: String,
    pub base_dn: String,
    pub target_group: String,
    /// Bind suffix including the leading `@`.
    pub domain_suffix: String,
    pub account_attr: String,
    pub group_attr: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    /// lettre SMTP URL (`smtp://`, `smtps://`); `None` uses unencrypted localhost.
    pub smtp_url: Option<String>,
    pub from: String,
    pub subject: String,
}

#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_token: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        // Non-UTF-8 variables are skipped rather than aborting startup.
        let vars: HashMap<String, String> = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::from_vars(&vars)
    }

    /// Build from an explicit variable map (what `load` does after reading the env).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).cloned();
        let get_bool = |key: &str| get(key).map(|s| parse_bool(&s));
        let get_u64 = |key: &str| get(key).and_then(|s| s.trim().parse::<u64>().ok());

        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "./data".to_string()));
        let templates_dir = get("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("templates"));
        let logs_dir = data_dir.join("logs");
        let bootstrap_admin_password = get("BOOTSTRAP_ADMIN_PASSWORD").and_then(non_empty);

        let dispatch_delay = Duration::from_millis(get_u64("DISPATCH_DELAY_MS").unwrap_or(100));
        let pacing = match get("DISPATCH_PACING").and_then(non_empty) {
            Some(raw) => raw.parse::<PacingMode>()?,
            None => PacingMode::default(),
        };
        let http_timeout = Duration::from_millis(get_u64("HTTP_TIMEOUT_MS").unwrap_or(10_000));

        // Directory
        let ldap = LdapConfig {
            enabled: get_bool("LDAP_ENABLED").unwrap_or(false),
            url: get("LDAP_URL").unwrap_or_else(|| "ldap://localhost:389".to_string()),
            base_dn: get("LDAP_BASE_DN").unwrap_or_default(),
            target_group: get("LDAP_GROUP").unwrap_or_default(),
            domain_suffix: normalize_domain(&get("LDAP_DOMAIN").unwrap_or_default()),
            account_attr: get("LDAP_ACCOUNT_ATTR")
                .and_then(non_empty)
                .unwrap_or_else(|| "sAMAccountName".to_string()),
            group_attr: get("LDAP_GROUP_ATTR")
                .and_then(non_empty)
                .unwrap_or_else(|| "memberOf".to_string()),
            timeout: Duration::from_millis(get_u64("LDAP_TIMEOUT_MS").unwrap_or(5_000)),
        };
        if ldap.enabled {
            for (key, value) in [
                ("LDAP_BASE_DN", &ldap.base_dn),
                ("LDAP_GROUP", &ldap.target_group),
                ("LDAP_DOMAIN", &ldap.domain_suffix),
            ] {
                if value.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "{key} is required when LDAP_ENABLED is set"
                    )));
                }
            }
        }

        let telegram = TelegramConfig {
            bot_token: get("TELEGRAM_BOT_TOKEN").unwrap_or_default().trim().to_string(),
            api_url: get("TELEGRAM_API_URL").and_then(non_empty),
        };

        let email = EmailConfig {
            smtp_url: get("SMTP_URL").and_then(non_empty),
            from: get("SMTP_FROM")
                .and_then(non_empty)
                .unwrap_or_else(|| "noreply@localhost".to_string()),
            subject: get("EMAIL_SUBJECT")
                .and_then(non_empty)
                .unwrap_or_else(|| "Message from notification relay".to_string()),
        };

        let sms = SmsConfig {
            enabled: get_bool("SMS_ENABLED").unwrap_or(true),
            api_url: get("SMS_API_URL").unwrap_or_default(),
            api_token: get("SMS_API_TOKEN").unwrap_or_default(),
        };

        Ok(Self {
            data_dir,
            templates_dir,
            logs_dir,
            bootstrap_admin_password,
            dispatch_delay,
            pacing,
            http_timeout,
            ldap,
            telegram,
            email,
            sms,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let Some((key, val)) = parse_dotenv_line(raw) else {
            continue;
        };
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (k, v) = line.split_once('=')?;
    let key = k.trim();
    if key.is_empty() {
        return None;
    }

    let mut val = v.trim().to_string();
    // Strip optional surrounding quotes.
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        val = val[1..val.len() - 1].to_string();
    }
    Some((key.to_string(), val))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_domain(raw: &str) -> String {
    let d = raw.trim();
    if d.is_empty() || d.starts_with('@') {
        d.to_string()
    } else {
        format!("@{d}")
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
        assert_eq!(cfg.templates_dir, PathBuf::from("./data/templates"));
        assert_eq!(cfg.dispatch_delay, Duration::from_millis(100));
        assert_eq!(cfg.pacing, PacingMode::Fixed);
        assert!(!cfg.ldap.enabled);
        assert_eq!(cfg.ldap.account_attr, "sAMAccountName");
        assert!(cfg.sms.enabled);
        assert!(cfg.bootstrap_admin_password.is_none());
    }

    #[test]
    fn ldap_requires_base_group_and_domain() {
        let err = Config::from_vars(&vars(&[("LDAP_ENABLED", "yes")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("LDAP_BASE_DN")));

        let cfg = Config::from_vars(&vars(&[
            ("LDAP_ENABLED", "true"),
            ("LDAP_BASE_DN", "DC=corp,DC=example"),
            ("LDAP_GROUP", "CN=relay-users"),
            ("LDAP_DOMAIN", "corp.example"),
            ("LDAP_TIMEOUT_MS", "750"),
        ]))
        .unwrap();
        assert_eq!(cfg.ldap.domain_suffix, "@corp.example");
        assert_eq!(cfg.ldap.timeout, Duration::from_millis(750));
    }

    #[test]
    fn booleans_and_overrides() {
        let cfg = Config::from_vars(&vars(&[
            ("SMS_ENABLED", "off"),
            ("DISPATCH_DELAY_MS", "0"),
            ("DATA_DIR", "/srv/relay"),
            ("TELEGRAM_BOT_TOKEN", "  123:abc  "),
        ]))
        .unwrap();
        assert!(!cfg.sms.enabled);
        assert!(cfg.dispatch_delay.is_zero());
        assert_eq!(cfg.logs_dir, PathBuf::from("/srv/relay/logs"));
        assert_eq!(cfg.telegram.bot_token, "123:abc");
    }

    #[test]
    fn pacing_mode_is_configurable() {
        let cfg = Config::from_vars(&vars(&[("DISPATCH_PACING", "interval")])).unwrap();
        assert_eq!(cfg.pacing, PacingMode::Interval);

        let err = Config::from_vars(&vars(&[("DISPATCH_PACING", "burst")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("DISPATCH_PACING")));
    }

    #[test]
    fn dotenv_lines() {
        assert_eq!(
            parse_dotenv_line("SMTP_FROM=\"relay@example.com\""),
            Some(("SMTP_FROM".to_string(), "relay@example.com".to_string()))
        );
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line("=value"), None);
    }
}
