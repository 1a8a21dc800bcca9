use std::{fmt, str::FromStr};

use crate::{errors::Error, Result};

/// Outbound delivery mechanism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Telegram,
    Email,
    Sms,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Telegram, Channel::Email, Channel::Sms];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Telegram => "telegram",
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }

    /// Flat file holding this channel's recipient list.
    pub fn recipients_file(self) -> &'static str {
        match self {
            Channel::Telegram => "telegram_recipients.txt",
            Channel::Email => "email_recipients.txt",
            Channel::Sms => "sms_recipients.txt",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telegram" => Ok(Channel::Telegram),
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            other => Err(Error::Validation(format!("unknown channel: {other}"))),
        }
    }
}

/// One `label:value` line of a flat data file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub label: String,
    pub value: String,
}

impl Record {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Parse one line: split on the first `:`, trim both sides.
    ///
    /// Blank lines and lines without a colon yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (label, value) = line.split_once(':')?;
        Some(Self::new(label.trim(), value.trim()))
    }

    pub fn to_line(&self) -> String {
        format!("{}:{}", self.label, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_parses_case_insensitively() {
        assert_eq!("Telegram".parse::<Channel>().unwrap(), Channel::Telegram);
        assert_eq!(" sms ".parse::<Channel>().unwrap(), Channel::Sms);
        assert!(matches!(
            "fax".parse::<Channel>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn record_splits_on_first_colon_only() {
        let r = Record::parse_line("  Ops team : https://example.com:8443/x ").unwrap();
        assert_eq!(r.label, "Ops team");
        assert_eq!(r.value, "https://example.com:8443/x");
    }

    #[test]
    fn record_skips_blank_and_colonless_lines() {
        assert!(Record::parse_line("   ").is_none());
        assert!(Record::parse_line("no delimiter here").is_none());
    }
}
