use crate::{
    domain::{Channel, Record},
    errors::Error,
    store::FlatFileStore,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientEntry {
    pub label: String,
    pub address: String,
}

impl RecipientEntry {
    pub fn new(label: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
        }
    }
}

impl From<Record> for RecipientEntry {
    fn from(r: Record) -> Self {
        Self {
            label: r.label,
            address: r.value,
        }
    }
}

/// Per-channel recipient lists (`<channel>_recipients.txt`).
#[derive(Clone)]
pub struct RecipientStore {
    files: FlatFileStore,
}

impl RecipientStore {
    pub fn new(files: FlatFileStore) -> Self {
        Self { files }
    }

    pub async fn load(&self, channel: Channel) -> Result<Vec<RecipientEntry>> {
        Ok(self
            .files
            .load(channel.recipients_file())
            .await?
            .into_iter()
            .map(RecipientEntry::from)
            .collect())
    }

    /// Replace the list of `channel`. Nothing is written if any entry would not
    /// read back unchanged.
    pub async fn save(&self, channel: Channel, entries: &[RecipientEntry]) -> Result<()> {
        entries.iter().try_for_each(validate_entry)?;
        let records: Vec<Record> = entries
            .iter()
            .map(|e| Record::new(e.label.clone(), e.address.clone()))
            .collect();
        self.files.save(channel.recipients_file(), &records).await
    }

    /// Addresses of every stored recipient of `channel`, in file order.
    pub async fn addresses(&self, channel: Channel) -> Result<Vec<String>> {
        Ok(self
            .load(channel)
            .await?
            .into_iter()
            .map(|e| e.address)
            .collect())
    }
}

fn validate_entry(entry: &RecipientEntry) -> Result<()> {
    let has_break = |s: &str| s.contains(['\n', '\r']);
    if entry.label.contains(':') || has_break(&entry.label) {
        return Err(Error::Validation(format!(
            "recipient label must not contain ':' or line breaks: {:?}",
            entry.label
        )));
    }
    if has_break(&entry.address) {
        return Err(Error::Validation(format!(
            "recipient address must not contain line breaks: {:?}",
            entry.address
        )));
    }
    Ok(())
}

/// Parse operator-entered `label: address` lines. Lines without a colon are dropped.
pub fn parse_recipients_text(text: &str) -> Vec<RecipientEntry> {
    text.lines()
        .filter_map(Record::parse_line)
        .map(RecipientEntry::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operator_text() {
        let text = "Ops: -1001234567890\n\n  garbage line\nAdmins :-1009876543210 \r\n";
        assert_eq!(
            parse_recipients_text(text),
            vec![
                RecipientEntry::new("Ops", "-1001234567890"),
                RecipientEntry::new("Admins", "-1009876543210"),
            ]
        );
    }

    #[tokio::test]
    async fn channels_are_stored_separately() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecipientStore::new(FlatFileStore::new(dir.path()));

        store
            .save(Channel::Email, &[RecipientEntry::new("Mgr", "m@x.com")])
            .await
            .unwrap();
        store
            .save(Channel::Sms, &[RecipientEntry::new("Dir", "+15550100")])
            .await
            .unwrap();

        assert_eq!(store.addresses(Channel::Email).await.unwrap(), vec!["m@x.com"]);
        assert_eq!(store.addresses(Channel::Sms).await.unwrap(), vec!["+15550100"]);
        assert!(store.load(Channel::Telegram).await.unwrap().is_empty());
        assert!(dir.path().join("email_recipients.txt").exists());
    }

    #[tokio::test]
    async fn entries_that_would_not_round_trip_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecipientStore::new(FlatFileStore::new(dir.path()));
        store
            .save(Channel::Email, &[RecipientEntry::new("Mgr", "m@x.com")])
            .await
            .unwrap();

        for bad in [
            RecipientEntry::new("Ops:night", "o@x.com"),
            RecipientEntry::new("Ops\nEvil", "o@x.com"),
            RecipientEntry::new("Ops", "o@x.com\nEvil:e@x.com"),
        ] {
            let entries = [RecipientEntry::new("Lead", "l@x.com"), bad.clone()];
            assert!(
                matches!(
                    store.save(Channel::Email, &entries).await,
                    Err(Error::Validation(_))
                ),
                "accepted {bad:?}"
            );
        }

        assert_eq!(store.addresses(Channel::Email).await.unwrap(), vec!["m@x.com"]);
    }
}
