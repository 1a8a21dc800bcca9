//! First-run layout: directories, default templates, optional admin account.

use crate::{
    config::Config,
    credentials::CredentialStore,
    domain::Channel,
    store::FlatFileStore,
    templates::TemplateStore,
    Result,
};

pub const ADMIN_USERNAME: &str = "admin";

const DEFAULT_TEMPLATES: [(&str, &str); 3] = [
    ("default", "Message: {content}"),
    ("urgent", "URGENT: {content}"),
    ("info", "Info: {content}"),
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub seeded_templates: usize,
    pub seeded_admin: bool,
    pub created_recipient_files: usize,
}

pub async fn ensure_layout(
    cfg: &Config,
    files: &FlatFileStore,
    templates: &TemplateStore,
) -> Result<BootstrapReport> {
    for dir in [&cfg.data_dir, &cfg.templates_dir, &cfg.logs_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut report = BootstrapReport::default();

    if templates.names().await?.is_empty() {
        for (name, body) in DEFAULT_TEMPLATES {
            templates.save(name, body).await?;
            report.seeded_templates += 1;
        }
    }

    for channel in Channel::ALL {
        let path = files.path_for(channel.recipients_file());
        if !tokio::fs::try_exists(&path).await? {
            files.save(channel.recipients_file(), &[]).await?;
            report.created_recipient_files += 1;
        }
    }

    let credentials = CredentialStore::new(files.clone());
    if let Some(password) = &cfg.bootstrap_admin_password {
        if credentials.is_empty().await? {
            credentials.insert(ADMIN_USERNAME, password).await?;
            report.seeded_admin = true;
            tracing::info!("seeded initial '{ADMIN_USERNAME}' user");
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::credentials::verify_password;

    fn config(root: &std::path::Path, admin_pw: Option<&str>) -> Config {
        let mut vars = HashMap::new();
        vars.insert("DATA_DIR".to_string(), root.display().to_string());
        if let Some(pw) = admin_pw {
            vars.insert("BOOTSTRAP_ADMIN_PASSWORD".to_string(), pw.to_string());
        }
        Config::from_vars(&vars).unwrap()
    }

    #[tokio::test]
    async fn first_run_seeds_then_second_run_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), Some("changeme"));
        let files = FlatFileStore::new(&cfg.data_dir);
        let templates = TemplateStore::new(&cfg.templates_dir);

        let first = ensure_layout(&cfg, &files, &templates).await.unwrap();
        assert_eq!(first.seeded_templates, 3);
        assert!(first.seeded_admin);
        assert_eq!(first.created_recipient_files, 3);
        assert!(cfg.logs_dir.is_dir());

        let admin = CredentialStore::new(files.clone())
            .find(ADMIN_USERNAME)
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("changeme", &admin.password_hash));

        let second = ensure_layout(&cfg, &files, &templates).await.unwrap();
        assert_eq!(second, BootstrapReport::default());
    }

    #[tokio::test]
    async fn no_admin_without_configured_password() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), None);
        let files = FlatFileStore::new(&cfg.data_dir);
        let templates = TemplateStore::new(&cfg.templates_dir);

        let report = ensure_layout(&cfg, &files, &templates).await.unwrap();
        assert!(!report.seeded_admin);
        assert!(CredentialStore::new(files).is_empty().await.unwrap());
    }
}
