use std::{process::ExitCode, sync::Arc};

use clap::Parser;

use nrelay_core::{
    audit::AuditLog, auth::AuthCoordinator, config::Config, credentials::CredentialStore,
    dispatch::Dispatcher, pacing, recipients::RecipientStore, store::FlatFileStore,
    templates::TemplateStore,
};
use nrelay_ldap::LdapAuthenticator;
use nrelay_mail::EmailSender;
use nrelay_sms::SmsSender;
use nrelay_telegram::TelegramSender;

mod cli;

/// Everything a command needs, built once from [`Config`].
pub struct App {
    pub cfg: Arc<Config>,
    pub files: FlatFileStore,
    pub templates: TemplateStore,
    pub recipients: RecipientStore,
    pub audit: AuditLog,
    pub auth: AuthCoordinator,
}

impl App {
    fn new(cfg: Arc<Config>) -> Self {
        let files = FlatFileStore::new(&cfg.data_dir);
        let templates = TemplateStore::new(&cfg.templates_dir);
        let audit = AuditLog::new(&cfg.logs_dir);

        let mut auth = AuthCoordinator::new(CredentialStore::new(files.clone()), audit.clone());
        if cfg.ldap.enabled {
            tracing::info!("directory authentication enabled ({})", cfg.ldap.url);
            auth = auth.with_directory(Arc::new(LdapAuthenticator::new(cfg.ldap.clone())));
        }

        Self {
            recipients: RecipientStore::new(files.clone()),
            cfg,
            files,
            templates,
            audit,
            auth,
        }
    }

    /// Dispatcher with all three channels registered.
    pub fn dispatcher(&self) -> nrelay_core::Result<Dispatcher> {
        let timeout = self.cfg.http_timeout;
        Ok(Dispatcher::new(self.templates.clone(), self.audit.clone())
            .with_sender(Arc::new(TelegramSender::new(&self.cfg.telegram, timeout)?))
            .with_sender(Arc::new(EmailSender::new(&self.cfg.email, timeout)?))
            .with_sender(Arc::new(SmsSender::new(self.cfg.sms.clone(), timeout)?))
            .with_pacer(pacing::from_config(self.cfg.pacing, self.cfg.dispatch_delay)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    nrelay_core::logging::init("nrelay")?;

    let args = cli::Cli::parse();
    let cfg = Arc::new(Config::load()?);
    let app = App::new(cfg);

    cli::run(&app, args).await
}
