//! Fan-out of one message to many recipients.
//!
//! Channel choice happens before the loop ([`plan_routes`]); the loop itself only
//! sees explicit `(channel, recipient)` routes and never aborts on a failed send.

use std::{collections::HashMap, sync::Arc};

use crate::{
    audit::AuditLog,
    domain::Channel,
    errors::Error,
    pacing::{NoPacing, Pacer},
    ports::ChannelSender,
    templates::TemplateStore,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelSelection {
    Explicit(Channel),
    /// Legacy routing: addresses containing `@` go to email, the rest to Telegram.
    Inferred,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub channel: Channel,
    pub recipient: String,
}

pub fn infer_channel(recipient: &str) -> Channel {
    if recipient.contains('@') {
        Channel::Email
    } else {
        Channel::Telegram
    }
}

/// Resolve the channel of every recipient, keeping input order.
pub fn plan_routes(selection: ChannelSelection, recipients: &[String]) -> Vec<Route> {
    recipients
        .iter()
        .map(|r| Route {
            channel: match selection {
                ChannelSelection::Explicit(c) => c,
                ChannelSelection::Inferred => infer_channel(r),
            },
            recipient: r.clone(),
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct DispatchRequest {
    pub selection: ChannelSelection,
    pub recipients: Vec<String>,
    pub message: String,
    pub template: Option<String>,
    pub actor: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed_recipients: Vec<String>,
}

impl SendOutcome {
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0
    }

    /// Operator-facing result line.
    pub fn summary(&self) -> String {
        if self.all_failed() {
            return "No recipient received the message".to_string();
        }
        let mut out = format!("Sent {} of {}", self.succeeded, self.attempted);
        if !self.failed_recipients.is_empty() {
            out.push_str("; failed: ");
            out.push_str(&self.failed_recipients.join(", "));
        }
        out
    }
}

/// Decorator that turns a [`ChannelSender`] into the `send -> bool` contract,
/// recording every attempt in the audit log.
#[derive(Clone)]
pub struct AuditedSender {
    inner: Arc<dyn ChannelSender>,
    audit: AuditLog,
}

impl AuditedSender {
    pub fn new(inner: Arc<dyn ChannelSender>, audit: AuditLog) -> Self {
        Self { inner, audit }
    }

    pub fn channel(&self) -> Channel {
        self.inner.channel()
    }

    pub async fn send(&self, recipient: &str, message: &str, actor: &str) -> bool {
        let channel = self.inner.channel();
        match self.inner.deliver(recipient, message).await {
            Ok(()) => {
                self.audit
                    .message(channel.as_str(), recipient, message, actor, "success");
                true
            }
            Err(e) => {
                self.audit.message(
                    channel.as_str(),
                    recipient,
                    message,
                    actor,
                    &format!("error: {e}"),
                );
                false
            }
        }
    }
}

pub struct Dispatcher {
    senders: HashMap<Channel, AuditedSender>,
    templates: TemplateStore,
    pacer: Box<dyn Pacer>,
    audit: AuditLog,
}

impl Dispatcher {
    pub fn new(templates: TemplateStore, audit: AuditLog) -> Self {
        Self {
            senders: HashMap::new(),
            templates,
            pacer: Box::new(NoPacing),
            audit,
        }
    }

    /// Register the sender for its channel, replacing any previous one.
    pub fn with_sender(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        let audited = AuditedSender::new(sender, self.audit.clone());
        self.senders.insert(audited.channel(), audited);
        self
    }

    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Final message text: the template body with `{content}` substituted, or
    /// `message` verbatim when no template is named.
    pub async fn compose(&self, message: &str, template: Option<&str>) -> Result<String> {
        let Some(name) = template else {
            return Ok(message.to_string());
        };
        match self.templates.load(name).await? {
            Some(t) => Ok(t.render(message)),
            None => Err(Error::Validation(format!("template not found: {name}"))),
        }
    }

    pub async fn dispatch(&self, req: &DispatchRequest) -> Result<SendOutcome> {
        let (routes, message) = match self.prepare(req).await {
            Ok(v) => v,
            Err(e) => {
                self.audit.error("dispatch", &e.to_string(), &req.actor);
                return Err(e);
            }
        };

        let mut outcome = SendOutcome::default();
        for (idx, route) in routes.iter().enumerate() {
            if idx > 0 {
                self.pacer.pause().await;
            }

            outcome.attempted += 1;
            let ok = match self.senders.get(&route.channel) {
                Some(sender) => sender.send(&route.recipient, &message, &req.actor).await,
                None => {
                    self.audit.message(
                        route.channel.as_str(),
                        &route.recipient,
                        &message,
                        &req.actor,
                        "error: channel not configured",
                    );
                    false
                }
            };

            if ok {
                outcome.succeeded += 1;
            } else {
                outcome.failed_recipients.push(route.recipient.clone());
            }
        }

        tracing::info!(
            "dispatch by {}: {}/{} delivered",
            req.actor,
            outcome.succeeded,
            outcome.attempted
        );
        Ok(outcome)
    }

    /// All checks that must pass before the first send.
    async fn prepare(&self, req: &DispatchRequest) -> Result<(Vec<Route>, String)> {
        if req.message.trim().is_empty() {
            return Err(Error::Validation("message must not be empty".to_string()));
        }

        let recipients: Vec<String> = req
            .recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        if recipients.is_empty() {
            return Err(Error::Validation(
                "select at least one recipient".to_string(),
            ));
        }

        let message = self.compose(&req.message, req.template.as_deref()).await?;
        Ok((plan_routes(req.selection, &recipients), message))
    }
}
