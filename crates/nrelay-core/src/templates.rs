use std::{io::ErrorKind, path::PathBuf};

use crate::{errors::Error, Result};

pub const CONTENT_PLACEHOLDER: &str = "{content}";
const TEMPLATE_EXT: &str = "txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub body: String,
}

impl Template {
    /// Substitute every literal `{content}` with `content`.
    pub fn render(&self, content: &str) -> String {
        self.body.replace(CONTENT_PLACEHOLDER, content)
    }
}

/// Templates stored as `<dir>/<name>.txt`.
#[derive(Clone, Debug)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn load(&self, name: &str) -> Result<Option<Template>> {
        let path = self.path_for(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(Template {
                name: name.to_string(),
                body,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, name: &str, body: &str) -> Result<()> {
        let path = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    /// Template names, sorted. A missing directory has no templates.
    pub async fn names(&self) -> Result<Vec<String>> {
        let mut rd = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn all(&self) -> Result<Vec<Template>> {
        let mut out = Vec::new();
        for name in self.names().await? {
            if let Some(t) = self.load(&name).await? {
                out.push(t);
            }
        }
        Ok(out)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{TEMPLATE_EXT}")))
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(
            "template name must not be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(Error::InvalidPath {
            path: PathBuf::from(name),
            reason: "template names cannot contain path separators".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_placeholder() {
        let t = Template {
            name: "urgent".to_string(),
            body: "URGENT: {content}".to_string(),
        };
        assert_eq!(t.render("fire drill"), "URGENT: fire drill");
    }

    #[test]
    fn render_without_placeholder_keeps_body() {
        let t = Template {
            name: "static".to_string(),
            body: "Office closed".to_string(),
        };
        assert_eq!(t.render("ignored"), "Office closed");
    }

    #[tokio::test]
    async fn save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path().join("templates"));

        assert!(store.names().await.unwrap().is_empty());
        store.save("urgent", "URGENT: {content}").await.unwrap();
        store.save("info", "Info: {content}").await.unwrap();
        std::fs::write(dir.path().join("templates/notes.md"), "skip").unwrap();

        assert_eq!(store.names().await.unwrap(), vec!["info", "urgent"]);
        let t = store.load("urgent").await.unwrap().unwrap();
        assert_eq!(t.body, "URGENT: {content}");
        assert!(store.load("missing").await.unwrap().is_none());

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "info");
        assert_eq!(all[1].render("drill"), "URGENT: drill");
    }

    #[tokio::test]
    async fn rejects_traversal_and_empty_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());

        assert!(matches!(
            store.save("../escape", "x").await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            store.load("  ").await,
            Err(Error::Validation(_))
        ));
    }
}
