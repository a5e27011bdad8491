//! Template storage.
//!
//! Templates are unencrypted bodies under `.gpass-templates/<name>.tpl`. A
//! template named `web` applies to every secret below `web/`.

use super::Store;
use crate::core::constants::TEMPLATE_DIR;
use crate::core::context::Context;
use crate::error::{Result, StoreError};

impl Store {
    pub fn set_template(&self, ctx: &Context, name: &str, body: &[u8]) -> Result<()> {
        let file = template_file(name);
        self.storage.set(ctx, &file, body)?;
        self.commit(ctx, &[&file], &format!("Saved template {}", name))
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no template has this name.
    pub fn get_template(&self, ctx: &Context, name: &str) -> Result<Vec<u8>> {
        self.storage
            .get(ctx, &template_file(name))
            .map_err(|_| StoreError::NotFound(format!("template {}", name)).into())
    }

    pub fn remove_template(&self, ctx: &Context, name: &str) -> Result<()> {
        let file = template_file(name);
        if !self.storage.exists(ctx, &file) {
            return Err(StoreError::NotFound(format!("template {}", name)).into());
        }
        self.storage.delete(ctx, &file)?;
        self.commit(ctx, &[&file], &format!("Removed template {}", name))
    }

    pub fn list_templates(&self, ctx: &Context) -> Result<Vec<String>> {
        let prefix = format!("{}/", TEMPLATE_DIR);
        Ok(self
            .storage
            .list(ctx, &prefix)?
            .iter()
            .filter_map(|f| f.strip_prefix(&prefix))
            .filter_map(|f| f.strip_suffix(TEMPLATE_EXT))
            .map(str::to_string)
            .collect())
    }

    /// Template with the longest name that is a directory prefix of
    /// `secret`, as `(template name, body)`.
    pub fn lookup_template(&self, ctx: &Context, secret: &str) -> Result<Option<(String, Vec<u8>)>> {
        let best = self
            .list_templates(ctx)?
            .into_iter()
            .filter(|t| secret.starts_with(&format!("{}/", t)))
            .max_by_key(|t| t.len());
        match best {
            Some(name) => {
                let body = self.get_template(ctx, &name)?;
                Ok(Some((name, body)))
            }
            None => Ok(None),
        }
    }
}

const TEMPLATE_EXT: &str = ".tpl";

fn template_file(name: &str) -> String {
    format!("{}/{}{}", TEMPLATE_DIR, name.trim_matches('/'), TEMPLATE_EXT)
}

#[cfg(test)]
mod tests {
    use super::super::testing::memory_store;
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_template_crud() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        store.set_template(&ctx, "web", b"{{ .Content }}\nurl: ").unwrap();
        store.set_template(&ctx, "web/mail", b"mail").unwrap();
        assert_eq!(store.list_templates(&ctx).unwrap(), vec!["web", "web/mail"]);
        assert_eq!(store.get_template(&ctx, "web/mail").unwrap(), b"mail");

        // templates never show up as secrets
        assert!(store.list(&ctx, "", None).unwrap().is_empty());

        store.remove_template(&ctx, "web/mail").unwrap();
        assert_eq!(
            store.get_template(&ctx, "web/mail").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(store.remove_template(&ctx, "web/mail").is_err());
    }

    #[test]
    fn test_lookup_longest_prefix() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        store.set_template(&ctx, "web", b"a").unwrap();
        store.set_template(&ctx, "web/mail", b"b").unwrap();

        let (name, body) = store.lookup_template(&ctx, "web/mail/alice").unwrap().unwrap();
        assert_eq!((name.as_str(), body.as_slice()), ("web/mail", b"b".as_slice()));
        let (name, _) = store.lookup_template(&ctx, "web/shop").unwrap().unwrap();
        assert_eq!(name, "web");
        assert!(store.lookup_template(&ctx, "webx/a").unwrap().is_none());
        assert!(store.lookup_template(&ctx, "web").unwrap().is_none());
    }
}
