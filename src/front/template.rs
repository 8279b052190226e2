use std::{
    fs,
    path::Path,
    sync::{Arc, RwLock},
};

use anyhow::{anyhow, Context};
use axum::response::Html;
use handlebars::handlebars_helper;
use serde::Serialize;

use crate::{currency::Money, errors::Error};

#[derive(Clone)]
pub struct Template {
    r: Arc<RwLock<handlebars::Handlebars<'static>>>,
}

impl Template {
    /// Registers every file in `dir` under its file name, e.g. `login.hbs`.
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut handlebars = handlebars::Handlebars::new();

        let entries =
            fs::read_dir(dir).with_context(|| format!("reading templates from {}", dir.display()))?;
        for entity in entries {
            let entity = entity?;
            if !entity.metadata()?.is_file() {
                continue;
            }
            let file_name = entity.file_name();
            let name = file_name
                .to_str()
                .ok_or_else(|| anyhow!("non utf-8 template name in {}", dir.display()))?;
            handlebars
                .register_template_file(name, entity.path())
                .with_context(|| format!("registering template {name}"))?;
            log::debug!("template '{name}' registered");
        }

        handlebars_helper!(moeda_brl: |cents: i64| Money::from_cents(cents).to_string());
        handlebars.register_helper("moeda_brl", Box::new(moeda_brl));

        Ok(Self {
            r: Arc::new(RwLock::new(handlebars)),
        })
    }

    pub fn render<T>(&self, name: &str, data: &T) -> Result<Html<String>, Error>
    where
        T: Serialize,
    {
        log::trace!("render '{}': {:?}", name, serde_json::to_value(data));
        let registry = self
            .r
            .read()
            .map_err(|_| anyhow!("template registry lock poisoned"))?;
        Ok(Html(registry.render(name, data)?))
    }
}
