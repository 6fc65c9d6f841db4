use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use kiln_config::FrameworkMeta;
use regex::{Captures, Regex};

use super::{CompileContext, CompilerStage, utf8};
use crate::error::CompileError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\$([A-Za-z0-9_.\-]+)\}").expect("placeholder regex is valid"));

/// Values substituted for `{$name}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(BTreeMap<String, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Variables available to every source file of an application.
pub fn source_vars(framework: Option<&FrameworkMeta>) -> TemplateVars {
    let mut vars = TemplateVars::new();
    if let Some(meta) = framework {
        vars.insert("framework_name", meta.name.as_str());
        vars.insert("framework_version", meta.version.as_str());
    }
    vars
}

/// Replace every `{$name}` with its value. Unknown names are left in place.
pub fn expand_placeholders<'a>(text: &'a str, vars: &TemplateVars) -> Cow<'a, str> {
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| match vars.get(&caps[1]) {
        Some(value) => value.to_string(),
        None => caps[0].to_string(),
    })
}

/// Placeholder expansion on text files.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateStage;

impl TemplateStage {
    pub fn expand(&self, text: &str, vars: &TemplateVars) -> String {
        expand_placeholders(text, vars).into_owned()
    }
}

impl CompilerStage for TemplateStage {
    fn name(&self) -> &'static str {
        "template"
    }

    fn compile(&self, input: &[u8], ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        let text = utf8(input, ctx)?;
        Ok(self.expand(text, ctx.vars).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_and_keeps_unknown() {
        let vars = TemplateVars::new().with("basepath", "/1700000000000");
        let out = expand_placeholders(
            r#"<script src="{$basepath}/core.js"></script>{$missing}"#,
            &vars,
        );
        assert_eq!(
            out,
            r#"<script src="/1700000000000/core.js"></script>{$missing}"#
        );
    }

    #[test]
    fn untouched_text_is_borrowed() {
        let vars = TemplateVars::new();
        assert!(matches!(
            expand_placeholders("plain {text}", &vars),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn stage_rejects_binary_input() {
        let vars = TemplateVars::new();
        let ctx = CompileContext {
            path: "views/a.js",
            vars: &vars,
        };
        let err = TemplateStage.compile(&[0xff, 0xfe], &ctx).unwrap_err();
        assert!(matches!(err, CompileError::NotUtf8 { .. }));
    }
}
