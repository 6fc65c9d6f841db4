//! Per-file compiler stages.
//!
//! A stage is a pure `content -> content` transform for one [`FileClass`].
//! The [`CompilerRegistry`] maps classes to stages and is shared by the
//! builder (once per file per build) and the dev server (once per request).

mod assets;
mod script;
mod template;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::CompileError;

pub use assets::{CssStage, HtmlStage, LocaleStage, StaticStage};
pub use script::{ModuleStage, RoutesStage};
pub use template::{TemplateStage, TemplateVars, expand_placeholders, source_vars};

/// Classification of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileClass {
    ModuleJs,
    RoutesJs,
    Locale,
    Css,
    Html,
    Static,
}

impl FileClass {
    /// Classify a path relative to the application root.
    ///
    /// Route definitions are recognised by name before the extension is
    /// looked at, so a routes file never goes through the module pipeline.
    pub fn classify(rel: &Path) -> Self {
        let file_name = rel
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if file_name == "routes.js" || file_name.ends_with(".routes.js") {
            return FileClass::RoutesJs;
        }

        let extension = rel
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let in_locales = rel
            .components()
            .next()
            .is_some_and(|c| c.as_os_str() == "locales");

        match extension.as_str() {
            "json" if in_locales => FileClass::Locale,
            "js" => FileClass::ModuleJs,
            "css" => FileClass::Css,
            "html" | "htm" => FileClass::Html,
            _ => FileClass::Static,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileClass::ModuleJs => "module-js",
            FileClass::RoutesJs => "routes-js",
            FileClass::Locale => "locale",
            FileClass::Css => "css",
            FileClass::Html => "html",
            FileClass::Static => "static",
        }
    }

    /// Kind passed to the external minifier, if this class is minified.
    pub fn minify_kind(self) -> Option<&'static str> {
        match self {
            FileClass::ModuleJs | FileClass::RoutesJs => Some("js"),
            FileClass::Css => Some("css"),
            FileClass::Locale | FileClass::Html | FileClass::Static => None,
        }
    }
}

/// Per-invocation inputs of a stage.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    /// Source path relative to the application root, `/`-separated.
    pub path: &'a str,
    pub vars: &'a TemplateVars,
}

/// One content transform.
pub trait CompilerStage: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn compile(&self, input: &[u8], ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError>;
}

/// Decode stage input as UTF-8 text.
pub(crate) fn utf8<'a>(input: &'a [u8], ctx: &CompileContext<'_>) -> Result<&'a str, CompileError> {
    std::str::from_utf8(input).map_err(|_| CompileError::NotUtf8 {
        path: ctx.path.to_string(),
    })
}

/// Strategy table from file class to compiler stage.
#[derive(Debug, Clone)]
pub struct CompilerRegistry {
    stages: HashMap<FileClass, Arc<dyn CompilerStage>>,
}

impl Default for CompilerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl CompilerRegistry {
    /// The built-in stage set.
    pub fn standard() -> Self {
        let mut stages: HashMap<FileClass, Arc<dyn CompilerStage>> = HashMap::new();
        stages.insert(FileClass::ModuleJs, Arc::new(ModuleStage::default()));
        stages.insert(FileClass::RoutesJs, Arc::new(RoutesStage));
        stages.insert(FileClass::Locale, Arc::new(LocaleStage));
        stages.insert(FileClass::Css, Arc::new(CssStage::default()));
        stages.insert(FileClass::Html, Arc::new(HtmlStage::default()));
        stages.insert(FileClass::Static, Arc::new(StaticStage));
        Self { stages }
    }

    /// Replace the stage used for `class`.
    pub fn with_stage(mut self, class: FileClass, stage: Arc<dyn CompilerStage>) -> Self {
        self.stages.insert(class, stage);
        self
    }

    pub fn stage_for(&self, class: FileClass) -> Arc<dyn CompilerStage> {
        self.stages
            .get(&class)
            .cloned()
            .unwrap_or_else(|| Arc::new(StaticStage))
    }

    pub fn compile(
        &self,
        class: FileClass,
        input: &[u8],
        ctx: &CompileContext<'_>,
    ) -> Result<Vec<u8>, CompileError> {
        let stage = self.stage_for(class);
        tracing::trace!(path = ctx.path, stage = stage.name(), "compiling");
        stage.compile(input, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn classify(path: &str) -> FileClass {
        FileClass::classify(&PathBuf::from(path))
    }

    #[test]
    fn classification() {
        assert_eq!(classify("views/home/home.js"), FileClass::ModuleJs);
        assert_eq!(classify("config/routes.js"), FileClass::RoutesJs);
        assert_eq!(classify("plugins/shop/shop.routes.js"), FileClass::RoutesJs);
        assert_eq!(classify("locales/fr.json"), FileClass::Locale);
        assert_eq!(classify("views/home/data.json"), FileClass::Static);
        assert_eq!(classify("views/home/home.css"), FileClass::Css);
        assert_eq!(classify("index.html"), FileClass::Html);
        assert_eq!(classify("views/home/logo.png"), FileClass::Static);
        assert_eq!(classify("views/home/README"), FileClass::Static);
    }

    #[test]
    fn only_scripts_and_styles_are_minified() {
        assert_eq!(FileClass::ModuleJs.minify_kind(), Some("js"));
        assert_eq!(FileClass::RoutesJs.minify_kind(), Some("js"));
        assert_eq!(FileClass::Css.minify_kind(), Some("css"));
        assert_eq!(FileClass::Locale.minify_kind(), None);
        assert_eq!(FileClass::Html.minify_kind(), None);
    }

    #[derive(Debug)]
    struct Upper;

    impl CompilerStage for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn compile(&self, input: &[u8], _: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
            Ok(input.to_ascii_uppercase())
        }
    }

    #[test]
    fn stages_can_be_replaced() {
        let registry = CompilerRegistry::standard().with_stage(FileClass::Css, Arc::new(Upper));
        let vars = TemplateVars::default();
        let ctx = CompileContext {
            path: "a.css",
            vars: &vars,
        };
        let out = registry.compile(FileClass::Css, b"body{}", &ctx).unwrap();
        assert_eq!(out, b"BODY{}");
        assert_eq!(registry.stage_for(FileClass::Html).name(), "html");
    }
}
