use super::{CompileContext, CompilerStage, TemplateStage};
use crate::error::CompileError;

/// Locale bundles must be valid JSON; they are re-emitted compact.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocaleStage;

impl CompilerStage for LocaleStage {
    fn name(&self) -> &'static str {
        "locale"
    }

    fn compile(&self, input: &[u8], ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        let value: serde_json::Value =
            serde_json::from_slice(input).map_err(|source| CompileError::Locale {
                path: ctx.path.to_string(),
                source,
            })?;
        serde_json::to_vec(&value).map_err(|source| CompileError::Locale {
            path: ctx.path.to_string(),
            source,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CssStage {
    template: TemplateStage,
}

impl CompilerStage for CssStage {
    fn name(&self) -> &'static str {
        "css"
    }

    fn compile(&self, input: &[u8], ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        self.template.compile(input, ctx)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlStage {
    template: TemplateStage,
}

impl CompilerStage for HtmlStage {
    fn name(&self) -> &'static str {
        "html"
    }

    fn compile(&self, input: &[u8], ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        self.template.compile(input, ctx)
    }
}

/// Byte-for-byte copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticStage;

impl CompilerStage for StaticStage {
    fn name(&self) -> &'static str {
        "static"
    }

    fn compile(&self, input: &[u8], _ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        Ok(input.to_vec())
    }
}
