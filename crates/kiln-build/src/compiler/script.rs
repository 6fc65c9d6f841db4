use super::{CompileContext, CompilerStage, TemplateStage, utf8};
use crate::error::CompileError;
use crate::module_wrapper::wrap_module;

/// Scripts: placeholder expansion, then module registration wrapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleStage {
    template: TemplateStage,
}

impl CompilerStage for ModuleStage {
    fn name(&self) -> &'static str {
        "module"
    }

    fn compile(&self, input: &[u8], ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        let text = utf8(input, ctx)?;
        let expanded = self.template.expand(text, ctx.vars);
        Ok(wrap_module(&expanded).into_inner().into_bytes())
    }
}

/// Route definitions are wrapped but never expanded: they routinely carry
/// `{$param}`-looking path segments that belong to the router.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoutesStage;

impl CompilerStage for RoutesStage {
    fn name(&self) -> &'static str {
        "routes"
    }

    fn compile(&self, input: &[u8], ctx: &CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        let text = utf8(input, ctx)?;
        Ok(wrap_module(text).into_inner().into_bytes())
    }
}
