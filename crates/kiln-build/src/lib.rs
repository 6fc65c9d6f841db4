//! Build orchestration for kiln applications.
//!
//! [`Builder`] turns an application source tree into a versioned output
//! directory. The per-file transforms live in [`compiler`] and are shared with
//! the dev server through [`resolve_on_demand`].

pub mod builder;
pub mod compiler;
pub mod counter;
pub mod enumerator;
pub mod error;
pub mod finalize;
pub mod fs;
pub mod ignore;
pub mod manifest;
pub mod module_wrapper;
pub mod naming;
pub mod resolve;

pub use builder::{BuildOptions, BuildReport, BuildState, Builder};
pub use compiler::{CompileContext, CompilerRegistry, CompilerStage, FileClass, TemplateVars};
pub use counter::{CompletionCounter, UnitGuard};
pub use enumerator::{Enumerator, FileTask};
pub use error::{BuildError, CompileError, Result, UnitError};
pub use ignore::IgnoreSet;
pub use manifest::{BUILD_CONFIG_FILE, BuildManifest};
pub use module_wrapper::{ModuleHeader, WrapOutcome, parse_module_header, wrap_module};
pub use naming::{BuildIdGenerator, BuildName, SequenceIds, TimestampIds};
pub use resolve::{Resolved, content_type_for, resolve_on_demand};
