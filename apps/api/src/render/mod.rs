// Rendering: LaTeX source → PDF through an external TeX toolchain.
// The compiler runs as a child process; nothing here links TeX.

pub mod diagnostics;
pub mod latex;

pub use latex::{CompileError, CompiledDocument, LatexCompiler};
