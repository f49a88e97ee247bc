//! Shared fixtures for unit and router tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::render::LatexCompiler;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::templates::TemplateCatalog;

pub const HELLO_WORLD: &str = "\\documentclass{article}\n\\begin{document}\nHello, world.\n\\end{document}\n";
pub const UNBALANCED: &str = "\\documentclass{article}\n\\begin{document}\n\\textbf{Hello\n\\end{document}\n";

/// Stand-in for `pdflatex`: fails with a TeX-style log when braces are
/// unbalanced, otherwise writes a "PDF" holding its working directory and the
/// source. Each run appends its working directory to `@DIR@/invocations`.
const FAKE_PDFLATEX: &str = r#"
echo "$PWD" >> '@DIR@/invocations'
src=""
for arg in "$@"; do src="$arg"; done
base="${src%.tex}"
opens=$(tr -cd '{' < "$src" | wc -c)
closes=$(tr -cd '}' < "$src" | wc -c)
if [ "$opens" -ne "$closes" ]; then
  printf '! Missing } inserted.\n<inserted text> \n}\nl.1 \\end{document}\n' > "$base.log"
  echo "! Emergency stop."
  exit 1
fi
{ echo "%PDF-1.4 fake"; pwd; cat "$src"; } > "$base.pdf"
exit 0
"#;

/// A shell script run through `sh`, so no executable bit or TeX install is needed.
pub struct FakeTex {
    dir: TempDir,
    script: PathBuf,
}

impl FakeTex {
    /// `body` may use `@DIR@` for the fixture's own directory.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-pdflatex.sh");
        let body = body.replace("@DIR@", &dir.path().display().to_string());
        std::fs::write(&script, body).unwrap();
        Self { dir, script }
    }

    pub fn pdflatex() -> Self {
        Self::new(FAKE_PDFLATEX)
    }

    pub fn compiler(&self, timeout: Duration) -> LatexCompiler {
        LatexCompiler::new("sh", 2, timeout)
            .with_extra_args(vec![self.script.display().to_string()])
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Working directories of every run so far.
    pub fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(self.path("invocations"))
            .map(|s| s.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }
}

pub fn test_config(templates_dir: &Path) -> Config {
    Config {
        gemini_api_key: "test-key".into(),
        gemini_model: "gemini-test".into(),
        gemini_base_url: "http://127.0.0.1:9".into(),
        generation_timeout: Duration::from_secs(5),
        latex_program: "sh".into(),
        latex_passes: 2,
        compile_timeout: Duration::from_secs(10),
        templates_dir: templates_dir.to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        session_ttl: Duration::from_secs(3600),
        port: 0,
        rust_log: "debug".into(),
    }
}

pub fn test_catalog() -> TemplateCatalog {
    TemplateCatalog::from_templates([(
        "cv_template",
        "\\documentclass{article}\n\\begin{document}\n<<FULL_NAME>> -- <<EMAIL>>\n\\end{document}\n",
    )])
}

pub fn test_state(generator: impl TextGenerator + 'static, tex: &FakeTex) -> AppState {
    let config = test_config(Path::new("templates"));
    AppState {
        sessions: SessionStore::new(config.session_ttl),
        generator: Arc::new(generator),
        compiler: tex.compiler(config.compile_timeout),
        templates: Arc::new(test_catalog()),
        config,
    }
}
