//! Rasterization through an external TeX toolchain.
//!
//! Each request gets its own scratch directory, removed afterwards whether the
//! toolchain succeeded or not.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{Error, Result};

use super::{AssetKind, ImageFormat, Renderer};

/// Programs and options for the typesetting toolchain.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// TeX engine producing PDF (must understand fontspec).
    pub latex: String,
    /// PDF to SVG converter, invoked dvisvgm-style.
    pub svg_converter: String,
    /// OpenType math font for formulas.
    pub math_font: String,
    /// Keep glyphs as embedded fonts in SVG output instead of paths.
    pub keep_text: bool,
    /// Parent of the per-request scratch directories; the system temporary
    /// directory when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            latex: "xelatex".to_string(),
            svg_converter: "dvisvgm".to_string(),
            math_font: "STIX Two Math".to_string(),
            keep_text: false,
            scratch_dir: None,
        }
    }
}

/// Renderer driving `xelatex` and `dvisvgm`.
#[derive(Debug, Clone, Default)]
pub struct TexRenderer {
    config: ToolchainConfig,
}

impl TexRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ToolchainConfig) -> Self {
        self.config = config;
        self
    }

    /// Complete TeX source for a fragment.
    pub fn tex_source(&self, fragment: &str, kind: AssetKind) -> String {
        let mut doc = String::from("\\documentclass[preview,border=1pt]{standalone}\n");
        doc.push_str("\\usepackage{fontspec}\n");
        if kind == AssetKind::Equation {
            doc.push_str("\\usepackage{amsmath}\n");
        }
        doc.push_str("\\usepackage{unicode-math}\n");
        if kind == AssetKind::Plot {
            doc.push_str("\\usepackage{pgfplots}\n\\pgfplotsset{compat=1.17}\n");
        }
        doc.push_str(&format!("\\setmathfont{{{}}}\n", self.config.math_font));
        doc.push_str("\\begin{document}\n");
        match kind {
            AssetKind::Math => {
                doc.push_str(fragment);
                doc.push('\n');
            }
            AssetKind::Equation => {
                doc.push_str("\\begin{equation*}\n");
                doc.push_str(&fragment.replace('\n', " "));
                doc.push_str("\n\\end{equation*}\n");
            }
            AssetKind::Plot => {
                doc.push_str("\\begin{tikzpicture}\n\\begin{axis}\n");
                doc.push_str(fragment.trim());
                doc.push_str("\n\\end{axis}\n\\end{tikzpicture}\n");
            }
        }
        doc.push_str("\\end{document}\n");
        doc
    }

    fn typeset(&self, scratch: &Path, source: &str) -> Result<PathBuf> {
        let tex_path = scratch.join("fragment.tex");
        std::fs::write(&tex_path, source)?;

        let mut cmd = Command::new(&self.config.latex);
        cmd.args(["-interaction=nonstopmode", "-halt-on-error"])
            .arg("-output-directory")
            .arg(scratch)
            .arg(&tex_path)
            .current_dir(scratch);
        debug!("TeX command: {:?}", cmd);

        let output = run(&mut cmd, &self.config.latex)?;
        if !output.status.success() {
            return Err(Error::tool(&self.config.latex, log_tail(&output)));
        }

        let pdf_path = scratch.join("fragment.pdf");
        if !pdf_path.exists() {
            return Err(Error::tool(&self.config.latex, "produced no PDF"));
        }
        Ok(pdf_path)
    }

    fn convert_to_svg(&self, scratch: &Path, pdf_path: &Path) -> Result<Vec<u8>> {
        let svg_path = scratch.join("fragment.svg");

        let mut cmd = Command::new(&self.config.svg_converter);
        cmd.args(["--pdf", "--bbox=min"]);
        if self.config.keep_text {
            cmd.arg("--font-format=woff");
        } else {
            cmd.arg("--no-fonts");
        }
        cmd.arg("-o").arg(&svg_path).arg(pdf_path).current_dir(scratch);
        debug!("SVG command: {:?}", cmd);

        let output = run(&mut cmd, &self.config.svg_converter)?;
        if !output.status.success() || !svg_path.exists() {
            return Err(Error::tool(&self.config.svg_converter, log_tail(&output)));
        }
        Ok(std::fs::read(&svg_path)?)
    }
}

impl Renderer for TexRenderer {
    fn render(&self, fragment: &str, kind: AssetKind, format: ImageFormat) -> Result<Vec<u8>> {
        let prefix = format!("folio_{}_", std::process::id());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let scratch = match &self.config.scratch_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };

        let source = self.tex_source(fragment, kind);
        let pdf_path = self.typeset(scratch.path(), &source)?;

        let bytes = match format {
            ImageFormat::Pdf => std::fs::read(&pdf_path)?,
            ImageFormat::Svg => self.convert_to_svg(scratch.path(), &pdf_path)?,
        };
        scratch.close()?;

        if bytes.is_empty() {
            return Err(Error::tool(&self.config.latex, "produced an empty image"));
        }
        Ok(bytes)
    }
}

fn run(cmd: &mut Command, tool: &str) -> Result<Output> {
    cmd.output()
        .map_err(|e| Error::tool(tool, format!("failed to execute: {e}")))
}

/// Error lines (`!`-prefixed) from the tool's output, or its last lines.
fn log_tail(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let errors: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|l| l.starts_with('!'))
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }

    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(15);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        format!("exited with {}", output.status)
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_source_keeps_delimiters() {
        let source = TexRenderer::new().tex_source("$\\frac{a}{b}$", AssetKind::Math);
        assert!(source.contains("\n$\\frac{a}{b}$\n"));
        assert!(source.contains("\\setmathfont{STIX Two Math}"));
        assert!(!source.contains("amsmath"));
        assert!(source.ends_with("\\end{document}\n"));
    }

    #[test]
    fn test_equation_source_joins_lines() {
        let source = TexRenderer::new().tex_source("a = b\n+ c", AssetKind::Equation);
        assert!(source.contains("\\usepackage{amsmath}"));
        assert!(source.contains("\\begin{equation*}\na = b + c\n\\end{equation*}"));
    }

    #[test]
    fn test_plot_source_wraps_axis() {
        let source = TexRenderer::new().tex_source("\n\\addplot {x^2};\n", AssetKind::Plot);
        assert!(source.contains("\\usepackage{pgfplots}"));
        assert!(source.contains("\\begin{axis}\n\\addplot {x^2};\n\\end{axis}"));
    }

    #[test]
    fn test_missing_toolchain_is_an_error() {
        let renderer = TexRenderer::new().with_config(ToolchainConfig {
            latex: "folio-test-no-such-latex".to_string(),
            ..ToolchainConfig::default()
        });

        match renderer.render("$x$", AssetKind::Math, ImageFormat::Svg) {
            Err(Error::ExternalTool { tool, message }) => {
                assert_eq!(tool, "folio-test-no-such-latex");
                assert!(message.contains("failed to execute"));
            }
            other => panic!("expected ExternalTool error, got {other:?}"),
        }
    }

    fn scratch_entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn renderer_in(scratch: &Path, latex: &str) -> TexRenderer {
        TexRenderer::new().with_config(ToolchainConfig {
            latex: latex.to_string(),
            scratch_dir: Some(scratch.to_path_buf()),
            ..ToolchainConfig::default()
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_scratch_removed_when_tex_fails() {
        let scratch = tempfile::TempDir::new().unwrap();
        let renderer = renderer_in(scratch.path(), "false");

        let err = renderer
            .render("$x$", AssetKind::Math, ImageFormat::Svg)
            .unwrap_err();
        assert!(matches!(err, Error::ExternalTool { ref tool, .. } if tool == "false"));
        assert_eq!(scratch_entries(scratch.path()), Vec::<String>::new());
    }

    #[cfg(unix)]
    #[test]
    fn test_scratch_removed_when_pdf_missing() {
        let scratch = tempfile::TempDir::new().unwrap();
        let renderer = renderer_in(scratch.path(), "true");

        match renderer.render("\\addplot {x};", AssetKind::Plot, ImageFormat::Pdf) {
            Err(Error::ExternalTool { message, .. }) => assert_eq!(message, "produced no PDF"),
            other => panic!("expected ExternalTool error, got {other:?}"),
        }
        assert_eq!(scratch_entries(scratch.path()), Vec::<String>::new());
    }
}
