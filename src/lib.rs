//! # folio
//!
//! Convert structured XML manuscripts into an HTML chapter tree or a single
//! LaTeX document.
//!
//! ## Features
//!
//! - Chapters, sections, bold text, tables, figures, citations and
//!   cross-references
//! - Inline math rendered as styled Unicode text whenever that is lossless
//! - Equations, plots and complex formulas rasterized through a TeX toolchain
//! - Document grammar enforced per backend with precise errors
//!
//! ## Quick Start
//!
//! ```no_run
//! use folio::{HtmlConfig, convert_html};
//! use folio::render::TexRenderer;
//!
//! let source = std::fs::read_to_string("thesis.xml").unwrap();
//! let report = convert_html(&source, &HtmlConfig::new("html"), &TexRenderer::new()).unwrap();
//! println!("wrote {} chapters", report.chapters.len());
//! ```
//!
//! ## Driving a backend directly
//!
//! Both backends implement [`OutputState`], so a document can also be built
//! without XML:
//!
//! ```
//! use folio::{LatexConfig, LatexOutput, OutputState, Preamble};
//! use folio::render::FixedRenderer;
//!
//! let renderer = FixedRenderer::svg();
//! let config = LatexConfig { preamble: Preamble::Minimal, ..LatexConfig::default() };
//! let mut tex = Vec::new();
//! {
//!     let mut out = LatexOutput::new(&mut tex, config, &renderer);
//!     out.create_root().unwrap();
//!     out.section("Results", 0, Some("sec:results")).unwrap();
//!     out.put_text("All good.").unwrap();
//!     out.finish().unwrap();
//!     out.finish().unwrap();
//! }
//! let tex = String::from_utf8(tex).unwrap();
//! assert!(tex.contains("\\section{Results}\n\\label{sec:results}\n"));
//! ```

pub mod convert;
pub mod error;
pub mod math;
pub mod output;
pub mod render;
pub mod source;
pub mod util;
pub mod walk;

pub use convert::{Backend, HtmlReport, convert_html, convert_latex};
pub use error::{Error, Result};
pub use output::{HtmlConfig, HtmlOutput, LatexConfig, LatexOutput, OutputState, Preamble};
pub use render::{Renderer, TexRenderer, ToolchainConfig};
pub use source::{DocumentNode, parse_document};
