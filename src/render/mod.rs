//! Rasterization of math, equations and plots.
//!
//! Contexts that cannot be expressed in the target markup hand a fragment to
//! a [`Renderer`] and store the resulting image with an [`AssetStore`].

mod tex;

pub use tex::{TexRenderer, ToolchainConfig};

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// What a fragment describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Inline formula, already wrapped in `$` delimiters.
    Math,
    /// Body of a display equation.
    Equation,
    /// Plot description.
    Plot,
}

/// Image format requested from a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Pdf,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Pdf => "pdf",
        }
    }
}

/// Turns a markup fragment into image bytes.
///
/// Calls are synchronous; a renderer must fail rather than return an empty
/// image.
pub trait Renderer {
    fn render(&self, fragment: &str, kind: AssetKind, format: ImageFormat) -> Result<Vec<u8>>;
}

/// A recorded [`FixedRenderer`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub fragment: String,
    pub kind: AssetKind,
    pub format: ImageFormat,
}

/// Renderer returning canned bytes, for running conversions without a TeX
/// installation.
#[derive(Debug, Default)]
pub struct FixedRenderer {
    bytes: Vec<u8>,
    requests: RefCell<Vec<RenderRequest>>,
}

impl FixedRenderer {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// A renderer producing a tiny placeholder SVG.
    pub fn svg() -> Self {
        Self::new(&br#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"/>"#[..])
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.borrow().clone()
    }
}

impl Renderer for FixedRenderer {
    fn render(&self, fragment: &str, kind: AssetKind, format: ImageFormat) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(RenderRequest {
            fragment: fragment.to_string(),
            kind,
            format,
        });
        Ok(self.bytes.clone())
    }
}

/// Writes rendered images into a directory under unique names.
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    href_prefix: String,
}

impl AssetStore {
    /// `dir` is where files go, `href_prefix` how documents refer to it.
    pub fn new(dir: impl Into<PathBuf>, href_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            href_prefix: href_prefix.into(),
        }
    }

    /// Store image bytes as `<pid>_<random>.<ext>`, returning the reference
    /// to put in the document.
    pub fn store(&self, bytes: &[u8], format: ImageFormat) -> Result<String> {
        std::fs::create_dir_all(&self.dir)?;

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}_", std::process::id()))
            .suffix(&format!(".{}", format.extension()))
            .rand_bytes(8)
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        let (_, path) = file.keep().map_err(|e| Error::Io(e.error))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(if self.href_prefix.is_empty() {
            name
        } else {
            format!("{}/{}", self.href_prefix.trim_end_matches('/'), name)
        })
    }
}

/// Render a fragment and store the image, returning its reference.
pub fn rasterize(
    renderer: &dyn Renderer,
    store: &AssetStore,
    fragment: &str,
    kind: AssetKind,
    format: ImageFormat,
) -> Result<String> {
    let bytes = renderer.render(fragment, kind, format)?;
    if bytes.is_empty() {
        return Err(Error::tool(
            "renderer",
            format!("produced an empty image for {kind:?} fragment"),
        ));
    }
    let href = store.store(&bytes, format)?;
    tracing::debug!("rasterized {kind:?} fragment to {href}");
    Ok(href)
}
