//! Download and print packaging for finished documents.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

pub const DEFAULT_FILE_STEM: &str = "document";
pub const DOWNLOAD_EXTENSION: &str = "html";

const PRINT_STYLESHEET: &str = "@media print { hr { page-break-after: always; } }\n      body { font-family: Arial, sans-serif; margin: 20px; }";

static H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h2[^>]*>(.*?)</h2>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// File stem taken from the first `<h1>`, else the first `<h2>`.
///
/// Path-unsafe characters are dropped; falls back to [`DEFAULT_FILE_STEM`].
pub fn file_stem(markup: &str) -> String {
    let heading = H1
        .captures(markup)
        .or_else(|| H2.captures(markup))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");

    let text = TAG.replace_all(heading, "");
    let text = SPACES.replace_all(text.trim(), " ");
    let stem: String = text
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let stem = stem.trim();

    if stem.is_empty() {
        DEFAULT_FILE_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Name offered for the downloadable copy, e.g. `Invoice.html`.
pub fn download_filename(markup: &str) -> String {
    format!("{}.{}", file_stem(markup), DOWNLOAD_EXTENSION)
}

/// Write the markup verbatim into `dir` under [`download_filename`].
pub fn write_download(markup: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(download_filename(markup));
    std::fs::write(&path, markup)?;
    tracing::info!(path = %path.display(), "document written");
    Ok(path)
}

/// Minimal standalone page around the markup with the print stylesheet.
pub fn print_shell(markup: &str) -> String {
    format!(
        "<html>\n  <head>\n    <title>{title}</title>\n    <style>\n      {style}\n    </style>\n  </head>\n  <body>\n    {body}\n  </body>\n</html>\n",
        title = file_stem(markup),
        style = PRINT_STYLESHEET,
        body = markup,
    )
}

/// Write the print shell next to the download as `<stem>.print.html`.
pub fn write_print_shell(markup: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.print.{}", file_stem(markup), DOWNLOAD_EXTENSION));
    std::fs::write(&path, print_shell(markup))?;
    tracing::info!(path = %path.display(), "print version written");
    Ok(path)
}
