//! Configuration types for trial-table extraction.
//!
//! All behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. Rendering choices that used to be global
//! (the markdown line-break marker, whether footnotes are printed) travel
//! with the config and reach the renderer as [`MarkdownOptions`].

use crate::error::Trial2MdError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Configuration for one conversion.
///
/// # Example
/// ```rust
/// use trial2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .line_break_marker("<br/>")
///     .include_metadata(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.line_break_marker, "<br/>");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Marker substituted for line breaks inside table cells. Default: `<br>`.
    ///
    /// A raw newline would end the markdown table row, so multi-line cell
    /// content is always flattened with this marker.
    pub line_break_marker: String,

    /// Append referenced footnotes below each table. Default: true.
    pub include_footnotes: bool,

    /// Render label/value context tables ("Time Frame", "Description", …)
    /// as prose. When false they are dropped. Default: true.
    pub include_context: bool,

    /// Prepend YAML front-matter with title, trial id and sections. Default: false.
    pub include_metadata: bool,

    /// Limits applied while expanding spans into a grid.
    pub limits: GridLimits,

    /// Timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-table progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            line_break_marker: "<br>".to_string(),
            include_footnotes: true,
            include_context: true,
            include_metadata: false,
            limits: GridLimits::default(),
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("line_break_marker", &self.line_break_marker)
            .field("include_footnotes", &self.include_footnotes)
            .field("include_context", &self.include_context)
            .field("include_metadata", &self.include_metadata)
            .field("limits", &self.limits)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The renderer's view of this config.
    pub fn markdown_options(&self) -> MarkdownOptions {
        MarkdownOptions {
            line_break_marker: self.line_break_marker.clone(),
            include_footnotes: self.include_footnotes,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn line_break_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.line_break_marker = marker.into();
        self
    }

    pub fn include_footnotes(mut self, v: bool) -> Self {
        self.config.include_footnotes = v;
        self
    }

    pub fn include_context(mut self, v: bool) -> Self {
        self.config.include_context = v;
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn max_rows(mut self, n: usize) -> Self {
        self.config.limits.max_rows = n.max(1);
        self
    }

    pub fn max_columns(mut self, n: usize) -> Self {
        self.config.limits.max_columns = n.max(1);
        self
    }

    pub fn max_cells(mut self, n: usize) -> Self {
        self.config.limits.max_cells = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Trial2MdError> {
        let c = &self.config;
        if c.line_break_marker.contains('\n') || c.line_break_marker.contains('|') {
            return Err(Trial2MdError::InvalidConfig(format!(
                "line break marker must not contain a newline or a pipe, got {:?}",
                c.line_break_marker
            )));
        }
        if c.download_timeout_secs == 0 {
            return Err(Trial2MdError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Upper bounds for a single expanded table grid.
///
/// Real result tables stay far below these; the limits keep a hostile
/// `rowspan="65534"` from allocating millions of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLimits {
    pub max_rows: usize,
    pub max_columns: usize,
    pub max_cells: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            max_columns: 100,
            max_cells: 100_000,
        }
    }
}

/// Options consumed by the markdown table renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    pub line_break_marker: String,
    pub include_footnotes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        ConversionConfig::default().markdown_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_html_line_break() {
        let c = ConversionConfig::default();
        assert_eq!(c.line_break_marker, "<br>");
        assert!(c.include_footnotes);
        assert!(c.include_context);
        assert!(!c.include_metadata);
        assert_eq!(c.limits.max_columns, 100);
    }

    #[test]
    fn builder_rejects_newline_marker() {
        let err = ConversionConfig::builder()
            .line_break_marker("\n")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("line break marker"));
    }

    #[test]
    fn builder_clamps_limits_to_one() {
        let c = ConversionConfig::builder()
            .max_rows(0)
            .max_columns(0)
            .max_cells(0)
            .build()
            .unwrap();
        assert_eq!(c.limits.max_rows, 1);
        assert_eq!(c.limits.max_columns, 1);
        assert_eq!(c.limits.max_cells, 1);
    }

    #[test]
    fn markdown_options_mirror_config() {
        let c = ConversionConfig::builder()
            .line_break_marker("  ")
            .include_footnotes(false)
            .build()
            .unwrap();
        let opts = c.markdown_options();
        assert_eq!(opts.line_break_marker, "  ");
        assert!(!opts.include_footnotes);
    }

    #[test]
    fn debug_hides_callback() {
        let s = format!("{:?}", ConversionConfig::default());
        assert!(s.contains("line_break_marker"));
        assert!(s.contains("progress_callback: None"));
    }
}
