// src/models/selectors.rs

//! CSS selectors for scraping an arrival board.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// CSS selectors for scraping an arrival board.
///
/// Subway and bus boards share the same block structure, so a single set
/// of selectors covers both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSelectors {
    /// Selector for each arrival block on the board
    #[serde(default = "default_block_selector")]
    pub block_selector: String,

    /// Selector for the line badge image within a block
    #[serde(default = "default_line_selector")]
    pub line_selector: String,

    /// Attribute of the line badge holding the image filename
    #[serde(default = "default_line_attr")]
    pub line_attr: String,

    /// Selector for the destination element within a block
    #[serde(default = "default_destination_selector")]
    pub destination_selector: String,

    /// Selector for the time elements within a block; the last match wins
    #[serde(default = "default_time_selector")]
    pub time_selector: String,
}

fn default_block_selector() -> String {
    r#"div[style*="padding-left: 5px"]"#.to_string()
}

fn default_line_selector() -> String {
    "img".to_string()
}

fn default_line_attr() -> String {
    "src".to_string()
}

fn default_destination_selector() -> String {
    "b".to_string()
}

fn default_time_selector() -> String {
    "span".to_string()
}

impl Default for BoardSelectors {
    fn default() -> Self {
        Self {
            block_selector: default_block_selector(),
            line_selector: default_line_selector(),
            line_attr: default_line_attr(),
            destination_selector: default_destination_selector(),
            time_selector: default_time_selector(),
        }
    }
}

impl BoardSelectors {
    /// Check that every selector compiles.
    pub fn validate(&self) -> Result<()> {
        for s in [
            &self.block_selector,
            &self.line_selector,
            &self.destination_selector,
            &self.time_selector,
        ] {
            parse_selector(s)?;
        }
        if self.line_attr.trim().is_empty() {
            return Err(AppError::validation("board.selectors.line_attr is empty"));
        }
        Ok(())
    }
}

/// Compile a CSS selector, mapping failures into [`AppError::Selector`].
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
