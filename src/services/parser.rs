// src/services/parser.rs

//! Board parser.
//!
//! Extracts raw arrival entries from board markup. Each field is read
//! independently; a missing element degrades that field to [`UNKNOWN`]
//! and the block is still kept.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{BoardSelectors, RawArrivalEntry, UNKNOWN, parse_selector};
use crate::utils::{file_name, normalize_whitespace};

/// Parser for subway and bus boards, which share one block structure.
#[derive(Debug, Clone)]
pub struct BoardParser {
    block: Selector,
    line: Selector,
    line_attr: String,
    destination: Selector,
    time: Selector,
}

impl BoardParser {
    /// Compile the configured selectors.
    pub fn new(selectors: &BoardSelectors) -> Result<Self> {
        Ok(Self {
            block: parse_selector(&selectors.block_selector)?,
            line: parse_selector(&selectors.line_selector)?,
            line_attr: selectors.line_attr.clone(),
            destination: parse_selector(&selectors.destination_selector)?,
            time: parse_selector(&selectors.time_selector)?,
        })
    }

    /// Parse every arrival block, in document order.
    ///
    /// Blank input yields no entries. Input that is not markup at all is
    /// the only failure.
    pub fn parse(&self, markup: &str) -> Result<Vec<RawArrivalEntry>> {
        if markup.trim().is_empty() {
            return Ok(Vec::new());
        }
        if !markup.contains('<') {
            return Err(AppError::Parse("board document is not markup".to_string()));
        }

        let document = Html::parse_document(markup);
        let entries = document
            .select(&self.block)
            .map(|block| self.parse_block(&block))
            .collect();
        Ok(entries)
    }

    fn parse_block(&self, block: &ElementRef) -> RawArrivalEntry {
        let line_id = block
            .select(&self.line)
            .next()
            .and_then(|img| img.value().attr(&self.line_attr))
            .and_then(line_from_image);

        let destination = block
            .select(&self.destination)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()));

        let raw_time = block
            .select(&self.time)
            .last()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()));

        RawArrivalEntry {
            line_id: or_unknown(line_id),
            destination: or_unknown(destination),
            raw_time: or_unknown(raw_time),
        }
    }
}

/// Line identifier encoded in a badge filename such as `linea_3.png`.
fn line_from_image(src: &str) -> Option<String> {
    let name = file_name(src);
    let tail = name.rsplit('_').next().unwrap_or(name);
    let stem = tail.split('.').next().unwrap_or(tail).trim();
    (!stem.is_empty()).then(|| stem.to_string())
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> BoardParser {
        BoardParser::new(&BoardSelectors::default()).unwrap()
    }

    const METRO_BOARD: &str = r#"
<html><body>
  <div style="font-size: 12px; padding-left: 5px;">
    <img src="/img/lineas/linea_3.png" alt="L3">
    <b> Rafelbunyol </b>
    <span>Andén 1</span><span>12:07:00</span>
  </div>
  <div style="padding-left: 5px">
    <img src="/img/lineas/linea_9.png">
    <b>Alboraya Peris Aragó</b>
    <span>00:05:00</span>
  </div>
  <div style="padding-left: 10px"><b>Not an arrival</b></div>
</body></html>"#;

    #[test]
    fn test_parse_metro_board() {
        let entries = parser().parse(METRO_BOARD).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            RawArrivalEntry {
                line_id: "3".to_string(),
                destination: "Rafelbunyol".to_string(),
                raw_time: "12:07:00".to_string(),
            }
        );
        assert_eq!(entries[1].line_id, "9");
        assert_eq!(entries[1].destination, "Alboraya Peris Aragó");
        assert_eq!(entries[1].raw_time, "00:05:00");
    }

    #[test]
    fn test_parse_bus_board() {
        let markup = r#"
<div style="padding-left: 5px;">
  <img src="https://cdn.example.com/emt/bus_C1.gif"><b>Cabanyal</b>
  <span>P. Congressos - 21 min</span>
</div>"#;
        let entries = parser().parse(markup).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line_id, "C1");
        assert_eq!(entries[0].raw_time, "P. Congressos - 21 min");
    }

    #[test]
    fn test_missing_fields_degrade_to_unknown() {
        let markup = r#"
<div style="padding-left: 5px"><img src="/img/linea_5.png"><span>12:00:00</span></div>
<div style="padding-left: 5px"><b>Marítim</b></div>
<div style="padding-left: 5px"><img alt="no src"><b>  </b><span></span></div>"#;
        let entries = parser().parse(markup).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].destination, UNKNOWN);
        assert_eq!(entries[0].line_id, "5");
        assert_eq!(entries[1].line_id, UNKNOWN);
        assert_eq!(entries[1].raw_time, UNKNOWN);
        assert_eq!(entries[1].destination, "Marítim");
        assert_eq!(entries[2].line_id, UNKNOWN);
        assert_eq!(entries[2].destination, UNKNOWN);
        assert_eq!(entries[2].raw_time, UNKNOWN);
    }

    #[test]
    fn test_board_without_blocks_is_empty() {
        assert!(parser().parse("<html><body><p>Sin servicio</p></body></html>").unwrap().is_empty());
        assert!(parser().parse("").unwrap().is_empty());
        assert!(parser().parse("  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_non_markup_is_error() {
        assert!(matches!(
            parser().parse("502 Bad Gateway"),
            Err(AppError::Parse(_))
        ));
    }

    #[test]
    fn test_line_from_image() {
        assert_eq!(line_from_image("/img/linea_3.png"), Some("3".to_string()));
        assert_eq!(line_from_image("img/logo.png"), Some("logo".to_string()));
        assert_eq!(line_from_image("/img/linea_.png"), None);
        assert_eq!(line_from_image(""), None);
    }
}
