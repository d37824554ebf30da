//! Turns the results grid into header-keyed row mappings.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};

use crate::{selector, Error, Result};

/// One grid cell: normalized text plus the first embedded link, if any.
/// The `File #` cells link to the proposal detail page, which downstream
/// collaborators fetch separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub href: Option<String>,
}

pub type Row = BTreeMap<String, Cell>;

/// Extracts `(headers, rows)` from the grid with the given element id, each
/// row a header-keyed cell map built by zipping the header cells with the
/// row's cells in document order.
pub fn extract_grid(doc: &Html, grid_id: &str) -> Result<(Vec<String>, Vec<Row>)> {
    let grid_sel = selector(&format!("#{grid_id}"))?;
    let header_sel = selector(".rgHeader")?;
    let row_sel = selector("tr.rgRow")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a")?;

    let grid = doc
        .select(&grid_sel)
        .next()
        .ok_or_else(|| Error::MissingElement(grid_id.to_owned()))?;

    let headers: Vec<String> = grid.select(&header_sel).map(extract_text).collect();

    let mut rows = Vec::new();
    for row_element in grid.select(&row_sel) {
        let mut cells = Row::new();
        for (header, cell) in headers.iter().zip(row_element.select(&cell_sel)) {
            let href = cell
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_owned);
            cells.insert(
                header.clone(),
                Cell {
                    text: extract_text(cell),
                    href,
                },
            );
        }
        rows.push(cells);
    }

    Ok((headers, rows))
}

/// Element text with whitespace trimmed and non-breaking spaces turned into
/// regular spaces.
pub(crate) fn extract_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_owned()
}
