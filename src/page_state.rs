//! Parses the state of the voting form out of a fetched page: which years
//! the period dropdown offers, and where the grid's pager points next.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::grid::extract_text;
use crate::{selector, Error, Result, VOTING_GRID_ID, YEAR_SELECTOR_ID};

/// A pager label meaning "more pages exist beyond the visible window", not a
/// literal page number.
const ELLIPSIS: &str = "...";

/// Everything needed to drive the next simulated UI event.
#[derive(Debug)]
pub struct PageState {
    /// Year label -> 1-based dropdown position, in document order. The
    /// position is what the server expects in the selection postback.
    pub year_indices: BTreeMap<String, u32>,
    pub pager: Pager,
}

/// Pagination descriptor for the voting grid.
///
/// `next` being `None` is the sole terminal signal: either the grid has no
/// pager row at all (a single page of data) or the current page is the last
/// one in the set.
#[derive(Debug, Default)]
pub struct Pager {
    pub current_page: Option<String>,
    pub next: Option<NextPage>,
}

#[derive(Debug)]
pub struct NextPage {
    /// Display label of the next page. For an ellipsis marker this is
    /// computed as current + 1; it names cache entries and log lines only,
    /// the POST is driven by `target`/`argument`.
    pub label: String,
    /// `__EVENTTARGET` for the pagination postback.
    pub target: String,
    /// `__EVENTARGUMENT` for the pagination postback.
    pub argument: String,
}

impl PageState {
    pub fn parse(doc: &Html) -> Result<Self> {
        let year_indices = parse_year_dropdown(doc)?;
        let pager = parse_pager(doc)?;
        debug!(
            years = year_indices.len(),
            current_page = pager.current_page.as_deref(),
            next_page = pager.next.as_ref().map(|n| n.label.as_str()),
            "parsed page state"
        );
        Ok(Self {
            year_indices,
            pager,
        })
    }
}

fn parse_year_dropdown(doc: &Html) -> Result<BTreeMap<String, u32>> {
    let dropdown_sel = selector(&format!("#{YEAR_SELECTOR_ID}"))?;
    let item_sel = selector("ul > li")?;

    let dropdown = doc
        .select(&dropdown_sel)
        .next()
        .ok_or_else(|| Error::MissingElement(YEAR_SELECTOR_ID.to_owned()))?;

    let mut indices = BTreeMap::new();
    for (position, item) in dropdown.select(&item_sel).enumerate() {
        let label = extract_text(item);
        // The server indexes dropdown entries from 1.
        let index = position as u32 + 1;
        if indices.insert(label.clone(), index).is_some() {
            return Err(Error::DuplicateYearLabel(label));
        }
    }
    Ok(indices)
}

fn parse_pager(doc: &Html) -> Result<Pager> {
    let grid_sel = selector(&format!("#{VOTING_GRID_ID}"))?;
    let current_sel = selector("thead tr.rgPager a.rgCurrentPage")?;
    let span_sel = selector("span")?;

    let grid = doc
        .select(&grid_sel)
        .next()
        .ok_or_else(|| Error::MissingElement(VOTING_GRID_ID.to_owned()))?;

    // No current-page marker means the results are not paginated at all.
    let Some(current) = grid.select(&current_sel).next() else {
        return Ok(Pager::default());
    };
    let current_label = match current.select(&span_sel).next() {
        Some(span) => extract_text(span),
        None => return Ok(Pager::default()),
    };

    // The control following the current-page marker is the "next page"
    // link, when one exists.
    let Some(sibling) = next_element_sibling(current) else {
        return Ok(Pager {
            current_page: Some(current_label),
            next: None,
        });
    };
    let Some(label_span) = sibling.select(&span_sel).next() else {
        return Ok(Pager {
            current_page: Some(current_label),
            next: None,
        });
    };

    let raw_label = extract_text(label_span);
    let label = if raw_label == ELLIPSIS {
        // Display artifact for "more pages than the pager window shows";
        // the true next page is simply current + 1.
        let current_number: u64 = current_label
            .parse()
            .map_err(|_| Error::PagerLabel(current_label.clone()))?;
        (current_number + 1).to_string()
    } else {
        raw_label
    };

    // The pager "links" are script callouts, not hyperlinks: the two quoted
    // doPostBack arguments are the event target/argument of the pagination
    // POST. Without them traversal cannot continue.
    let href = sibling.value().attr("href").unwrap_or_default();
    let (target, argument) =
        parse_postback(href).ok_or_else(|| Error::PostbackGrammar(href.to_owned()))?;

    Ok(Pager {
        current_page: Some(current_label),
        next: Some(NextPage {
            label,
            target,
            argument,
        }),
    })
}

fn next_element_sibling(element: ElementRef) -> Option<ElementRef> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Extracts the two quoted arguments of a `doPostBack('target','argument')`
/// invocation embedded in an href.
fn parse_postback(href: &str) -> Option<(String, String)> {
    let rest = href.split_once("doPostBack(")?.1;
    let rest = rest.trim_start().strip_prefix('\'')?;
    let (target, rest) = rest.split_once('\'')?;
    let rest = rest.trim_start().strip_prefix(',')?;
    let rest = rest.trim_start().strip_prefix('\'')?;
    let (argument, _) = rest.split_once('\'')?;
    Some((target.to_owned(), argument.to_owned()))
}
