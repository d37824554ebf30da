//! Scraper for voting records of the SF Board of Supervisors legistar
//! system.
//!
//! Legistar has no REST API: every interaction is a simulated UI event
//! delivered as an HTML-form POST carrying opaque server-issued state
//! tokens. This crate replays that protocol — front page load, "Votes" tab
//! click, year dropdown selection, then one "next page" click per result
//! page — threading the hidden session state between requests and parsing
//! each response to discover the parameters of the next one.
//!
//! Responses are cached on disk by logical step name, so interrupted runs
//! resume instead of re-fetching. Persistence of the scraped rows is left
//! to implementors of [`vote::VoteSink`].

pub mod cache;
pub mod error;
pub mod grid;
pub mod page_state;
pub mod payload;
pub mod session;
pub mod vote;
pub mod walker;

pub use error::{Error, Result};

/// Website root; detail-page links in the grid are relative to it.
pub const BASE_SITE: &str = "https://sfgov.legistar.com";
/// First page to visit, to initialize the form and server-side state.
pub const VOTE_LISTING_FIRST_URL: &str = "https://sfgov.legistar.com/MainBody.aspx";
/// Subsequent requests to update the form UI and scrape the votes go here.
pub const VOTE_PAGING_FORM_URL: &str = "https://sfgov.legistar.com/DepartmentDetail.aspx?ID=7374&GUID=978C35A3-7173-49E6-8FAA-8EA34A7D4160&Mode=MainBody";

/// Id of the element containing the voting table and navigation controls.
pub const VOTING_GRID_ID: &str = "ctl00_ContentPlaceHolder1_gridVoting_ctl00";
/// Drop-down voting-year selector.
pub const YEAR_SELECTOR_ID: &str = "ctl00_ContentPlaceHolder1_lstTimePeriodVoting_DropDown";

pub(crate) fn selector(sel: &str) -> Result<scraper::Selector> {
    scraper::Selector::parse(sel).map_err(|_| Error::Selector(sel.to_owned()))
}
