//! Drives the fixed sequence of simulated UI events that pages through one
//! year of voting records:
//!
//! front page GET -> "Votes" tab click -> year dropdown selection -> page 1
//! -> page N while the pager offers a next target -> done.
//!
//! Every step's request parameters come out of the previous response, so a
//! walk is strictly sequential. One session per walk; never share it.

use std::collections::BTreeMap;

use tracing::info;

use crate::cache::PageCache;
use crate::page_state::PageState;
use crate::session::Fetcher;
use crate::vote::{self, VoteSink};
use crate::{
    payload, Error, Result, VOTE_LISTING_FIRST_URL, VOTE_PAGING_FORM_URL, VOTING_GRID_ID,
};

/// Walks the voting UI for one year at a time.
///
/// Holds the two fixed endpoints: the listing front page (GET once to seed
/// server-side session state) and the paging form URL every simulated UI
/// event POSTs to.
pub struct Walker {
    front_url: String,
    paging_url: String,
}

impl Default for Walker {
    fn default() -> Self {
        Self {
            front_url: VOTE_LISTING_FIRST_URL.to_owned(),
            paging_url: VOTE_PAGING_FORM_URL.to_owned(),
        }
    }
}

impl Walker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the walk at different endpoints, e.g. a local mirror.
    pub fn with_urls(front_url: impl Into<String>, paging_url: impl Into<String>) -> Self {
        Self {
            front_url: front_url.into(),
            paging_url: paging_url.into(),
        }
    }

    /// Scrapes every page of votes for `year`, handing typed records to
    /// `sink` in page order.
    ///
    /// Returns the year -> dropdown-index mapping seen on the votes tab,
    /// for reuse by callers walking several years. On any fatal error the
    /// sink's rollback hook runs before the error propagates; the on-disk
    /// cache keeps all completed fetches, so a re-run resumes from the
    /// failed step.
    pub fn walk_year<C, S>(
        &self,
        fetcher: &mut Fetcher<C>,
        year: u16,
        sink: &mut S,
    ) -> Result<BTreeMap<String, u32>>
    where
        C: PageCache,
        S: VoteSink,
    {
        match self.run(fetcher, year, sink) {
            Ok(year_indices) => Ok(year_indices),
            Err(error) => {
                sink.rollback();
                Err(error)
            }
        }
    }

    fn run<C, S>(
        &self,
        fetcher: &mut Fetcher<C>,
        year: u16,
        sink: &mut S,
    ) -> Result<BTreeMap<String, u32>>
    where
        C: PageCache,
        S: VoteSink,
    {
        let year_label = year.to_string();

        // The front page load exists only to make the server set up its
        // per-session state; the content is not otherwise consumed.
        in_step(
            "frontpage",
            fetcher.fetch(&self.front_url, "frontpage", None),
        )?;

        let doc = in_step(
            "votes-selected",
            fetcher.fetch(
                &self.paging_url,
                "votes-selected",
                Some(payload::select_votes_tab()),
            ),
        )?;
        let year_indices = in_step("votes-selected", PageState::parse(&doc))?.year_indices;

        let index = *year_indices
            .get(&year_label)
            .ok_or_else(|| Error::YearUnavailable(year_label.clone()))?;
        info!(year = year_label.as_str(), index, "selecting voting period");

        let mut page_name = format!("vote-listings-{year}-page-1");
        let mut doc = in_step(
            &page_name,
            fetcher.fetch(
                &self.paging_url,
                &page_name,
                Some(payload::select_year(&year_label, index)),
            ),
        )?;

        loop {
            let (supervisors, records) =
                in_step(&page_name, vote::parse_vote_page(&doc, VOTING_GRID_ID))?;
            sink.begin_page(&supervisors)?;
            let row_count = records.len();
            for record in records {
                sink.record(record)?;
            }
            info!(step = page_name.as_str(), rows = row_count, "scraped vote page");

            let pager = in_step(&page_name, PageState::parse(&doc))?.pager;
            let Some(next) = pager.next else { break };

            page_name = format!("vote-listings-{year}-page-{}", next.label);
            doc = in_step(
                &page_name,
                fetcher.fetch(
                    &self.paging_url,
                    &page_name,
                    Some(payload::select_page(&next.target, &next.argument)),
                ),
            )?;
        }

        Ok(year_indices)
    }
}

fn in_step<T>(name: &str, result: Result<T>) -> Result<T> {
    result.map_err(|error| error.in_step(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemCache;
    use crate::vote::CollectSink;
    use crate::YEAR_SELECTOR_ID;

    const FRONT_PAGE: &str = "<html><body></body></html>";

    // Connection-refused immediately; a fully cached walk never touches it.
    fn offline_walker() -> Walker {
        Walker::with_urls("http://127.0.0.1:9/front", "http://127.0.0.1:9/paging")
    }

    fn vote_page(rows: &str, pager_row: &str) -> String {
        format!(
            r#"<html><body>
            <input type="hidden" id="__VIEWSTATE" value="vs" />
            <div id="{YEAR_SELECTOR_ID}"><div><ul><li>2024</li><li>2023</li></ul></div></div>
            <table id="{VOTING_GRID_ID}">
              <thead>
                {pager_row}
                <tr>
                  <th class="rgHeader">File #</th><th class="rgHeader">Action Date</th>
                  <th class="rgHeader">Title</th><th class="rgHeader">Action Details</th>
                  <th class="rgHeader">Meeting Details</th><th class="rgHeader">Tally</th>
                  <th class="rgHeader">Chan</th>
                </tr>
              </thead>
              <tbody>{rows}</tbody>
            </table>
            </body></html>"#
        )
    }

    fn row(file: &str, date: &str, cast: &str) -> String {
        format!(
            r#"<tr class="rgRow"><td>{file}</td><td>{date}</td><td>Title</td>
            <td>Action</td><td>Meeting</td><td>1-0</td><td>{cast}</td></tr>"#
        )
    }

    fn pager(current: &str, next_label: &str, argument: &str) -> String {
        format!(
            r##"<tr class="rgPager"><td><table><tbody><tr><td><div>
            <a class="rgCurrentPage" href="#"><span>{current}</span></a>
            <a href="javascript:__doPostBack('ctl00$gridVoting','{argument}')"><span>{next_label}</span></a>
            </div></td></tr></tbody></table></td></tr>"##
        )
    }

    fn seeded_cache() -> MemCache {
        let mut cache = MemCache::new();
        cache.seed("frontpage", FRONT_PAGE);
        cache.seed("votes-selected", vote_page("", ""));
        cache.seed(
            "vote-listings-2024-page-1",
            vote_page(
                &[
                    row("240001", "01/23/2024", "Aye"),
                    row("240002", "02/06/2024", "No"),
                ]
                .join(""),
                &pager("1", "2", "Page$2"),
            ),
        );
        cache.seed(
            "vote-listings-2024-page-2",
            vote_page(&row("240003", "03/05/2024", "Aye"), ""),
        );
        cache
    }

    #[test]
    fn two_page_walk_yields_all_rows_in_page_order_then_stops() {
        let mut fetcher = Fetcher::new(seeded_cache()).unwrap();
        let mut sink = CollectSink::default();

        let year_indices = offline_walker()
            .walk_year(&mut fetcher, 2024, &mut sink)
            .unwrap();

        assert_eq!(year_indices.get("2024"), Some(&1));
        assert_eq!(year_indices.get("2023"), Some(&2));

        let files: Vec<i64> = sink.records.iter().map(|r| r.file_number).collect();
        assert_eq!(files, vec![240001, 240002, 240003]);
        assert_eq!(sink.pages, vec![vec!["Chan"], vec!["Chan"]]);
        assert!(!sink.rolled_back);
    }

    #[test]
    fn unavailable_year_fails_and_rolls_back_the_sink() {
        let mut fetcher = Fetcher::new(seeded_cache()).unwrap();
        let mut sink = CollectSink::default();

        let result = offline_walker().walk_year(&mut fetcher, 1999, &mut sink);
        assert!(matches!(result, Err(Error::YearUnavailable(year)) if year == "1999"));
        assert!(sink.rolled_back);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn failed_step_is_named_in_the_error() {
        // Page 2 is missing from the cache and the paging URL is
        // unreachable from tests, so the walk dies on that exact step.
        let mut cache = MemCache::new();
        cache.seed("frontpage", FRONT_PAGE);
        cache.seed("votes-selected", vote_page("", ""));
        cache.seed(
            "vote-listings-2024-page-1",
            vote_page(
                &row("240001", "01/23/2024", "Aye"),
                &pager("1", "2", "Page$2"),
            ),
        );
        let mut fetcher = Fetcher::new(cache).unwrap();
        let mut sink = CollectSink::default();

        let error = offline_walker().walk_year(&mut fetcher, 2024, &mut sink).unwrap_err();
        match error {
            Error::Step { name, .. } => assert_eq!(name, "vote-listings-2024-page-2"),
            other => panic!("expected step error, got {other}"),
        }
        // Page 1 rows were already handed over before the failure.
        assert_eq!(sink.records.len(), 1);
        assert!(sink.rolled_back);
    }
}
