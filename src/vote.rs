//! Typed view of the voting grid: schema guard, per-row vote records, and
//! the sink interface external persistence plugs into.

use chrono::NaiveDate;
use scraper::Html;
use tracing::warn;

use crate::grid::{self, Row};
use crate::{Error, Result, BASE_SITE};

/// Leading columns the voting grid must carry, in order. Everything after
/// them is a supervisor name column. A mismatch means the remote markup
/// changed and no row can be trusted.
pub const EXPECTED_HEADERS: [&str; 6] = [
    "File #",
    "Action Date",
    "Title",
    "Action Details",
    "Meeting Details",
    "Tally",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteCast {
    Aye,
    No,
}

/// One grid row, parsed. `detail_url` points at the proposal detail page
/// for the external detail-scraping collaborator.
#[derive(Debug, Clone)]
pub struct VoteRecord {
    pub file_number: i64,
    pub action_date: NaiveDate,
    pub title: String,
    pub detail_url: Option<String>,
    /// Supervisor display name -> vote, for supervisors who voted Aye or
    /// No. Absences and recusals are not recorded.
    pub votes: Vec<(String, VoteCast)>,
}

/// Collaborator interface for persisting scraped votes. One sink per walk.
pub trait VoteSink {
    /// Called once per grid page, before that page's records, with the
    /// supervisor columns seen on it.
    fn begin_page(&mut self, supervisors: &[String]) -> Result<()> {
        let _ = supervisors;
        Ok(())
    }

    fn record(&mut self, record: VoteRecord) -> Result<()>;

    /// Called when the walk unwinds with an error, so not-yet-committed
    /// state can be discarded.
    fn rollback(&mut self) {}
}

/// Parses one page of the voting grid into typed records.
///
/// The header schema is asserted before any row is trusted. Individual rows
/// that fail to parse are logged and skipped; isolated malformed records
/// must not abort a multi-year run.
pub fn parse_vote_page(doc: &Html, grid_id: &str) -> Result<(Vec<String>, Vec<VoteRecord>)> {
    let (headers, rows) = grid::extract_grid(doc, grid_id)?;
    check_schema(&headers)?;
    let supervisors: Vec<String> = headers[EXPECTED_HEADERS.len()..].to_vec();

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        match row_to_record(row, &supervisors) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(%error, "skipping unparsable vote row");
            }
        }
    }
    Ok((supervisors, records))
}

fn check_schema(headers: &[String]) -> Result<()> {
    let leading: Vec<&str> = headers
        .iter()
        .take(EXPECTED_HEADERS.len())
        .map(String::as_str)
        .collect();
    if leading != EXPECTED_HEADERS {
        return Err(Error::SchemaMismatch {
            expected: EXPECTED_HEADERS.iter().map(|h| (*h).to_owned()).collect(),
            found: headers.to_vec(),
        });
    }
    Ok(())
}

fn row_to_record(row: &Row, supervisors: &[String]) -> Result<VoteRecord> {
    let file_cell = field(row, "File #")?;
    let file_number: i64 = file_cell.text.parse().map_err(|_| Error::RowField {
        column: "File #",
        value: file_cell.text.clone(),
    })?;
    let detail_url = file_cell.href.as_deref().map(absolute_url);

    let date_text = &field(row, "Action Date")?.text;
    let action_date = parse_date(date_text)?;

    let title = field(row, "Title")?.text.clone();

    let mut votes = Vec::new();
    for name in supervisors {
        let Some(cell) = row.get(name) else { continue };
        let cast = match cell.text.as_str() {
            "Aye" => VoteCast::Aye,
            "No" => VoteCast::No,
            _ => continue,
        };
        votes.push((name.clone(), cast));
    }

    Ok(VoteRecord {
        file_number,
        action_date,
        title,
        detail_url,
        votes,
    })
}

fn field<'a>(row: &'a Row, column: &'static str) -> Result<&'a grid::Cell> {
    row.get(column).ok_or(Error::RowField {
        column,
        value: String::from("<missing>"),
    })
}

/// American `mm/dd/yyyy`, the only date format the grid uses.
fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%m/%d/%Y").map_err(|_| Error::RowField {
        column: "Action Date",
        value: text.to_owned(),
    })
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_owned()
    } else {
        format!("{BASE_SITE}/{}", href.trim_start_matches('/'))
    }
}

/// Sink that accumulates everything in memory. Used by tests; also handy
/// for dry runs.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub pages: Vec<Vec<String>>,
    pub records: Vec<VoteRecord>,
    pub rolled_back: bool,
}

impl VoteSink for CollectSink {
    fn begin_page(&mut self, supervisors: &[String]) -> Result<()> {
        self.pages.push(supervisors.to_vec());
        Ok(())
    }

    fn record(&mut self, record: VoteRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn rollback(&mut self) {
        self.rolled_back = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    const GRID_ID: &str = "grid_votes";

    fn vote_page(headers: &[&str], body_rows: &str) -> Html {
        let header_cells: String = headers
            .iter()
            .map(|h| format!(r#"<th class="rgHeader">{h}</th>"#))
            .collect();
        Html::parse_document(&format!(
            r#"<table id="{GRID_ID}">
              <thead><tr>{header_cells}</tr></thead>
              <tbody>{body_rows}</tbody>
            </table>"#
        ))
    }

    fn full_headers(supervisors: &[&'static str]) -> Vec<&'static str> {
        EXPECTED_HEADERS
            .iter()
            .chain(supervisors)
            .copied()
            .collect()
    }

    fn row(file: &str, date: &str, votes: &[&str]) -> String {
        let vote_cells: String = votes.iter().map(|v| format!("<td>{v}</td>")).collect();
        format!(
            r#"<tr class="rgRow">
              <td><a href="/LegislationDetail.aspx?ID={file}">{file}</a></td>
              <td>{date}</td><td>Some measure</td><td>Action</td><td>Meeting</td><td>5-0</td>
              {vote_cells}</tr>"#
        )
    }

    #[test]
    fn rows_become_typed_records() {
        let headers = full_headers(&["Chan", "Peskin"]);
        let doc = vote_page(
            &headers,
            &[
                row("240001", "01/23/2024", &["Aye", "No"]),
                row("240002", "02/06/2024", &["Aye", "Excused"]),
            ]
            .join(""),
        );
        let (supervisors, records) = parse_vote_page(&doc, GRID_ID).unwrap();
        assert_eq!(supervisors, vec!["Chan", "Peskin"]);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.file_number, 240001);
        assert_eq!(
            first.action_date,
            NaiveDate::from_ymd_opt(2024, 1, 23).unwrap()
        );
        assert_eq!(
            first.detail_url.as_deref(),
            Some("https://sfgov.legistar.com/LegislationDetail.aspx?ID=240001")
        );
        assert_eq!(
            first.votes,
            vec![
                ("Chan".to_owned(), VoteCast::Aye),
                ("Peskin".to_owned(), VoteCast::No)
            ]
        );
        // Non Aye/No casts are not recorded.
        assert_eq!(records[1].votes, vec![("Chan".to_owned(), VoteCast::Aye)]);
    }

    #[test]
    fn header_mismatch_is_fatal_and_yields_no_rows() {
        // "Tally" column missing.
        let doc = vote_page(
            &["File #", "Action Date", "Title", "Action Details", "Meeting Details", "Chan"],
            &row("240001", "01/23/2024", &["Aye"]),
        );
        assert!(matches!(
            parse_vote_page(&doc, GRID_ID),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let headers = full_headers(&["Chan"]);
        let doc = vote_page(
            &headers,
            &[
                row("not-a-number", "01/23/2024", &["Aye"]),
                row("240002", "13/45/2024", &["Aye"]),
                row("240003", "03/05/2024", &["Aye"]),
            ]
            .join(""),
        );
        let (_, records) = parse_vote_page(&doc, GRID_ID).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_number, 240003);
    }

    #[test]
    fn date_parsing_is_strict_american_format() {
        assert!(parse_date("01/23/2024").is_ok());
        assert!(matches!(
            parse_date("2024-01-23"),
            Err(Error::RowField { column: "Action Date", .. })
        ));
    }

    #[test]
    fn missing_expected_cell_is_a_row_error() {
        let mut row = Row::new();
        row.insert(
            "File #".to_owned(),
            Cell {
                text: "240001".to_owned(),
                href: None,
            },
        );
        assert!(matches!(
            row_to_record(&row, &[]),
            Err(Error::RowField { column: "Action Date", .. })
        ));
    }
}
