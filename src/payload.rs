//! Static per-step form payloads for the simulated UI events.
//!
//! Each template carries the minimum extra fields the server needs to accept
//! the POST as an authentic UI-originated postback; the session's hidden
//! state tokens are merged in separately by the fetcher.

use serde_json::{json, Value};

use crate::session::Payload;

/// Simulated click on the "Votes" tab of the main body page.
pub fn select_votes_tab() -> Payload {
    to_form(json!({
        "__EVENTTARGET": "ctl00$ContentPlaceHolder1$tabTop",
        "__EVENTARGUMENT": r#"{"type":0,"index":"2"}"#,
        "__LASTFOCUS": "",
        "ctl00_RadScriptManager1_TSM": "",
        "ctl00_tabTop_ClientState": r#"{"selectedIndexes":["2"],"logEntries":[],"scrollState":{}}"#,
    }))
}

/// Simulated selection of `year` at 1-based dropdown position `index`.
///
/// The combo box wants the event argument, the literal year text and its
/// own client-state blob to agree, or the selection is ignored server-side.
pub fn select_year(year: &str, index: u32) -> Payload {
    let client_state = format!(
        r#"{{"logEntries":[],"value":"{year}","text":"{year}","enabled":true,"checkedIndices":[],"checkedItemsTextOverflows":false}}"#
    );
    to_form(json!({
        "__EVENTTARGET": "ctl00$ContentPlaceHolder1$lstTimePeriodVoting",
        "__EVENTARGUMENT": format!(r#"{{"Command":"Select","Index":{index}}}"#),
        "__LASTFOCUS": "",
        "ctl00_RadScriptManager1_TSM": "",
        "ctl00$ContentPlaceHolder1$lstTimePeriodVoting": year,
        "ctl00_ContentPlaceHolder1_lstTimePeriodVoting_ClientState": client_state,
    }))
}

/// Simulated click on a grid pager control, using the target/argument pair
/// recovered from the pager's doPostBack callout.
pub fn select_page(target: &str, argument: &str) -> Payload {
    to_form(json!({
        "__EVENTTARGET": target,
        "__EVENTARGUMENT": argument,
        "__LASTFOCUS": "",
        "ctl00_RadScriptManager1_TSM": "",
    }))
}

fn to_form(template: Value) -> Payload {
    let Value::Object(map) = template else {
        unreachable!("payload templates are json objects");
    };
    map.into_iter()
        .map(|(field, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (field, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_selection_carries_index_and_literal_text() {
        let form = select_year("2024", 3);
        assert_eq!(
            form.get("__EVENTARGUMENT").map(String::as_str),
            Some(r#"{"Command":"Select","Index":3}"#)
        );
        assert_eq!(
            form.get("ctl00$ContentPlaceHolder1$lstTimePeriodVoting")
                .map(String::as_str),
            Some("2024")
        );
        let blob = form
            .get("ctl00_ContentPlaceHolder1_lstTimePeriodVoting_ClientState")
            .unwrap();
        assert!(blob.contains(r#""value":"2024""#));
        assert!(blob.contains(r#""text":"2024""#));
    }

    #[test]
    fn page_selection_uses_recovered_target_and_argument() {
        let form = select_page("ctl00$ContentPlaceHolder1$gridVoting$ctl00", "Page$3");
        assert_eq!(
            form.get("__EVENTTARGET").map(String::as_str),
            Some("ctl00$ContentPlaceHolder1$gridVoting$ctl00")
        );
        assert_eq!(form.get("__EVENTARGUMENT").map(String::as_str), Some("Page$3"));
    }

    #[test]
    fn tab_selection_simulates_the_votes_tab_click() {
        let form = select_votes_tab();
        assert_eq!(
            form.get("__EVENTTARGET").map(String::as_str),
            Some("ctl00$ContentPlaceHolder1$tabTop")
        );
        assert_eq!(
            form.get("__EVENTARGUMENT").map(String::as_str),
            Some(r#"{"type":0,"index":"2"}"#)
        );
    }
}
