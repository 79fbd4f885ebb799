//! Parsing and building the non-feed payloads Bamboo exchanges.
//!
//! - label editor HTML fragments (`data-label` attributes)
//! - REST `result` XML
//! - REST `comment` XML

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Deserialize;

use bambot_shared::{BambotError, BuildResult, Result};

/// Every element carrying a label name.
static LABEL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-label]").expect("label selector"));

/// Label names present in a label-editor HTML fragment, in document order.
pub fn parse_labels(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&LABEL_SELECTOR)
        .filter_map(|el| el.value().attr("data-label"))
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize)]
struct RestResult {
    #[serde(rename = "planName", default)]
    plan_name: String,
    #[serde(rename = "vcsRevisionKey", default)]
    vcs_revision_key: String,
    #[serde(rename = "buildState", default)]
    build_state: String,
}

/// Parse the REST `result` resource.
pub fn parse_build_result(xml: &str) -> Result<BuildResult> {
    let raw: RestResult = quick_xml::de::from_str(xml)
        .map_err(|e| BambotError::parse(format!("invalid build result XML: {e}")))?;

    Ok(BuildResult {
        plan_name: raw.plan_name,
        vcs_revision_key: raw.vcs_revision_key,
        build_state: raw.build_state,
    })
}

/// XML request body for posting `content` as a build comment.
pub fn comment_body(content: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <comment>\n  <content>{}</content>\n</comment>",
        quick_xml::escape::escape(content)
    )
}
