//! Prompt text for the remote reasoning calls.

use ai_client::truncate_to_char_boundary;

use focusgate_common::{ContentItem, ProfileText, UserInstructions};

/// Body text beyond this many bytes is cut before prompting.
const MAX_BODY_BYTES: usize = 2000;
const MAX_COMMENT_BYTES: usize = 300;

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

fn content_details(item: &ContentItem) -> String {
    let body = truncate_to_char_boundary(item.body_text.trim(), MAX_BODY_BYTES);
    let mut details = format!(
        "- Source: {source}\n\
         - {label}: {key}\n\
         - Title: {title}\n\
         - Content/Description: {body}",
        source = item.source_kind,
        label = item.source_kind.identity_label(),
        key = item.identity_key,
        title = or_placeholder(&item.title, "Not available"),
        body = or_placeholder(body, "Not available"),
    );

    let comments: Vec<&str> = item
        .top_comments()
        .iter()
        .map(|c| truncate_to_char_boundary(c.trim(), MAX_COMMENT_BYTES))
        .filter(|c| !c.is_empty())
        .collect();
    if !comments.is_empty() {
        details.push_str("\n- Top comments:");
        for comment in comments {
            details.push_str("\n  * ");
            details.push_str(comment);
        }
    }

    details
}

pub fn keyword_expansion_prompt(productive_terms: &[String], unwanted_terms: &[String]) -> String {
    let productive = if productive_terms.is_empty() {
        "None".to_string()
    } else {
        productive_terms.join(", ")
    };
    let unwanted = if unwanted_terms.is_empty() {
        "None".to_string()
    } else {
        unwanted_terms.join(", ")
    };

    format!(
        "You turn user-provided topics into keyword lists used for fast local text matching.\n\n\
         Return one JSON object with two maps, \"productive\" and \"unwanted\".\n\
         The keys of each map are the EXACT user terms listed below. Each value is an array of \
         8-15 short keywords or phrases for that term: synonyms, slang, well-known channel or \
         community names, common hashtags and frequent misspellings.\n\
         Keywords must be lowercase and concise, with no duplicates and no explanations.\n\n\
         User terms:\n\
         - Productive: {productive}\n\
         - Unwanted: {unwanted}\n\n\
         Output only JSON shaped like:\n\
         {{\n  \"productive\": {{ \"<term>\": [\"k1\", \"k2\"] }},\n  \"unwanted\": {{ \"<term>\": [\"k1\", \"k2\"] }}\n}}"
    )
}

pub fn instructions_prompt(profile: &ProfileText) -> String {
    format!(
        "You build personalised rules for a content classifier from a user's preferences.\n\n\
         Preferences:\n\
         - Productive content (educational or work-relevant): {productive}\n\
         - Unwanted content (to avoid): {unwanted}\n\n\
         Produce two concise lists:\n\
         - relevant_topics: generalised from the productive content; topics, styles or keywords \
         the user would find educational, useful or professionally relevant.\n\
         - entertainment_indicators: generalised from the unwanted content and common \
         entertainment patterns; content types, tones or formats the user would see as \
         primarily entertainment.\n\
         Keep each entry short (at most 6-8 words) and include brief examples.\n\n\
         Respond with a single valid JSON object and nothing else:\n\
         {{ \"relevant_topics\": [\"...\"], \"entertainment_indicators\": [\"...\"] }}",
        productive = or_placeholder(&profile.productive, "Not specified"),
        unwanted = or_placeholder(&profile.unwanted, "Not specified"),
    )
}

pub fn dual_list_prompt(
    item: &ContentItem,
    productive: &str,
    unwanted: &str,
    instructions: Option<&UserInstructions>,
) -> String {
    let guidance = instructions
        .filter(|i| !i.is_empty())
        .and_then(|i| serde_json::to_string(i).ok())
        .unwrap_or_else(|| "Not available".to_string());

    format!(
        "You are a strict content classification assistant. Decide whether a piece of content \
         is 'entertainment' for this particular user.\n\n\
         User preferences:\n\
         - Productive content (high priority). Content matching these topics, creators or \
         keywords is important to the user and is NOT entertainment, unless it also matches \
         the unwanted list:\n  {productive}\n\
         - Unwanted content (explicit block). The user wants content matching these blocked:\n  {unwanted}\n\
         - Generated guidance:\n  {guidance}\n\n\
         Content to classify:\n{details}\n\n\
         Reason in four steps:\n\
         1. Productive match: does the title, {label_lower} or description match the productive list?\n\
         2. Unwanted match: does it match the unwanted list?\n\
         3. General nature: comedy sketch, lecture, news report, tutorial, etc.\n\
         4. Conclusion, applying these rules in order:\n\
            A. A productive match means NOT entertainment, unless there is also an unwanted match.\n\
            B. An unwanted match means entertainment.\n\
            C. Otherwise decide from the general nature of the content.\n\n\
         Respond ONLY with one JSON object:\n\
         {{\n  \"reasoning\": \"Step 1 (Productive): ... Step 2 (Unwanted): ... Step 3 (General): ... Step 4 (Conclusion): ...\",\n  \"entertainment\": true or false\n}}",
        productive = or_placeholder(productive, "Not provided"),
        unwanted = or_placeholder(unwanted, "Not provided"),
        details = content_details(item),
        label_lower = item.source_kind.identity_label().to_lowercase(),
    )
}

pub fn strict_gate_prompt(item: &ContentItem, productive: &str) -> String {
    format!(
        "You are a STRICT productive-content gatekeeper.\n\n\
         The user's ONLY productive topics, creators and keywords are:\n  {productive}\n\n\
         Decide whether the content below is substantially or primarily about one or more of \
         these items.\n\n\
         Content details:\n{details}\n\n\
         Rules:\n\
         - Answer only whether the content clearly belongs to the productive list above.\n\
         - Do not judge entertainment value; only the relation to the productive list matters.\n\
         - Be conservative: a weak, indirect or uncertain relation is NOT a match.\n\n\
         Output JSON only:\n\
         {{\n  \"reasoning\": \"short explanation of why it does or does not match\",\n  \"productive_match\": true or false\n}}",
        details = content_details(item),
    )
}
