use anyhow::Result;
use headless_chrome::Tab;

use crate::types::Direction;

/// Visible text is only used for sign-in wall detection, so a prefix is enough.
const PAGE_TEXT_MAX_CHARS: usize = 5000;

const PAGE_TEXT_JS: &str = r#"
(() => {
  const body = document.body;
  return body ? (body.innerText || '') : '';
})()
"#;

/// Evaluate a script and return its string result (empty when it returned nothing).
fn eval_string(tab: &Tab, js: &str) -> Result<String> {
    let result = tab.evaluate(js, false)?;
    Ok(result
        .value
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default())
}

/// Visible text of the current page, truncated.
pub fn page_text(tab: &Tab) -> Result<String> {
    let raw = eval_string(tab, PAGE_TEXT_JS)?;
    Ok(raw.chars().take(PAGE_TEXT_MAX_CHARS).collect())
}

/// Shift the viewport vertically; the page decides how far it can actually go.
pub fn scroll_by(tab: &Tab, direction: Direction, pixels: u32) -> Result<()> {
    let dy = match direction {
        Direction::Up => -(pixels as i64),
        Direction::Down => pixels as i64,
    };
    tab.evaluate(&format!("window.scrollBy(0, {dy})"), false)?;
    Ok(())
}
