use crate::history::History;
use crate::types::{Goal, Viewport};

pub fn navigation(goal: &Goal, history: &History, viewport: Viewport) -> String {
    let width = viewport.width;
    let height = viewport.height;
    format!(
        r#"You are an autonomous web navigation agent. Analyze the screenshot and determine the next action to achieve the goal.

GOAL: {goal}

PREVIOUS CONTEXT (last {capacity} steps):
{context}

CRITICAL RULES:
- Public GitHub repositories can be viewed WITHOUT signing in or creating an account
- NEVER click "Sign in", "Sign up", or "Create account" links
- If you see a sign-in page, you've made a mistake - go back or navigate differently

AVAILABLE ACTIONS:
- click: Click on an element (provide description and approximate x,y coordinates)
- type: Type text into the focused field; Enter is pressed afterwards (provide the text in "value")
- scroll: Scroll the page (provide "direction": "up" or "down")
- wait: Wait for the page to load
- extract: The page shows the information the goal asks for; switch to data extraction
- done: Navigation complete (put extracted data in "value" as JSON if you have it)

Respond with a JSON object:
{{
    "action_type": "click|type|scroll|wait|extract|done",
    "target": "description of the element to interact with",
    "value": "text to type, or extracted data as JSON",
    "coordinates": [x, y],
    "direction": "up|down",
    "confidence": 0.0,
    "reasoning": "brief explanation of why this action"
}}

COORDINATE GUIDELINES:
- The viewport is {width}x{height} pixels; coordinates outside [0,{width}]x[0,{height}] are rejected
- Aim for the CENTER of clickable elements
- The GitHub search box is typically near the top center
- "Releases" on repository pages is usually in the right sidebar
- Use null for "coordinates" unless the action is click

Respond ONLY with the JSON object, no additional text."#,
        goal = goal.text(),
        capacity = history.capacity(),
        context = history.prompt_context(),
    )
}

pub fn extraction(goal: &Goal) -> String {
    let subject = goal
        .target()
        .map(|repo| format!("the repository {repo}"))
        .unwrap_or_else(|| "this repository".to_string());
    format!(
        r#"Analyze this releases page screenshot of {subject} and extract the latest release information.

Look for:
1. The latest release version (e.g. v2026.1.29)
2. The commit tag/hash (short alphanumeric code)
3. The author who published the release
4. Release date if visible
5. Release notes/description if visible
6. Download/asset links if visible

Respond with ONLY a JSON object:
{{
    "version": "the version string",
    "tag": "the commit hash/tag",
    "author": "username of author",
    "publish_date": "date if visible, else null",
    "release_notes": "first 200 chars of notes if visible, else null",
    "download_links": ["asset urls if visible"] or null,
    "found": true
}}

Set "found" to false if no release is visible on the page."#
    )
}
