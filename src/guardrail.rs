//! Keeps the run away from sign-in and sign-up flows. Public repositories never need them.

const AUTH_PATHS: &[&str] = &["github.com/login", "github.com/sessions", "github.com/signup"];

const AUTH_PAGE_MARKERS: &[&str] = &[
    "sign up for github",
    "create your free account",
    "sign in to github",
    "continue with google",
    "continue with apple",
];

const AUTH_TARGET_TERMS: &[&str] = &[
    "sign in",
    "sign up",
    "create account",
    "log in",
    "login",
    "continue with google",
    "continue with apple",
];

pub fn is_auth_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    AUTH_PATHS.iter().any(|path| url.contains(path))
}

pub fn is_auth_page_text(text: &str) -> bool {
    let text = text.to_lowercase();
    AUTH_PAGE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// True for click targets the model described as a sign-in control.
pub fn is_auth_target(target: Option<&str>) -> bool {
    let Some(target) = target else {
        return false;
    };
    let target = target.to_lowercase();
    AUTH_TARGET_TERMS.iter().any(|term| target.contains(term))
}
