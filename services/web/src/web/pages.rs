//! services/web/src/web/pages.rs
//!
//! Minimal server-rendered HTML for each page. User-supplied text is escaped.

use html_escape::encode_text;
use secrets_core::domain::Provider;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{title} - Secrets</title>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

fn provider_buttons(providers: &[Provider]) -> String {
    providers
        .iter()
        .map(|p| {
            let label = match p {
                Provider::Google => "Sign In with Google",
                Provider::Facebook => "Sign In with Facebook",
            };
            format!(r#"    <p><a href="/auth/{}">{}</a></p>"#, p, label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn home(authenticated: bool) -> String {
    let links = if authenticated {
        r#"<a href="/secrets">See Secrets</a> <a href="/logout">Log Out</a>"#
    } else {
        r#"<a href="/register">Register</a> <a href="/login">Login</a>"#
    };
    layout(
        "Home",
        &format!(
            "    <h1>Secrets</h1>\n    <p>Don't keep your secrets, share them anonymously!</p>\n    <p>{}</p>",
            links
        ),
    )
}

fn credentials_form(action: &str, button: &str, providers: &[Provider]) -> String {
    format!(
        r#"    <form action="{action}" method="POST">
        <label>Username <input type="text" name="username" required></label>
        <label>Password <input type="password" name="password" required></label>
        <button type="submit">{button}</button>
    </form>
{buttons}"#,
        buttons = provider_buttons(providers)
    )
}

pub fn register(providers: &[Provider]) -> String {
    layout(
        "Register",
        &format!("    <h1>Register</h1>\n{}", credentials_form("/register", "Register", providers)),
    )
}

pub fn login(providers: &[Provider]) -> String {
    layout(
        "Login",
        &format!("    <h1>Login</h1>\n{}", credentials_form("/login", "Login", providers)),
    )
}

/// The public list of secrets. Nothing identifies who wrote which.
pub fn secrets<S: AsRef<str>>(secrets: &[S], authenticated: bool) -> String {
    let items = secrets
        .iter()
        .map(|s| format!("        <li>{}</li>", encode_text(s.as_ref())))
        .collect::<Vec<_>>()
        .join("\n");
    let links = if authenticated {
        r#"<a href="/submit">Submit a Secret</a> <a href="/logout">Log Out</a>"#
    } else {
        r#"<a href="/login">Login</a> to submit your own."#
    };
    layout(
        "Secrets",
        &format!(
            "    <h1>You've Discovered My Secret!</h1>\n    <ul>\n{}\n    </ul>\n    <p>{}</p>",
            items, links
        ),
    )
}

pub fn submit() -> String {
    layout(
        "Submit",
        r#"    <h1>Secrets</h1>
    <p>Don't keep your secrets, share them anonymously!</p>
    <form action="/submit" method="POST">
        <input type="text" name="secret" placeholder="What's your secret?" required>
        <button type="submit">Submit</button>
    </form>"#,
    )
}

pub fn unavailable() -> String {
    layout(
        "Unavailable",
        "    <h1>Something went wrong</h1>\n    <p>Please try again shortly.</p>",
    )
}
