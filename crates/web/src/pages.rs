//! HTML pages. Plain `format!` rendering, every interpolated value escaped.

use axum::response::Html;

use mailsig_core::UserProfile;

/// Minimal HTML escaping for user-provided strings.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="hu">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 40em; margin: 2em auto; }}
pre, textarea {{ font-family: inherit; font-size: 1em; }}
textarea {{ width: 100%; }}
dt {{ font-weight: bold; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = html_escape(title),
        body = body,
    ))
}

fn field(label: &str, value: Option<&str>) -> String {
    format!(
        "<dt>{}</dt><dd>{}</dd>\n",
        html_escape(label),
        html_escape(value.unwrap_or("-"))
    )
}

/// Landing page for a signed-in user: the attributes a signature will use.
pub fn index_page(user: &UserProfile) -> Html<String> {
    let phones = user.business_phones.join(", ");
    let mut body = format!("<h1>Hello, {}!</h1>\n<dl>\n", html_escape(user.display_name()));
    body.push_str(&field("Name", user.name.as_deref()));
    body.push_str(&field("Email", user.email.as_deref()));
    body.push_str(&field("Job title", user.job_title.as_deref()));
    body.push_str(&field("Office", user.office_location.as_deref()));
    body.push_str(&field("Street address", user.street_address.as_deref()));
    body.push_str(&field("Mobile", user.mobile_phone.as_deref()));
    body.push_str(&field(
        "Business phones",
        Some(phones.as_str()).filter(|p| !p.is_empty()),
    ));
    body.push_str("</dl>\n");
    body.push_str(r#"<p><a href="/generate">Generate signature</a> | <a href="/logout">Sign out</a></p>"#);
    layout("Email signature", &body)
}

/// Page showing the generated signature text ready to copy.
pub fn signature_page(user: &UserProfile, signature_text: &str) -> Html<String> {
    let rows = signature_text.lines().count().max(1) + 1;
    let body = format!(
        r#"<h1>Signature for {name}</h1>
<pre id="signature">{text}</pre>
<textarea readonly rows="{rows}">{text}</textarea>
<p><a href="/">Back</a> | <a href="/logout">Sign out</a></p>"#,
        name = html_escape(user.display_name()),
        text = html_escape(signature_text),
        rows = rows,
    );
    layout("Email signature", &body)
}

/// Authentication failure page showing the provider's error payload.
pub fn auth_error_page(error: &str, description: &str) -> Html<String> {
    let body = format!(
        r#"<h1>Sign-in failed</h1>
<dl>
<dt>Error</dt><dd><code>{error}</code></dd>
<dt>Description</dt><dd>{description}</dd>
</dl>
<p><a href="/login">Try again</a></p>"#,
        error = html_escape(error),
        description = html_escape(description),
    );
    layout("Sign-in failed", &body)
}
