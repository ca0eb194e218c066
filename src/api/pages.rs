//! Minimal self-contained HTML for the password pages
//!
//! The real web frontend renders richer versions of these; the service
//! keeps fallback forms so the emailed links work standalone.

pub fn forget_password_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Forgot password</title>
</head>
<body>
  <h1>Forgot your password?</h1>
  <form method="post" action="/auth/password/forget">
    <label for="email">Email address</label>
    <input type="email" id="email" name="email" required>
    <button type="submit">Send reset link</button>
  </form>
</body>
</html>
"#
    .to_string()
}

pub fn reset_password_page(verify_id: &str) -> String {
    // The secret is path-encoded back into the form action; it never
    // appears in the page body.
    let action = format!("/auth/password/reset/{}", html_escape(verify_id));
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Reset password</title>
</head>
<body>
  <h1>Choose a new password</h1>
  <form method="post" action="{}">
    <label for="newPassword">New password</label>
    <input type="password" id="newPassword" name="newPassword" required>
    <label for="confirmPassword">Confirm password</label>
    <input type="password" id="confirmPassword" name="confirmPassword" required>
    <button type="submit">Reset password</button>
  </form>
</body>
</html>
"#,
        action
    )
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
