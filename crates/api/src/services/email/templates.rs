//! Invitation email templates.
//!
//! Plain substitution: every decision about who gets invited, and with
//! which code, is made before rendering.

use chrono::{DateTime, Utc};

/// Values substituted into the invitation email.
#[derive(Debug, Clone)]
pub struct InvitationEmailContext<'a> {
    pub client_name: &'a str,
    pub mentor_name: &'a str,
    pub code: &'a str,
    pub expires_at: DateTime<Utc>,
}

/// Rendered invitation email.
#[derive(Debug, Clone)]
pub struct InvitationEmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Renders invitation emails linking to the registration page.
#[derive(Debug, Clone)]
pub struct InvitationEmailRenderer {
    registration_url: String,
}

impl InvitationEmailRenderer {
    pub fn new(registration_url: impl Into<String>) -> Self {
        Self {
            registration_url: registration_url.into(),
        }
    }

    /// Registration link with the code as a query parameter. Codes contain
    /// symbols, so the parameter is percent-encoded.
    pub fn registration_link(&self, code: &str) -> String {
        match reqwest::Url::parse_with_params(&self.registration_url, &[("code", code)]) {
            Ok(url) => url.to_string(),
            Err(_) => self.registration_url.clone(),
        }
    }

    pub fn render(&self, ctx: &InvitationEmailContext<'_>) -> InvitationEmailContent {
        let link = self.registration_link(ctx.code);
        let expires = ctx.expires_at.format("%Y-%m-%d").to_string();

        InvitationEmailContent {
            subject: format!("{} invited you to join as a client", ctx.mentor_name),
            text: Self::text_template(ctx, &link, &expires),
            html: Self::html_template(ctx, &link, &expires),
        }
    }

    fn text_template(ctx: &InvitationEmailContext<'_>, link: &str, expires: &str) -> String {
        format!(
            r#"Hi {client},

{mentor} invited you to create your client account.

Your invitation code is: {code}

Register here: {link}

This invitation expires on {expires}. The code can only be used once.

If you were not expecting this invitation, you can ignore this email."#,
            client = ctx.client_name,
            mentor = ctx.mentor_name,
            code = ctx.code,
            link = link,
            expires = expires,
        )
    }

    fn html_template(ctx: &InvitationEmailContext<'_>, link: &str, expires: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Your invitation</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="margin-top: 0;">Hi {client},</h2>
    <p><strong>{mentor}</strong> invited you to create your client account.</p>
    <p>Your invitation code is:</p>
    <div style="font-size: 24px; font-weight: bold; letter-spacing: 2px; text-align: center; padding: 16px; background: #f0f7ff; border-radius: 8px; font-family: 'SF Mono', Monaco, monospace;">{code}</div>
    <p style="text-align: center; margin: 30px 0;">
        <a href="{link}" style="background: #2563eb; color: white; padding: 12px 28px; text-decoration: none; border-radius: 6px; display: inline-block;">Create my account</a>
    </p>
    <p style="color: #666; font-size: 14px;">This invitation expires on {expires}. The code can only be used once.</p>
    <p style="color: #888; font-size: 12px;">If you were not expecting this invitation, you can ignore this email.</p>
</body>
</html>"#,
            client = escape_html(ctx.client_name),
            mentor = escape_html(ctx.mentor_name),
            code = escape_html(ctx.code),
            link = escape_html(link),
            expires = expires,
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context() -> InvitationEmailContext<'static> {
        InvitationEmailContext {
            client_name: "Carla",
            mentor_name: "Marina",
            code: "Ab3dEf9h#j&k",
            expires_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_substitutes_all_values() {
        let renderer = InvitationEmailRenderer::new("https://app.example.com/register");
        let content = renderer.render(&context());

        assert_eq!(content.subject, "Marina invited you to join as a client");
        assert!(content.text.contains("Hi Carla"));
        assert!(content.text.contains("Ab3dEf9h#j&k"));
        assert!(content.text.contains("2026-03-14"));
        assert!(content.html.contains("<!DOCTYPE html>"));
        assert!(content.html.contains("Ab3dEf9h#j&amp;k"));
    }

    #[test]
    fn test_registration_link_encodes_code() {
        let renderer = InvitationEmailRenderer::new("https://app.example.com/register");
        let link = renderer.registration_link("Ab3dEf9h#j&k");

        assert!(link.starts_with("https://app.example.com/register?code="));
        assert!(!link.contains('#'));
        assert!(link.contains("%23"));
    }

    #[test]
    fn test_html_escapes_names() {
        let renderer = InvitationEmailRenderer::new("https://app.example.com/register");
        let ctx = InvitationEmailContext {
            client_name: "<script>alert(1)</script>",
            ..context()
        };
        let content = renderer.render(&ctx);

        assert!(!content.html.contains("<script>"));
        assert!(content.html.contains("&lt;script&gt;"));
    }
}
