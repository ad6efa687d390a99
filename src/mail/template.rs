use url::Url;

use super::MailError;

const PASSWORD_RESET_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; color: #1f2933;">
    <h2>Reset your password</h2>
    <p>Hi {name},</p>
    <p>We received a request to reset the password for your account. Click the button below to choose a new one.</p>
    <p>
      <a href="{clientURL}" style="display: inline-block; padding: 10px 18px; background: #2563eb; color: #ffffff; text-decoration: none; border-radius: 4px;">Reset password</a>
    </p>
    <p>Or paste this link into your browser:<br><a href="{clientURL}">{clientURL}</a></p>
    <p>This link expires in {expiresIn}. If you did not ask for a reset you can ignore this email.</p>
  </body>
</html>
"#;

pub const PASSWORD_RESET_SUBJECT: &str = "Reset your password";

/// `<client_url>/reset-password?token=<token>`
pub fn reset_link(client_url: &str, token: &str) -> Result<String, MailError> {
    let mut url = Url::parse(client_url).map_err(|e| MailError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| MailError::InvalidUrl(client_url.to_string()))?
        .pop_if_empty()
        .push("reset-password");
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

pub fn render_password_reset(name: &str, link: &str, ttl_minutes: i64) -> String {
    let values = [
        ("name", escape_html(name)),
        ("clientURL", escape_html(link)),
        ("expiresIn", describe_minutes(ttl_minutes)),
    ];
    interpolate(PASSWORD_RESET_TEMPLATE, &values)
}

/// Single left-to-right pass over `{key}` placeholders. Substituted text is
/// never scanned again; unknown placeholders are kept as written.
fn interpolate(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| values.iter().find(|(key, _)| *key == &after[..close]).map(|(_, v)| (close, v)));
        match value {
            Some((close, v)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn describe_minutes(minutes: i64) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        m if m > 60 && m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{} minutes", m),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
