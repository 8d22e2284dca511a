//! Content checks for retrieved messages.

use mailparse::{MailHeaderMap, ParsedMail, parse_mail};

use crate::tracing;

/// Returns `true` if `token` occurs in `content`.
///
/// The raw text is searched first. If that misses, the content is parsed as
/// a MIME message and the decoded subject and every decoded body part are
/// searched, so tokens hidden behind quoted-printable or base64 still match.
#[must_use]
pub fn contains_token(content: &str, token: &str) -> bool {
    if content.contains(token) {
        return true;
    }

    match parse_mail(content.as_bytes()) {
        Ok(parsed) => part_contains(&parsed, token),
        Err(err) => {
            tracing::debug!("Retrieved content is not a MIME message: {err}");
            false
        }
    }
}

fn part_contains(part: &ParsedMail<'_>, token: &str) -> bool {
    if part
        .headers
        .get_first_value("Subject")
        .is_some_and(|subject| subject.contains(token))
    {
        return true;
    }

    if part.subparts.is_empty() {
        return part.get_body().is_ok_and(|body| body.contains(token));
    }

    part.subparts.iter().any(|sub| part_contains(sub, token))
}
