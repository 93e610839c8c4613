//! Reply texts (Reddit markdown).
//!
//! Every reply is a one-line headline (used as the message subject) plus a
//! body that starts with a ✔/✖ glyph, the headline again, and an explanation.

use crate::{dispatch::Outcome, errors::CommandError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub success: bool,
    pub headline: String,
    pub explanation: String,
}

impl Reply {
    pub fn success(headline: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            success: true,
            headline: headline.into(),
            explanation: explanation.into(),
        }
    }

    pub fn failure(headline: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            success: false,
            headline: headline.into(),
            explanation: explanation.into(),
        }
    }

    pub fn glyph(&self) -> &'static str {
        if self.success {
            "✔"
        } else {
            "✖"
        }
    }

    pub fn body(&self) -> String {
        format!(
            "**{}** {}\n\n{}",
            self.glyph(),
            self.headline,
            self.explanation
        )
    }
}

/// Build the reply for a finished command.
pub fn reply_for(outcome: &Outcome, docs_url: &str) -> Reply {
    match outcome {
        Outcome::Committed(ch) => Reply::success(
            format!("Successfully added {}.", ch.display_name),
            format!(
                "{} was added to /r/{} and will now be monitored for new uploads.",
                ch.display_name, ch.destination
            ),
        ),
        Outcome::Unsupported(subject) => Reply::failure(
            "Invalid subject.",
            format!(
                "'{}' is not supported. Subject needs to be:\n\n\
                 - 'add'\n\n\
                 'list' and 'remove' are not available yet.",
                escape_markdown(subject)
            ),
        ),
        Outcome::Rejected(err) => rejection_reply(err, docs_url),
    }
}

fn rejection_reply(err: &CommandError, docs_url: &str) -> Reply {
    match err {
        CommandError::Parse(detail) => Reply::failure(
            "Unable to parse your message",
            format!(
                "Your message contains invalid YAML ({}). For more info, read the \
                 [API docs]({docs_url}) and [YAML formatting](https://en.wikipedia.org/wiki/YAML)",
                escape_markdown(detail)
            ),
        ),
        CommandError::Validation(errors) => {
            let mut text = format!(
                "The following error{} occurred while validating your message:\n\n",
                if errors.len() > 1 { "s" } else { "" }
            );
            for e in errors {
                text.push_str(&format!("- {}\n", escape_markdown(e)));
            }
            text.push_str(&format!("\nDon't forget to read the [docs]({docs_url})"));
            Reply::failure("Unable to add channel", text)
        }
        CommandError::Authorization(detail) => {
            Reply::failure("Mod check failed", escape_markdown(detail))
        }
        CommandError::Resolution(detail) => {
            Reply::failure("Could not get channel details.", escape_markdown(detail))
        }
        CommandError::LookupFailed(_) => Reply::failure(
            "The check if your channel is valid has failed.",
            "YouTube could not be reached. Please try again later.",
        ),
        CommandError::Duplicate { .. } => Reply::failure(
            "This channel is already added to this subreddit.",
            "This channel+subreddit combination is already added.",
        ),
        CommandError::Internal(_) => Reply::failure(
            "Internal error",
            "Couldn't process your message because of an internal error. \
             Please contact the administrator of this bot.",
        ),
    }
}

/// Escape characters that would turn user-supplied text into markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '~' | '^' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::channel;

    const DOCS: &str = "http://www.reddit.com/r/ChannelBot/wiki/api";

    #[test]
    fn body_starts_with_glyph_and_headline() {
        let r = Reply::success("Done.", "All good.");
        assert_eq!(r.body(), "**✔** Done.\n\nAll good.");
        let r = Reply::failure("Nope.", "Bad.");
        assert!(r.body().starts_with("**✖** Nope."));
    }

    #[test]
    fn committed_reply_names_channel() {
        let r = reply_for(&Outcome::Committed(channel("UC1", "videos")), DOCS);
        assert!(r.success);
        assert_eq!(r.headline, "Successfully added name-UC1.");
        assert!(r.explanation.contains("/r/videos"));
    }

    #[test]
    fn validation_reply_lists_every_error() {
        let err = CommandError::Validation(vec!["a is bad".into(), "b is bad".into()]);
        let r = reply_for(&Outcome::Rejected(err), DOCS);
        assert!(!r.success);
        assert_eq!(r.headline, "Unable to add channel");
        assert!(r.explanation.starts_with("The following errors occurred"));
        assert!(r.explanation.contains("- a is bad\n- b is bad\n"));
        assert!(r.explanation.contains(DOCS));
    }

    #[test]
    fn lookup_failure_is_not_reported_as_missing_channel() {
        let err = CommandError::LookupFailed("quota exceeded".into());
        let r = reply_for(&Outcome::Rejected(err), DOCS);
        assert_eq!(r.headline, "The check if your channel is valid has failed.");
        assert!(!r.success);
    }

    #[test]
    fn internal_reply_hides_details() {
        let err = CommandError::Internal("disk on fire".into());
        let r = reply_for(&Outcome::Rejected(err), DOCS);
        assert_eq!(r.headline, "Internal error");
        assert!(!r.explanation.contains("disk"));
    }

    #[test]
    fn markdown_is_escaped() {
        assert_eq!(escape_markdown("a_b*[c]"), r"a\_b\*\[c\]");
    }
}
