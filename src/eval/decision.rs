use crate::sources::SourceKind;

/// The determined outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The sender itself is trusted.
    Allow { source: SourceKind },
    /// A trusted account posted `/ok-to-test` on the pull request.
    AllowViaComment { author: String, source: SourceKind },
    /// Nobody with authority vouched for the change.
    Deny,
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        !matches!(self, Verdict::Deny)
    }

    pub fn as_str(&self) -> &'static str {
        if self.is_allow() { "allow" } else { "deny" }
    }

    pub fn label(&self) -> &'static str {
        if self.is_allow() { "ALLOW" } else { "DENY" }
    }

    /// Human-readable account of why.
    pub fn reason(&self) -> String {
        match self {
            Verdict::Allow { source } => format!("sender is {}", source.describe()),
            Verdict::AllowViaComment { author, source } => {
                format!("/ok-to-test from {author}, who is {}", source.describe())
            }
            Verdict::Deny => "no trusted sender or /ok-to-test comment".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_variants_allow() {
        assert!(
            Verdict::Allow {
                source: SourceKind::OwnersFile
            }
            .is_allow()
        );
        assert!(
            Verdict::AllowViaComment {
                author: "carol".into(),
                source: SourceKind::OwnersFile
            }
            .is_allow()
        );
        assert!(!Verdict::Deny.is_allow());
        assert_eq!(Verdict::Deny.as_str(), "deny");
        assert_eq!(Verdict::Deny.label(), "DENY");
    }

    #[test]
    fn reason_names_the_source() {
        let v = Verdict::AllowViaComment {
            author: "carol".into(),
            source: SourceKind::Collaborator,
        };
        assert_eq!(
            v.reason(),
            "/ok-to-test from carol, who is a repository collaborator"
        );
    }
}
