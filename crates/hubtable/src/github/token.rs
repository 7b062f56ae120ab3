//! Token shape detection.
//!
//! GitHub prefixes every token it issues with its kind. The prefix is only
//! used to decide which GraphQL sub-selections a token can ask for; it is
//! never validated.

/// What kind of credential a token is, judged by its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `ghp_`
    Classic,
    /// `github_pat_`
    FineGrained,
    /// `gho_`
    OAuth,
    /// `ghu_`
    UserToServer,
    /// `ghs_`: GitHub App installation token. Has no viewer user.
    Installation,
    /// `ghr_`
    Refresh,
    Unknown,
}

impl TokenKind {
    pub fn detect(token: &str) -> Self {
        const PREFIXES: [(&str, TokenKind); 6] = [
            ("github_pat_", TokenKind::FineGrained),
            ("ghp_", TokenKind::Classic),
            ("gho_", TokenKind::OAuth),
            ("ghu_", TokenKind::UserToServer),
            ("ghs_", TokenKind::Installation),
            ("ghr_", TokenKind::Refresh),
        ];

        PREFIXES
            .iter()
            .find(|(prefix, _)| token.starts_with(prefix))
            .map(|(_, kind)| *kind)
            .unwrap_or(TokenKind::Unknown)
    }

    /// Installation tokens act as the app, not as a user, so viewer-scoped
    /// fields fail for them.
    #[inline]
    pub fn has_viewer(self) -> bool {
        self != TokenKind::Installation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(TokenKind::detect("ghp_abc"), TokenKind::Classic);
        assert_eq!(TokenKind::detect("github_pat_11ABC"), TokenKind::FineGrained);
        assert_eq!(TokenKind::detect("gho_abc"), TokenKind::OAuth);
        assert_eq!(TokenKind::detect("ghu_abc"), TokenKind::UserToServer);
        assert_eq!(TokenKind::detect("ghs_abc"), TokenKind::Installation);
        assert_eq!(TokenKind::detect("ghr_abc"), TokenKind::Refresh);
        assert_eq!(TokenKind::detect("0123456789abcdef"), TokenKind::Unknown);
        assert_eq!(TokenKind::detect(""), TokenKind::Unknown);
    }

    #[test]
    fn test_only_installation_tokens_lack_a_viewer() {
        assert!(!TokenKind::Installation.has_viewer());
        assert!(TokenKind::Classic.has_viewer());
        assert!(TokenKind::Unknown.has_viewer());
    }
}
