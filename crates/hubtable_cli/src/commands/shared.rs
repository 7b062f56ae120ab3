use hubtable::GitHubClient;

use crate::config::Config;

/// Build the API client from the loaded configuration.
///
/// A missing token is not fatal: public REST resources still answer, at a
/// much lower rate limit, and the GraphQL tables report the 401 themselves.
pub(crate) fn build_client(
    config: &Config,
    no_rate_limit: bool,
) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    let token = match config.github_token() {
        Some(token) => token,
        None => {
            tracing::warn!(
                "No GitHub token configured. Set HUBTABLE_GITHUB__TOKEN or GITHUB_TOKEN."
            );
            String::new()
        }
    };

    let options = config.client_options(no_rate_limit);
    tracing::debug!(
        base_url = %options.base_url,
        rps = ?options.requests_per_second,
        "Building GitHub client"
    );
    Ok(GitHubClient::new(&token, options)?)
}

#[cfg(test)]
mod tests {
    use hubtable::github::TokenKind;

    use super::*;

    #[test]
    fn build_client_uses_configured_base_url() {
        let mut config = Config::default();
        config.github.token = Some("ghs_installation".to_string());
        config.github.base_url = "https://ghe.example.com/api/v3/".to_string();

        let client = build_client(&config, true).unwrap();
        assert_eq!(client.api_url(), "https://ghe.example.com/api/v3");
        assert_eq!(client.graphql_url(), "https://ghe.example.com/api/graphql");
        assert_eq!(client.token_kind(), TokenKind::Installation);
    }
}
