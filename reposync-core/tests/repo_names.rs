//! Repository name parsing: `[https://host/]user/name[@branch]`.
//!
//! Each `#[case]` is isolated: no shared state.

use reposync_core::{ConfigError, RepoInfo};
use rstest::rstest;

#[rstest]
#[case("octo/widgets", "github.com", "octo", "widgets", "default")]
#[case("octo/widgets@main", "github.com", "octo", "widgets", "main")]
#[case("  octo/widgets@release/1.x  ", "github.com", "octo", "widgets", "release/1.x")]
#[case("octo/widgets@", "github.com", "octo", "widgets", "default")]
#[case("https://git.example.com/octo/widgets", "git.example.com", "octo", "widgets", "default")]
#[case("https://git.example.com/octo/widgets.git@dev", "git.example.com", "octo", "widgets", "dev")]
#[case("http://ghe.local//team/repo/", "ghe.local", "team", "repo", "default")]
fn parses_valid_names(
    #[case] input: &str,
    #[case] host: &str,
    #[case] user: &str,
    #[case] name: &str,
    #[case] branch: &str,
) {
    let repo: RepoInfo = input.parse().unwrap_or_else(|e| panic!("{input}: {e}"));
    assert_eq!(repo.host, host);
    assert_eq!(repo.user, user);
    assert_eq!(repo.name, name);
    assert_eq!(repo.branch, branch);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("widgets")]
#[case("/widgets")]
#[case("octo/widgets/extra")]
#[case("https://github.com")]
fn rejects_invalid_names(#[case] input: &str) {
    let err = input.parse::<RepoInfo>().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRepo { .. }), "got: {err}");
}

#[test]
fn unique_name_distinguishes_branches() {
    let main: RepoInfo = "octo/widgets@main".parse().unwrap();
    let dev: RepoInfo = "octo/widgets@dev".parse().unwrap();
    assert_eq!(main.full_name(), dev.full_name());
    assert_ne!(main.unique_name(), dev.unique_name());
}
