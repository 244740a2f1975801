use kiln_git::client::{ReleaseError, VersionSourceError, parse_remote_tags, release_tag};
use kiln_git::executor::GitExecutor;
use kiln_git::git::GitError;
use kiln_git::GitClient;
use mockall::mock;
use semver::Version;

mock! {
    Executor {}

    impl GitExecutor for Executor {
        async fn exec(&self, args: &[String]) -> Result<String, GitError>;
        async fn exec_streaming(&self, args: &[String]) -> Result<(), GitError>;
    }
}

fn is_args(args: &[String], expected: &[&str]) -> bool {
    args.iter().map(String::as_str).eq(expected.iter().copied())
}

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

const LS_REMOTE: &str = "\
3f2a1b\trefs/tags/base@1.0.0
4c5d6e\trefs/tags/base@1.10.0
7f8a9b\trefs/tags/base@1.9.3
1a2b3c\trefs/tags/python@0.2.0
1a2b3c\trefs/tags/python@0.2.0^{}
9d8c7b\trefs/tags/release-2019
5e6f7a\trefs/tags/java@not-a-version
";

// ── Tag parsing ──

#[test]
fn parse_keeps_highest_version_per_image() {
    let catalog = parse_remote_tags(LS_REMOTE);

    assert_eq!(catalog.get("base"), Some(&v("1.10.0")));
    assert_eq!(catalog.get("python"), Some(&v("0.2.0")));
}

#[test]
fn parse_skips_foreign_and_unparseable_tags() {
    let catalog = parse_remote_tags(LS_REMOTE);

    assert!(!catalog.contains("release-2019"));
    assert!(!catalog.contains("java"));
    assert_eq!(catalog.len(), 2);
}

#[test]
fn parse_empty_output() {
    assert!(parse_remote_tags("").is_empty());
}

#[test]
fn release_tag_format() {
    assert_eq!(release_tag("base", &v("2.1.0")), "base@2.1.0");
}

// ── Version source ──

#[tokio::test]
async fn latest_versions_reads_remote_tags() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| is_args(args, &["ls-remote", "--tags", "origin"]))
        .returning(|_| Ok(LS_REMOTE.to_owned()));

    let client = GitClient::with_executor(mock);
    let catalog = client.latest_versions().await.unwrap();

    assert_eq!(catalog.get("base"), Some(&v("1.10.0")));
}

#[tokio::test]
async fn latest_versions_unreachable_remote_is_fatal() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|args| {
        Err(GitError::CommandFailed {
            args: args.to_vec(),
            stderr: "fatal: 'origin' does not appear to be a git repository".to_owned(),
        })
    });

    let client = GitClient::with_executor(mock);
    let result = client.latest_versions().await;

    assert!(matches!(
        result,
        Err(VersionSourceError::ListRemoteTags { .. })
    ));
}

// ── Version sink ──

#[tokio::test]
async fn tag_version_creates_release_tag() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming()
        .withf(|args| is_args(args, &["tag", "python@0.3.0"]))
        .times(1)
        .returning(|_| Ok(()));

    let client = GitClient::with_executor(mock);
    client.tag_version("python", &v("0.3.0")).await.unwrap();
}

#[tokio::test]
async fn tag_version_failure_names_the_tag() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming().returning(|args| {
        Err(GitError::CommandFailed {
            args: args.to_vec(),
            stderr: "already exists".to_owned(),
        })
    });

    let client = GitClient::with_executor(mock);
    let err = client.tag_version("base", &v("1.0.0")).await.unwrap_err();

    assert!(matches!(err, ReleaseError::Tag { ref tag, .. } if tag == "base@1.0.0"));
}

#[tokio::test]
async fn push_tags_pushes_all_tags() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming()
        .withf(|args| is_args(args, &["push", "--tags"]))
        .times(1)
        .returning(|_| Ok(()));

    let client = GitClient::with_executor(mock);
    client.push_tags().await.unwrap();
}

// ── Builder identity ──

#[tokio::test]
async fn user_name_takes_first_line() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| is_args(args, &["config", "user.name"]))
        .returning(|_| Ok("Jane Builder\n".to_owned()));

    let client = GitClient::with_executor(mock);
    assert_eq!(client.user_name().await.unwrap(), "Jane Builder");
}

#[tokio::test]
async fn user_email_empty_output_is_an_error() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| is_args(args, &["config", "user.email"]))
        .returning(|_| Ok("\n".to_owned()));

    let client = GitClient::with_executor(mock);
    assert!(client.user_email().await.is_err());
}
