use gitcore::Config;

mod common;

use common::TestRepo;

#[test]
fn fresh_repository_config_defaults() {
    let t = TestRepo::new();

    let config = t.repo.config().unwrap();
    assert_eq!(config.integer("core.repositoryformatversion").unwrap(), Some(0));
    assert_eq!(config.boolean("core.bare").unwrap(), Some(false));
    assert_eq!(config.boolean("core.logallrefupdates").unwrap(), Some(true));
}

#[test]
fn config_snapshot_sees_external_edits() {
    let t = TestRepo::new();
    let path = t.repo.git_dir().join("config");

    let mut config = t.repo.config().unwrap();
    config.add("user.name", "Test User");
    config.save_to(&path).unwrap();

    // A later snapshot picks the change up; coercion defaults intact.
    let config = t.repo.config().unwrap();
    assert_eq!(config.string("user.name").unwrap(), "Test User");
    assert_eq!(config.boolean("core.bare").unwrap(), Some(false));
}

#[test]
fn multi_valued_keys_survive_save_and_reload() {
    let t = TestRepo::new();
    let path = t.repo.git_dir().join("config");

    let mut config = t.repo.config().unwrap();
    config.add("remote.origin.url", "https://example.com/repo.git");
    config.add("remote.origin.fetch", "+refs/heads/*:refs/remotes/origin/*");
    config.add("remote.origin.fetch", "+refs/tags/*:refs/tags/*");
    config.save_to(&path).unwrap();

    let config = t.repo.config().unwrap();
    assert_eq!(
        config.values("remote.origin.fetch"),
        vec![
            "+refs/heads/*:refs/remotes/origin/*",
            "+refs/tags/*:refs/tags/*"
        ]
    );
    // Last value wins the single-valued view.
    assert_eq!(
        config.string("remote.origin.fetch").unwrap(),
        "+refs/tags/*:refs/tags/*"
    );
}

#[test]
fn coercion_failures_are_reported() {
    let mut config = Config::new();
    config.add("a.flag", "definitely");
    config.add("a.size", "12parsecs");

    let err = config.boolean("a.flag").unwrap_err();
    assert!(err.to_string().contains("invalid boolean"));

    let err = config.integer("a.size").unwrap_err();
    assert!(err.to_string().contains("invalid integer"));
}

#[test]
fn integer_multiplier_suffixes() {
    let mut config = Config::new();
    config.add("pack.window", "10");
    config.add("pack.limit", "1m");
    config.add("pack.big", "2G");

    assert_eq!(config.integer("pack.window").unwrap(), Some(10));
    assert_eq!(config.integer("pack.limit").unwrap(), Some(1024 * 1024));
    assert_eq!(config.integer("pack.big").unwrap(), Some(2 * 1024 * 1024 * 1024));
}

#[test]
fn subsection_names_stay_case_sensitive() {
    let mut config = Config::new();
    config.add("branch.Main.remote", "origin");

    assert_eq!(config.string("BRANCH.Main.REMOTE").unwrap(), "origin");
    assert_eq!(config.string("branch.main.remote"), None);
}

#[test]
fn entries_enumeration_is_last_wins() {
    let mut config = Config::new();
    config.add("user.name", "First");
    config.add("user.name", "Second");
    config.add("core.bare", "true");

    let entries = config.entries();
    assert_eq!(entries.get("user.name").unwrap(), "Second");
    assert_eq!(entries.len(), 2);
    assert!(config.has_key("user.name"));
    assert!(!config.has_key("user.email"));
}

#[test]
fn layered_files_override_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let global = dir.path().join("global");
    let local = dir.path().join("local");

    std::fs::write(&global, "[user]\n\tname = Global\n\temail = g@example.com\n").unwrap();
    std::fs::write(&local, "[user]\n\tname = Local\n").unwrap();

    let config = Config::from_paths(&[global, local, dir.path().join("missing")]).unwrap();
    assert_eq!(config.string("user.name").unwrap(), "Local");
    assert_eq!(config.string("user.email").unwrap(), "g@example.com");
}
