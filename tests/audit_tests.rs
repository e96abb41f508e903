//! End-to-end runs of the audit against fake collaborators.

mod common;

use brew_audit::audit::RunResult;
use brew_audit::manifest::{ListKind, Manifest};
use brew_audit::review::{Action, Decision};

use common::{FakeBrew, FakeStore, ScriptedPrompter, TestRepo};

const XCODE_ONLY: &str = "packages=(\n)\napps=(\n)\napp_store=(\n  \"497799835\" # Xcode\n)\n";
const BASIC: &str = "packages=(\n  \"git\"\n  \"tree\"\n)\napps=(\n  \"google-chrome\"\n)\napp_store=(\n)\n";

fn add(entry: &str, list: ListKind) -> Action {
    Action::Add {
        entry: entry.into(),
        list,
        comment: None,
    }
}

fn dry_run_actions(result: RunResult) -> Vec<Action> {
    match result {
        RunResult::DryRun(actions) => actions,
        other => panic!("expected a dry run, got {:?}", other),
    }
}

#[test]
fn missing_package_and_app_are_offered() {
    let repo = TestRepo::with_manifest(BASIC);
    let brew = FakeBrew::new(&["git", "tree", "node"], &["google-chrome", "obsidian"]);
    let mut prompter = ScriptedPrompter::accept_all();

    let actions = dry_run_actions(repo.run(false, &brew, None, &mut prompter));

    assert_eq!(
        actions,
        vec![add("node", ListKind::Packages), add("obsidian", ListKind::Apps)]
    );
    assert_eq!(prompter.asked.len(), 2);
}

#[test]
fn known_cask_in_packages_is_moved_even_when_probes_fail() {
    let manifest = "packages=(\n  \"obsidian\"\n)\napps=(\n)\napp_store=(\n)\n";
    for probes_fail in [true, false] {
        let repo = TestRepo::with_manifest(manifest);
        let brew = FakeBrew {
            probes_fail,
            ..FakeBrew::new(&[], &["obsidian"])
        };
        let mut prompter = ScriptedPrompter::accept_all();

        let actions = dry_run_actions(repo.run(false, &brew, None, &mut prompter));

        assert_eq!(
            actions,
            vec![Action::Move {
                entry: "obsidian".into(),
                from: ListKind::Packages,
                to: ListKind::Apps,
            }]
        );
        assert_eq!(
            prompter.asked,
            vec!["obsidian: move packages → apps (known cask)".to_string()]
        );
    }
}

#[test]
fn missing_app_store_app_keeps_display_name() {
    let repo = TestRepo::with_manifest(XCODE_ONLY);
    let brew = FakeBrew::default();
    let store = FakeStore::new(&[("497799835", "Xcode"), ("441258766", "Magnet")]);
    let mut prompter = ScriptedPrompter::accept_all();

    let actions = dry_run_actions(repo.run(false, &brew, Some(&store), &mut prompter));

    assert_eq!(
        actions,
        vec![Action::Add {
            entry: "441258766".into(),
            list: ListKind::AppStore,
            comment: Some("Magnet".into()),
        }]
    );
}

#[test]
fn accept_all_stops_prompting_for_the_section() {
    let repo = TestRepo::with_manifest("packages=(\n)\napps=(\n)\napp_store=(\n)\n");
    let brew = FakeBrew::new(&["bat", "fd", "jq"], &[]);
    let mut prompter = ScriptedPrompter::new(&[Decision::ApproveRest]);

    let actions = dry_run_actions(repo.run(false, &brew, None, &mut prompter));

    assert_eq!(
        actions,
        vec![
            add("bat", ListKind::Packages),
            add("fd", ListKind::Packages),
            add("jq", ListKind::Packages),
        ]
    );
    assert_eq!(prompter.asked.len(), 1);
}

#[test]
fn apply_adds_package_sorted() {
    let repo = TestRepo::with_manifest("packages=(\n  \"git\"\n)\napps=(\n)\napp_store=(\n)\n");
    let brew = FakeBrew::new(&["git", "jq"], &[]);
    let mut prompter = ScriptedPrompter::accept_all();

    let result = repo.run(true, &brew, None, &mut prompter);

    assert!(matches!(result, RunResult::Applied { .. }));
    assert_eq!(
        repo.manifest(),
        "packages=(\n  \"git\"\n  \"jq\"\n\n)\napps=(\n)\napp_store=(\n)\n"
    );
    assert_eq!(prompter.confirmations, 1);
}

#[test]
fn second_apply_run_needs_no_changes() {
    let repo = TestRepo::with_manifest(
        "packages=(\n  \"obsidian\"\n  \"git\"\n  \"wget\"\n)\napps=(\n  \"zoom\"\n)\napp_store=(\n  \"497799835\" # Xcode\n)\n",
    );
    let brew = FakeBrew::new(&["git", "ripgrep"], &["obsidian", "firefox"]);
    let store = FakeStore::new(&[("441258766", "Magnet")]);

    let mut first = ScriptedPrompter::accept_all();
    assert!(matches!(
        repo.run(true, &brew, Some(&store), &mut first),
        RunResult::Applied { .. }
    ));

    let mut second = ScriptedPrompter::accept_all();
    assert_eq!(
        repo.run_with_timestamp(true, &brew, Some(&store), &mut second, "20240102_030406"),
        RunResult::NoChanges
    );
    assert!(second.asked.is_empty());

    let manifest = Manifest::parse(&repo.manifest()).unwrap();
    assert_eq!(manifest.packages.ids().collect::<Vec<_>>(), vec!["git", "ripgrep"]);
    assert_eq!(manifest.apps.ids().collect::<Vec<_>>(), vec!["firefox", "obsidian"]);
    assert_eq!(manifest.app_store.ids().collect::<Vec<_>>(), vec!["441258766"]);
}

#[test]
fn dry_run_never_touches_the_file() {
    let repo = TestRepo::with_manifest(BASIC);
    let before = std::fs::read(&repo.manifest_path).unwrap();
    let brew = FakeBrew::new(&["node"], &["obsidian"]);
    let mut prompter = ScriptedPrompter::accept_all();

    let actions = dry_run_actions(repo.run(false, &brew, None, &mut prompter));

    assert!(!actions.is_empty());
    assert_eq!(std::fs::read(&repo.manifest_path).unwrap(), before);
    assert!(repo.backups().is_empty());
    assert_eq!(prompter.confirmations, 0);
}

#[test]
fn text_outside_blocks_survives_apply() {
    let header = "#!/usr/bin/env bash\n# Install everything\nset -e\n\n";
    let middle = "\n# casks below\nbrew tap homebrew/cask-fonts\n\n";
    let trailer = "\nfor app in \"${app_store[@]}\"; do\n  mas install \"$app\"\ndone\n";
    let original = format!(
        "{header}packages=(\n  \"git\"\n)\n{middle}apps=(\n  \"zoom\"\n)\napp_store=(\n){trailer}"
    );
    let repo = TestRepo::with_manifest(&original);
    let brew = FakeBrew::new(&["git", "jq"], &["firefox"]);
    let mut prompter = ScriptedPrompter::accept_all();

    repo.run(true, &brew, None, &mut prompter);

    let updated = repo.manifest();
    assert_eq!(
        updated,
        format!(
            "{header}packages=(\n  \"git\"\n  \"jq\"\n\n)\n{middle}apps=(\n  \"firefox\"\n\n)\napp_store=(\n){trailer}"
        )
    );
    let backups = repo.backups();
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), original);
}

#[test]
fn quit_discards_earlier_answers() {
    let repo = TestRepo::with_manifest(
        "packages=(\n  \"obsidian\"\n)\napps=(\n)\napp_store=(\n)\n",
    );
    let before = repo.manifest();
    let brew = FakeBrew::new(&["bat", "fd"], &["obsidian"]);
    let mut prompter =
        ScriptedPrompter::new(&[Decision::ApproveRest, Decision::Approve, Decision::Abort]);

    assert_eq!(repo.run(true, &brew, None, &mut prompter), RunResult::Aborted);
    assert_eq!(repo.manifest(), before);
    assert!(repo.backups().is_empty());
    assert_eq!(prompter.confirmations, 0);
}

#[test]
fn declined_confirmation_writes_nothing() {
    let repo = TestRepo::with_manifest(BASIC);
    let before = repo.manifest();
    let brew = FakeBrew::new(&["git", "tree", "node"], &["google-chrome"]);
    let mut prompter = ScriptedPrompter::accept_all().declining();

    assert_eq!(repo.run(true, &brew, None, &mut prompter), RunResult::Declined);
    assert_eq!(repo.manifest(), before);
    assert!(repo.backups().is_empty());
}

#[test]
fn unresolvable_entries_can_be_removed_but_not_moved() {
    let repo =
        TestRepo::with_manifest("packages=(\n)\napps=(\n  \"gone-app\"\n)\napp_store=(\n)\n");
    let brew = FakeBrew {
        probes_fail: true,
        ..FakeBrew::default()
    };
    let mut prompter = ScriptedPrompter::accept_all();

    let result = repo.run(true, &brew, None, &mut prompter);

    let RunResult::Applied { actions, .. } = result else {
        panic!("expected apply");
    };
    assert_eq!(
        actions,
        vec![Action::Remove {
            entry: "gone-app".into(),
            list: ListKind::Apps,
        }]
    );
    assert_eq!(repo.manifest(), "packages=(\n)\napps=(\n)\napp_store=(\n)\n");
}

#[test]
fn apply_dedups_and_sorts_touched_lists() {
    let repo = TestRepo::with_manifest(
        "packages=(\n  \"tree\"\n  \"git\"\n  \"git\"\n)\napps=(\n)\napp_store=(\n  \"497799835\" # Xcode\n)\n",
    );
    let brew = FakeBrew::new(&["git", "tree", "jq"], &[]);
    let store = FakeStore::new(&[("497799835", "Xcode"), ("441258766", "magnet")]);
    let mut prompter = ScriptedPrompter::accept_all();

    repo.run(true, &brew, Some(&store), &mut prompter);

    assert_eq!(
        repo.manifest(),
        "packages=(\n  \"git\"\n  \"jq\"\n  \"tree\"\n\n)\napps=(\n)\napp_store=(\n  \"441258766\" # magnet\n  \"497799835\" # Xcode\n\n)\n"
    );
}

#[test]
fn missing_store_client_skips_store_category() {
    let repo = TestRepo::with_manifest(XCODE_ONLY);
    let mut prompter = ScriptedPrompter::accept_all();

    assert_eq!(
        repo.run(false, &FakeBrew::default(), None, &mut prompter),
        RunResult::NoChanges
    );
}

#[test]
fn misfiled_formula_in_apps_moves_back() {
    let repo = TestRepo::with_manifest("packages=(\n)\napps=(\n  \"ripgrep\"\n)\napp_store=(\n)\n");
    let brew = FakeBrew::new(&["ripgrep"], &[]);
    let mut prompter = ScriptedPrompter::accept_all();

    repo.run(true, &brew, None, &mut prompter);

    assert_eq!(
        repo.manifest(),
        "packages=(\n  \"ripgrep\"\n\n)\napps=(\n)\napp_store=(\n)\n"
    );
}

#[test]
fn empty_one_line_store_array_is_accepted() {
    let original = "packages=(\n  \"git\"\n  \"tree\"\n)\napps=(\n  \"google-chrome\"\n)\napp_store=()\n\necho done\n";
    let repo = TestRepo::with_manifest(original);
    let brew = FakeBrew::new(&["git", "tree", "node"], &["google-chrome", "obsidian"]);
    let mut prompter = ScriptedPrompter::accept_all();

    assert!(matches!(
        repo.run(true, &brew, None, &mut prompter),
        RunResult::Applied { .. }
    ));
    assert_eq!(
        repo.manifest(),
        "packages=(\n  \"git\"\n  \"node\"\n  \"tree\"\n\n)\napps=(\n  \"google-chrome\"\n  \"obsidian\"\n\n)\napp_store=(\n)\n\necho done\n"
    );
}

#[test]
fn formula_sharing_a_cask_name_stays_put_across_runs() {
    let original = "packages=(\n  \"docker\"\n)\napps=(\n)\napp_store=(\n)\n";
    let repo = TestRepo::with_manifest(original);
    let brew = FakeBrew::new(&["docker"], &[]);

    for round in 0..3 {
        let mut prompter = ScriptedPrompter::accept_all();
        let timestamp = format!("20240102_03040{round}");
        assert_eq!(
            repo.run_with_timestamp(true, &brew, None, &mut prompter, &timestamp),
            RunResult::NoChanges,
            "round {round}"
        );
    }
    assert_eq!(repo.manifest(), original);
}

#[test]
fn known_cask_settles_after_one_move() {
    let repo =
        TestRepo::with_manifest("packages=(\n  \"obsidian\"\n)\napps=(\n)\napp_store=(\n)\n");
    let brew = FakeBrew::new(&[], &["obsidian"]);

    let mut first = ScriptedPrompter::accept_all();
    assert!(matches!(
        repo.run(true, &brew, None, &mut first),
        RunResult::Applied { .. }
    ));

    for round in 1..3 {
        let mut prompter = ScriptedPrompter::accept_all();
        let timestamp = format!("20240102_03040{round}");
        assert_eq!(
            repo.run_with_timestamp(true, &brew, None, &mut prompter, &timestamp),
            RunResult::NoChanges,
            "round {round}"
        );
    }
    assert_eq!(
        repo.manifest(),
        "packages=(\n)\napps=(\n  \"obsidian\"\n\n)\napp_store=(\n)\n"
    );
}
