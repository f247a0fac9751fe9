use std::fs;
use std::sync::Arc;

use git_analytics::cache::Dataset;
use git_analytics::config::{ConfigOverrides, Settings};
use git_analytics::git;
use git_analytics::pipeline;
use git_analytics::stats::{SeriesPoint, StatOutput};
use git_analytics::store::Stage;

const LOG: &str = "\
+++b2\t2021-10-02 10:00:00 +0200\tb.lebricolo@work.com\tMove app into core
2\t1\tsrc/{ => core}/app.py
3\t0\tdocs/notes.md

+++a1\t2021-10-01 10:00:00 +0200\tBob Lebricolo\tAdd app
10\t0\tsrc/app.py
4\t0\ttest/core/test_app.py
";

const CONFIG: &str = "\
areas:
  src:
    root_path: ./src
    module_depth: 0
  test:
    root_path: ./test
    module_depth: 0
";

fn settings(dir: &tempfile::TempDir) -> Settings {
    let config_dir = dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("demo.yaml"), CONFIG).unwrap();

    Settings::load(
        "demo",
        &config_dir,
        &dir.path().join("data"),
        &ConfigOverrides::default(),
    )
    .unwrap()
}

fn seed_raw_stage(settings: &Settings) {
    let parsed = git::parse_log(LOG).unwrap();
    pipeline::store_for(settings)
        .save_raw(&parsed.commits, &parsed.files)
        .unwrap();
}

#[test]
fn renamed_file_history_is_unified() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    seed_raw_stage(&settings);

    let (commits, files) = pipeline::prepare_data(&settings, false).unwrap();

    let app_rows: Vec<_> = files.iter().filter(|f| f.ext == "py" && f.is_src()).collect();
    assert_eq!(app_rows.len(), 2);
    assert!(app_rows.iter().all(|f| f.file_path == "src/core/app.py"));
    assert!(app_rows.iter().all(|f| f.module_nm.as_deref() == Some("core")));

    let test_row = files.iter().find(|f| f.is_in("test")).unwrap();
    assert_eq!(test_row.module_nm.as_deref(), Some("core"));
    assert!(!test_row.is_src());

    let notes = files.iter().find(|f| f.file_path == "docs/notes.md").unwrap();
    assert_eq!(notes.ext, "other");
    assert_eq!(notes.n_code_lines_inserted, 0);
    assert_eq!(notes.module_nm, None);

    assert!(commits.iter().all(|c| c.author_nm == "bob lebricolo"));
    let b2 = commits.iter().find(|c| c.id == "b2").unwrap();
    assert_eq!(b2.n_code_lines_inserted, 2);
    let a1 = commits.iter().find(|c| c.id == "a1").unwrap();
    assert_eq!(a1.n_code_lines_inserted, 14);
}

#[test]
fn clean_stage_round_trips_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    seed_raw_stage(&settings);

    let prepared = pipeline::prepare_data(&settings, false).unwrap();
    let store = pipeline::store_for(&settings);
    assert!(store.has(Stage::Clean));

    let loaded = store.load_clean().unwrap();
    assert_eq!(loaded, prepared);
}

#[test]
fn alias_document_overrides_names() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    seed_raw_stage(&settings);
    fs::write(
        settings.alias_path(),
        r#"{"Robert Lebricolo": ["Bob Lebricolo", "b.lebricolo@work.com"]}"#,
    )
    .unwrap();

    let (commits, _) = pipeline::prepare_data(&settings, false).unwrap();

    assert!(commits.iter().all(|c| c.author_nm == "robert lebricolo"));
}

#[test]
fn served_dataset_aggregates_module_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    seed_raw_stage(&settings);
    pipeline::prepare_data(&settings, false).unwrap();

    let dataset = Arc::new(Dataset::new("demo", pipeline::store_for(&settings), None));

    let info = dataset.info().unwrap();
    assert_eq!(info.n_commits, 2);
    assert_eq!(info.areas, vec!["src", "test"]);
    assert!(!info.has_components);

    let size = dataset.stat("module_size").unwrap();
    assert_eq!(
        size.output,
        StatOutput::Series {
            index: vec!["module_nm".to_string()],
            points: vec![SeriesPoint {
                key: vec!["core".to_string()],
                value: Some(16.0),
            }],
        }
    );
}
