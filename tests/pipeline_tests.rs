//! End-to-end runs of the pipeline against a fake summarizer

mod common;

use common::{FakeSummarizer, Shared, canonical, read, test_config, write_files};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tree_summary::{
    AlwaysContinue, Config, ProgressStore, Processor, RunOptions, RunPhase, SupersummaryPolicy,
};

fn processor(config: Config, options: RunOptions, fake: &Arc<FakeSummarizer>) -> Processor {
    Processor::new(config, options, Box::new(Shared(Arc::clone(fake)))).unwrap()
}

#[test]
fn test_end_to_end_single_batch() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(
        &root,
        &[("a.go", "package a"), ("b.go", "package b"), ("README.md", "# readme")],
    );
    let out = dir.path().join("out");
    let fake = Arc::new(FakeSummarizer::default());

    let mut processor = processor(test_config(&out), RunOptions::new(&root), &fake);
    let report = processor.run().unwrap();

    assert_eq!(processor.phase(), RunPhase::Done);
    assert_eq!(report.candidates, 2);
    assert_eq!(report.summarized, 2);
    assert_eq!(report.batches, 1);
    assert!(report.failures.is_empty());
    assert_eq!(fake.prompts.lock().unwrap().len(), 2);

    let root = canonical(&root);
    let state = ProgressStore::new(&processor.paths().state).load();
    assert_eq!(state.file_count(), 2);
    assert!(state.is_processed(&root.join("a.go")));
    assert!(state.is_processed(&root.join("b.go")));

    let markdown = read(&processor.paths().summaries);
    assert_eq!(markdown.matches("# File: ").count(), 2);
    assert!(markdown.contains("summary of a.go\n---\n"));
    assert!(markdown.contains("summary of b.go\n---\n"));
    assert!(!markdown.contains("README.md"));
}

#[test]
fn test_second_run_processes_nothing() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a"), ("pkg/b.go", "b")]);
    let out = dir.path().join("out");

    let first = Arc::new(FakeSummarizer::default());
    processor(test_config(&out), RunOptions::new(&root), &first)
        .run()
        .unwrap();

    let second = Arc::new(FakeSummarizer::default());
    let report = processor(test_config(&out), RunOptions::new(&root), &second)
        .run()
        .unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.already_processed, 2);
    assert_eq!(report.summarized, 0);
    assert_eq!(report.batches, 0);
    assert_eq!(report.total_processed, 2);
    assert!(second.prompts.lock().unwrap().is_empty());
}

#[test]
fn test_failed_file_is_retried_on_next_run() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "fine"), ("b.go", "BROKEN")]);
    let out = dir.path().join("out");

    let flaky = Arc::new(FakeSummarizer::failing_on(&["BROKEN"]));
    let report = processor(test_config(&out), RunOptions::new(&root), &flaky)
        .run()
        .unwrap();
    assert_eq!(report.summarized, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("b.go"));
    assert_eq!(report.total_processed, 1);

    let healthy = Arc::new(FakeSummarizer::default());
    let report = processor(test_config(&out), RunOptions::new(&root), &healthy)
        .run()
        .unwrap();
    assert_eq!(report.already_processed, 1);
    assert_eq!(report.summarized, 1);
    assert_eq!(healthy.count_containing("BROKEN"), 1);
    assert_eq!(report.total_processed, 2);
}

#[test]
fn test_declined_continuation_leaves_files_for_later() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(
        &root,
        &[("a.go", "a"), ("b.go", "b"), ("c.go", "c"), ("d.go", "d"), ("e.go", "e")],
    );
    let out = dir.path().join("out");
    let config = Config {
        limit: 2,
        ..test_config(&out)
    };

    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let fake = Arc::new(FakeSummarizer::default());
    let report = processor(config.clone(), RunOptions::new(&root), &fake)
        .with_continuation(move |batch: usize, processed: usize, remaining: usize| {
            recorded.lock().unwrap().push((batch, processed, remaining));
            false
        })
        .run()
        .unwrap();

    assert_eq!(report.batches, 1);
    assert!(report.stopped_early);
    assert_eq!(report.total_processed, 2);
    assert_eq!(*calls.lock().unwrap(), vec![(0, 2, 3)]);

    let root_c = canonical(&root);
    let state = ProgressStore::new(out.join("treesummary_state.json")).load();
    assert!(state.is_processed(&root_c.join("a.go")));
    assert!(state.is_processed(&root_c.join("b.go")));
    assert!(!state.is_processed(&root_c.join("c.go")));

    let resumed = Arc::new(FakeSummarizer::default());
    let report = processor(config, RunOptions::new(&root), &resumed)
        .with_continuation(AlwaysContinue)
        .run()
        .unwrap();
    assert_eq!(report.already_processed, 2);
    assert_eq!(report.batches, 2);
    assert_eq!(report.summarized, 3);
    assert!(!report.stopped_early);
    assert_eq!(report.total_processed, 5);
}

#[test]
fn test_per_batch_supersummary_trigger() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(
        &root,
        &[("a.go", "a"), ("b.go", "b"), ("c.go", "c"), ("d.go", "d"), ("e.go", "e")],
    );
    let out = dir.path().join("out");
    let config = Config {
        limit: 3,
        supersummary_interval: 3,
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::default());
    let mut processor = processor(config, RunOptions::new(&root), &fake);
    let report = processor.run().unwrap();

    // First batch has exactly 3 summaries, the second only 2
    assert_eq!(report.batches, 2);
    assert_eq!(report.supersummaries, 1);
    assert_eq!(fake.count_containing("SUPER_TASK"), 1);

    let supers = read(&processor.paths().supersummaries);
    assert_eq!(supers.matches("# Supersummary").count(), 1);
    assert!(supers.contains("a supersummary\n\n---\n"));
}

#[test]
fn test_per_batch_trigger_ignores_non_multiples() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a"), ("b.go", "b"), ("c.go", "c"), ("d.go", "d")]);
    let out = dir.path().join("out");
    let config = Config {
        supersummary_interval: 3,
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::default());
    let mut processor = processor(config, RunOptions::new(&root), &fake);
    let report = processor.run().unwrap();

    assert_eq!(report.summarized, 4);
    assert_eq!(report.supersummaries, 0);
    assert!(!processor.paths().supersummaries.exists());
}

#[test]
fn test_cumulative_supersummary_trigger() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a"), ("b.go", "b"), ("c.go", "c"), ("d.go", "d")]);
    let out = dir.path().join("out");
    let config = Config {
        limit: 2,
        supersummary_interval: 3,
        supersummary_policy: SupersummaryPolicy::Cumulative,
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::default());
    let report = processor(config, RunOptions::new(&root), &fake)
        .run()
        .unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.supersummaries, 1);

    let prompts = fake.prompts.lock().unwrap();
    let super_prompt = prompts.iter().find(|p| p.contains("SUPER_TASK")).unwrap();
    assert_eq!(super_prompt.matches("File: ").count(), 3);
}

#[test]
fn test_final_summary_over_all_supersummaries() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a"), ("b.go", "b"), ("c.go", "c"), ("d.go", "d")]);
    let out = dir.path().join("out");
    let config = Config {
        limit: 2,
        supersummary_interval: 2,
        generate_final_summary: true,
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::default());
    let mut processor = processor(config, RunOptions::new(&root), &fake);
    let report = processor.run().unwrap();

    assert_eq!(report.supersummaries, 2);
    assert!(report.final_summary_written);
    assert_eq!(fake.count_containing("FINAL_TASK"), 1);

    let prompts = fake.prompts.lock().unwrap();
    let final_prompt = prompts.iter().find(|p| p.contains("FINAL_TASK")).unwrap();
    assert!(final_prompt.contains("Supersummary 1:\na supersummary"));
    assert!(final_prompt.contains("Supersummary 2:\na supersummary"));

    let final_summary = read(&processor.paths().final_summary);
    assert!(final_summary.starts_with("# Final Summary\n\nthe final summary"));
}

#[test]
fn test_final_summary_skipped_without_supersummaries() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a")]);
    let out = dir.path().join("out");
    let config = Config {
        generate_final_summary: true,
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::default());
    let report = processor(config, RunOptions::new(&root), &fake)
        .run()
        .unwrap();

    assert!(!report.final_summary_written);
    assert_eq!(fake.count_containing("FINAL_TASK"), 0);
}

#[test]
fn test_failed_supersummary_does_not_stop_the_run() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a"), ("b.go", "b"), ("c.go", "c"), ("d.go", "d")]);
    let out = dir.path().join("out");
    let config = Config {
        limit: 2,
        supersummary_interval: 2,
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::failing_on(&["SUPER_TASK"]));
    let report = processor(config, RunOptions::new(&root), &fake)
        .run()
        .unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.summarized, 4);
    assert_eq!(report.supersummaries, 0);
    assert_eq!(fake.count_containing("SUPER_TASK"), 2);
}

#[test]
fn test_marked_file_without_markdown_is_not_reprocessed() {
    // A crash between marking and the markdown flush leaves the file marked
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a"), ("b.go", "b")]);
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();

    let root_c = canonical(&root);
    let store = ProgressStore::new(out.join("treesummary_state.json"));
    assert!(store.mark_processed(&root_c.join("a.go"), &root_c));

    let fake = Arc::new(FakeSummarizer::default());
    let mut processor = processor(test_config(&out), RunOptions::new(&root), &fake);
    let report = processor.run().unwrap();

    assert_eq!(report.already_processed, 1);
    assert_eq!(report.summarized, 1);
    assert_eq!(fake.count_containing("same directory as a.go"), 0);
    assert_eq!(report.total_processed, 2);
}

#[test]
fn test_restart_reprocesses_and_keeps_progress() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a"), ("b.go", "b")]);
    let out = dir.path().join("out");

    let fake = Arc::new(FakeSummarizer::default());
    processor(test_config(&out), RunOptions::new(&root), &fake)
        .run()
        .unwrap();

    let again = Arc::new(FakeSummarizer::default());
    let options = RunOptions {
        restart: true,
        ..RunOptions::new(&root)
    };
    let report = processor(test_config(&out), options, &again).run().unwrap();

    assert_eq!(report.already_processed, 0);
    assert_eq!(report.summarized, 2);
    assert_eq!(report.total_processed, 2);
    assert!(out.join("treesummary_state.json").exists());
}

#[test]
fn test_clear_state_starts_fresh() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("a.go", "a")]);
    let out = dir.path().join("out");

    let fake = Arc::new(FakeSummarizer::default());
    processor(test_config(&out), RunOptions::new(&root), &fake)
        .run()
        .unwrap();
    assert!(out.join("treesummary_state.json").exists());

    let options = RunOptions {
        clear_state: true,
        ..RunOptions::new(&root)
    };
    let again = Arc::new(FakeSummarizer::default());
    let mut processor = processor(test_config(&out), options, &again);
    assert!(!out.join("treesummary_state.json").exists());

    let report = processor.run().unwrap();
    assert_eq!(report.already_processed, 0);
    assert_eq!(report.summarized, 1);
}

#[test]
fn test_ignored_paths_never_reach_the_summarizer() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(
        &root,
        &[("main.go", "m"), ("vendor/dep.go", "VENDORED"), ("gen/x_gen.go", "GENERATED")],
    );
    let out = dir.path().join("out");
    let config = Config {
        ignore_paths: vec!["vendor".into(), "_gen.go".into()],
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::default());
    let report = processor(config, RunOptions::new(&root), &fake)
        .run()
        .unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(fake.count_containing("VENDORED"), 0);
    assert_eq!(fake.count_containing("GENERATED"), 0);
}

#[test]
fn test_hash_in_path_is_escaped_in_markdown() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    write_files(&root, &[("c#/main.go", "m")]);
    let out = dir.path().join("out");

    let fake = Arc::new(FakeSummarizer::default());
    let mut processor = processor(test_config(&out), RunOptions::new(&root), &fake);
    processor.run().unwrap();

    let markdown = read(&processor.paths().summaries);
    assert!(markdown.contains("c\\#/main.go"));
    assert!(!markdown.contains("c#/main.go"));
}

#[test]
fn test_ignore_pattern_in_root_ancestor_still_finds_files() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("build_area").join("project");
    write_files(&root, &[("a.go", "a"), ("build/gen.go", "GENERATED")]);
    let out = dir.path().join("out");
    let config = Config {
        ignore_paths: vec!["build".into()],
        ..test_config(&out)
    };

    let fake = Arc::new(FakeSummarizer::default());
    let report = processor(config, RunOptions::new(&root), &fake)
        .run()
        .unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.summarized, 1);
    assert_eq!(fake.count_containing("GENERATED"), 0);
}
