use super::prepare_drop;

use std::{
    env, fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

fn scratch_dir(tag: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("bioage_cli_{tag}_{suffix}"));
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

#[test]
fn reads_the_single_csv() {
    let dir = scratch_dir("single");
    let path = dir.join("sample.csv");
    fs::write(&path, "probe,value\ncg00000029,0.51\n").expect("write sample");

    let drop = prepare_drop(&[path]).expect("prepare");
    fs::remove_dir_all(dir).expect("cleanup");

    assert_eq!(drop.len(), 1);
    assert_eq!(drop[0].name, "sample.csv");
    assert_eq!(drop[0].content, b"probe,value\ncg00000029,0.51\n");
}

#[test]
fn multi_file_drop_is_not_read() {
    let dir = scratch_dir("multi");
    let present = dir.join("a.csv");
    fs::write(&present, "probe,value\n").expect("write sample");
    let missing = dir.join("missing.csv");

    let drop = prepare_drop(&[present, missing]).expect("prepare");
    fs::remove_dir_all(dir).expect("cleanup");

    let names: Vec<&str> = drop.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(names, vec!["a.csv", "missing.csv"]);
    assert!(drop.iter().all(|file| file.content.is_empty()));
}

#[test]
fn non_csv_file_is_not_read() {
    let dir = scratch_dir("txt");
    let missing = dir.join("notes.txt");

    let drop = prepare_drop(&[missing]).expect("prepare");
    fs::remove_dir_all(dir).expect("cleanup");

    assert_eq!(drop.len(), 1);
    assert_eq!(drop[0].name, "notes.txt");
    assert!(drop[0].content.is_empty());
}

#[test]
fn missing_csv_is_a_read_error() {
    let dir = scratch_dir("missing");
    let missing = dir.join("sample.csv");

    let err = prepare_drop(&[missing]).expect_err("missing file");
    fs::remove_dir_all(dir).expect("cleanup");

    assert!(err.to_string().contains("failed to read"));
}
