//! storage.rs: whole-file JSON persistence shared by the pool and profile stores.
//!
//! Writers go through a sibling temp file and a rename, so readers see either the old
//! snapshot or the new one, never a partial write.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Outcome of reading a JSON file that may legitimately be absent.
#[derive(Debug)]
pub enum Loaded<T> {
    Missing,
    Corrupt(String),
    Ok(T),
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Loaded<T> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Loaded::Missing,
        Err(e) => return Loaded::Corrupt(e.to_string()),
    };
    match serde_json::from_str(&raw) {
        Ok(v) => Loaded::Ok(v),
        Err(e) => Loaded::Corrupt(e.to_string()),
    }
}

/// Serialize `value` to `path` via a uniquely named sibling temp file + rename.
///
/// Concurrent writers never share a temp file; the last rename wins.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(d) => d,
        None => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let json = serde_json::to_string_pretty(value).context("serializing snapshot")?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".brush-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all().ok();
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Append one JSON line, creating the file (and its directory) on first use.
pub fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut line = serde_json::to_string(value).context("serializing line")?;
    line.push('\n');
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    f.write_all(line.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn atomic_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested/pool.json");
        write_json_atomic(&p, &json!({"a": 1})).unwrap();
        match read_json::<serde_json::Value>(&p) {
            Loaded::Ok(v) => assert_eq!(v["a"], 1),
            other => panic!("unexpected {other:?}"),
        }
        let leftovers: Vec<_> = fs::read_dir(p.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn overlapping_writers_never_expose_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pool.json");
        let body: Vec<String> = (0..200).map(|i| format!("article {i}")).collect();
        write_json_atomic(&p, &json!({"writer": -1, "articles": body})).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let p = p.clone();
                let body = body.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|_| write_json_atomic(&p, &json!({"writer": w, "articles": body})).is_err())
                        .count()
                })
            })
            .collect();

        let mut bad_reads = 0;
        for _ in 0..500 {
            match read_json::<serde_json::Value>(&p) {
                Loaded::Ok(v) => assert_eq!(v["articles"].as_array().map(Vec::len), Some(200)),
                _ => bad_reads += 1,
            }
        }
        let write_errors: usize = writers.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(write_errors, 0);
        assert_eq!(bad_reads, 0);
    }

    #[test]
    fn missing_and_corrupt_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("x.json");
        assert!(matches!(read_json::<serde_json::Value>(&p), Loaded::Missing));
        fs::write(&p, "{not json").unwrap();
        assert!(matches!(read_json::<serde_json::Value>(&p), Loaded::Corrupt(_)));
    }

    #[test]
    fn append_adds_lines() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("events.jsonl");
        append_json_line(&p, &json!({"n": 1})).unwrap();
        append_json_line(&p, &json!({"n": 2})).unwrap();
        let s = fs::read_to_string(&p).unwrap();
        assert_eq!(s.lines().count(), 2);
    }
}
