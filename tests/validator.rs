//! Runs the parser over every sample under `tests/sources/`.
//!
//! Files whose names contain "invalid" are expected to fail; all
//! others must assemble cleanly, end to end.

use std::fs;
use std::path::PathBuf;

use stasm::assembler;

fn sources_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("sources")
}

#[test]
fn corpus_parses_as_named() {
    let mut checked = 0;

    for entry in fs::read_dir(sources_dir()).expect("tests/sources must exist") {
        let path = entry.expect("readable dir entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("stkasm") {
            continue;
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .expect("utf-8 filename")
            .to_owned();
        let should_fail = name.contains("invalid");

        let result = assembler::parse_file(&path);
        match (should_fail, result) {
            (true, Ok(_)) => panic!("{}: expected a parse error, got success", name),
            (false, Err(e)) => panic!("{}: expected success, got error: {}", name, e),
            _ => {}
        }
        checked += 1;
    }

    // Guard against the corpus silently going missing.
    assert!(checked >= 8, "only {} corpus files found", checked);
}

#[test]
fn valid_corpus_also_emits() {
    // Every valid sample must survive the full pipeline, not just the
    // parser, and produce a well-formed header.
    for entry in fs::read_dir(sources_dir()).expect("tests/sources must exist") {
        let path = entry.expect("readable dir entry").path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .expect("utf-8 filename")
            .to_owned();
        if !name.ends_with(".stkasm") || name.contains("invalid") {
            continue;
        }

        let object = assembler::assemble(&path)
            .unwrap_or_else(|e| panic!("{}: emission failed: {}", name, e));
        assert!(object.len() >= 20, "{}: object shorter than its header", name);

        let field = |pos: usize| {
            u32::from_le_bytes([
                object[pos],
                object[pos + 1],
                object[pos + 2],
                object[pos + 3],
            ]) as usize
        };
        assert_eq!(field(0), assembler::emitter::OBJ_MAGIC as usize, "{}: bad magic", name);
        assert_eq!(
            object.len(),
            20 + field(4) + field(8) + field(12) + field(16),
            "{}: header lengths disagree with the byte stream",
            name
        );
    }
}
