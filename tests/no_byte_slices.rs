//! Source lint: message text is user-controlled and often multibyte, so a
//! literal byte range such as `text[..50]` can panic mid-character. Previews
//! go through `utils::string` instead. Slices bounded by a variable or a
//! named constant (e.g. `&digest[..HEX_LEN]` over ASCII hex) are not flagged.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use regex::Regex;

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("read_dir failed: {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}

#[test]
fn no_literal_byte_ranges_in_source() -> anyhow::Result<()> {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");

    // `[..50]`, `[..=50]`, `[3..]`, `[3..50]` on anything that is not a Vec/array literal
    let literal_range = Regex::new(r"\[\s*\d*\s*\.\.=?\s*\d+\s*\]|\[\s*\d+\s*\.\.\s*\]")?;

    let mut files = Vec::new();
    collect_rs_files(&src_dir, &mut files)?;

    let mut failures = Vec::new();
    for path in files {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for (i, line) in text.lines().enumerate() {
            let code = line.split("//").next().unwrap_or_default();
            if literal_range.is_match(code) {
                failures.push(format!("{}:{}: {}", path.display(), i + 1, line.trim()));
            }
        }
    }

    assert!(
        failures.is_empty(),
        "literal byte-range slices found (use utils::string helpers):\n{}",
        failures.join("\n")
    );
    Ok(())
}
