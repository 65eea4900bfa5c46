use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use xql_client::Record;

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// One JSON object per line, or a single pretty array.
pub fn render_records(records: &[Record], pretty: bool) -> Result<Vec<u8>> {
    if pretty {
        let mut out = serde_json::to_vec_pretty(records).context("Failed to serialize records")?;
        out.push(b'\n');
        return Ok(out);
    }

    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record).context("Failed to serialize record")?;
        out.push(b'\n');
    }
    Ok(out)
}

pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes).context("Failed to write to stdout")?;
    stdout.flush().context("Failed to flush stdout")
}

#[cfg(test)]
mod tests {
    use super::render_records;
    use serde_json::json;

    #[test]
    fn records_render_as_json_lines() {
        let records = vec![json!({ "a": 1 }), json!({ "b": "x" })];
        let out = render_records(&records, false).expect("render");
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n{\"b\":\"x\"}\n");
    }

    #[test]
    fn pretty_output_is_one_array() {
        let records = vec![json!({ "a": 1 })];
        let out = render_records(&records, true).expect("render");
        let parsed: serde_json::Value = serde_json::from_slice(&out).expect("valid json");
        assert_eq!(parsed, json!([{ "a": 1 }]));
    }

    #[test]
    fn no_records_renders_nothing_in_line_mode() {
        assert!(render_records(&[], false).expect("render").is_empty());
        assert_eq!(render_records(&[], true).expect("render"), b"[]\n");
    }
}
