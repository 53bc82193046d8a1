use std::collections::BTreeMap;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::{Formatter, Serializer};

use crate::hash::{compute_hash, Hash};

/// working-tree snapshot: relative posix path -> blob digest
pub type FileMap = BTreeMap<String, Hash>;

/// an immutable snapshot record, stored as `commits/<id>.json`
///
/// field order matches the on-disk json.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// content-derived identity, see [`compute_commit_id`]
    pub id: Hash,
    /// previous commit (None for the first commit)
    #[serde(deserialize_with = "deserialize_parent")]
    pub parent: Option<Hash>,
    /// free-text message; the first line is the title
    pub message: String,
    /// seconds since the unix epoch, microsecond resolution
    pub timestamp: f64,
    /// snapshot contents
    pub files: FileMap,
}

impl Commit {
    /// build a commit stamped with the current time
    pub fn new(parent: Option<Hash>, message: impl Into<String>, files: FileMap) -> Self {
        Self::with_timestamp(parent, message, now_timestamp(), files)
    }

    /// build a commit with an explicit timestamp
    pub fn with_timestamp(
        parent: Option<Hash>,
        message: impl Into<String>,
        timestamp: f64,
        files: FileMap,
    ) -> Self {
        let message = message.into();
        let id = compute_commit_id(parent.as_ref(), &message, timestamp, &files);
        Self {
            id,
            parent,
            message,
            timestamp,
            files,
        }
    }

    /// is this the first commit of a history
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// does the stored id match the content
    pub fn verify_id(&self) -> bool {
        compute_commit_id(self.parent.as_ref(), &self.message, self.timestamp, &self.files)
            == self.id
    }

    /// first line of the message, for lists
    pub fn title(&self) -> &str {
        self.message
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .unwrap_or("(no message)")
    }

    /// abbreviated id for display
    pub fn short_id(&self) -> String {
        self.id.short()
    }
}

impl std::fmt::Display for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "commit {}", self.id)?;
        if let Some(parent) = &self.parent {
            writeln!(f, "Parent: {}", parent)?;
        }
        writeln!(f, "Date:   {:.0}", self.timestamp)?;
        writeln!(f, "Files:  {}", self.files.len())?;

        writeln!(f)?;
        for line in self.message.lines() {
            writeln!(f, "    {}", line)?;
        }

        Ok(())
    }
}

/// pre-image of a commit id; fields declared in sorted key order
#[derive(Serialize)]
struct IdPreimage<'a> {
    files: &'a FileMap,
    message: &'a str,
    parent: String,
    timestamp: String,
}

/// derive a commit id
///
/// SHA-256 over the compact json of
/// `{"files": .., "message": .., "parent": <id or "">, "timestamp": "%.6f"}`
/// with sorted keys and non-ascii characters escaped as `\uXXXX`.
pub fn compute_commit_id(
    parent: Option<&Hash>,
    message: &str,
    timestamp: f64,
    files: &FileMap,
) -> Hash {
    let preimage = IdPreimage {
        files,
        message,
        parent: parent.map(Hash::to_hex).unwrap_or_default(),
        timestamp: format!("{:.6}", timestamp),
    };

    let mut bytes = Vec::new();
    let mut ser = Serializer::with_formatter(&mut bytes, AsciiFormatter);
    // serializing strings and maps of strings into a Vec cannot fail
    if preimage.serialize(&mut ser).is_err() {
        bytes.clear();
    }
    compute_hash(&bytes)
}

/// current wall-clock time, truncated to whole microseconds
pub fn now_timestamp() -> f64 {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0);
    micros as f64 / 1_000_000.0
}

/// compact json formatter that escapes DEL and everything outside ascii
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            // DEL is escaped too
            if ch.is_ascii() && ch != '\u{7f}' {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// accept `null` or `""` for a missing parent
fn deserialize_parent<'de, D>(deserializer: D) -> Result<Option<Hash>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Hash::from_hex(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, &str)]) -> FileMap {
        entries
            .iter()
            .map(|(path, content)| (path.to_string(), compute_hash(content.as_bytes())))
            .collect()
    }

    #[test]
    fn test_commit_id_deterministic() {
        let f = files(&[("intro.txt", "hello v1")]);
        let c1 = Commit::with_timestamp(None, "initial", 1700000000.25, f.clone());
        let c2 = Commit::with_timestamp(None, "initial", 1700000000.25, f);
        assert_eq!(c1.id, c2.id);
        assert!(c1.verify_id());
    }

    #[test]
    fn test_commit_id_depends_on_every_field() {
        let f = files(&[("intro.txt", "hello v1")]);
        let base = Commit::with_timestamp(None, "m", 1.0, f.clone());

        let other_msg = Commit::with_timestamp(None, "n", 1.0, f.clone());
        let other_ts = Commit::with_timestamp(None, "m", 1.000001, f.clone());
        let other_parent = Commit::with_timestamp(Some(Hash::ZERO), "m", 1.0, f);
        let other_files =
            Commit::with_timestamp(None, "m", 1.0, files(&[("intro.txt", "hello v2")]));

        for other in [other_msg, other_ts, other_parent, other_files] {
            assert_ne!(base.id, other.id);
        }
    }

    #[test]
    fn test_commit_id_preimage_format() {
        // sha256 of exactly this text, as produced by a sorted-key compact json dump
        let f = files(&[("a.txt", "x")]);
        let expected_json = format!(
            "{{\"files\":{{\"a.txt\":\"{}\"}},\"message\":\"caf\\u00e9 \\ud83d\\ude00\",\"parent\":\"\",\"timestamp\":\"12.500000\"}}",
            compute_hash(b"x")
        );
        let id = compute_commit_id(None, "caf\u{e9} \u{1f600}", 12.5, &f);
        assert_eq!(id, compute_hash(expected_json.as_bytes()));
    }

    #[test]
    fn test_commit_id_escapes_control_characters() {
        let expected_json =
            "{\"files\":{},\"message\":\"line1\\nline2\\t\\\"q\\\"\",\"parent\":\"\",\"timestamp\":\"0.000000\"}";
        let id = compute_commit_id(None, "line1\nline2\t\"q\"", 0.0, &FileMap::new());
        assert_eq!(id, compute_hash(expected_json.as_bytes()));

        let expected_json =
            "{\"files\":{},\"message\":\"a\\u007f\\u001f\",\"parent\":\"\",\"timestamp\":\"0.000000\"}";
        let id = compute_commit_id(None, "a\u{7f}\u{1f}", 0.0, &FileMap::new());
        assert_eq!(id, compute_hash(expected_json.as_bytes()));
    }

    #[test]
    fn test_reads_commit_written_by_existing_repositories() {
        // unescaped utf-8, two-space indent, full-precision float timestamp
        let blob = compute_hash(b"hello v1");
        let parent = compute_hash(b"previous commit");
        let preimage = format!(
            "{{\"files\":{{\"kapitel/einf\\u00fchrung.tex\":\"{}\"}},\"message\":\"\\u00dcberarbeitung der Einleitung\",\"parent\":\"{}\",\"timestamp\":\"1700000000.123457\"}}",
            blob, parent
        );
        let id = compute_hash(preimage.as_bytes());

        let stored = format!(
            "{{\n  \"id\": \"{id}\",\n  \"parent\": \"{parent}\",\n  \"message\": \"\u{dc}berarbeitung der Einleitung\",\n  \"timestamp\": 1700000000.1234567,\n  \"files\": {{\n    \"kapitel/einf\u{fc}hrung.tex\": \"{blob}\"\n  }}\n}}"
        );

        let commit: Commit = serde_json::from_str(&stored).unwrap();

        assert_eq!(commit.id, id);
        assert_eq!(commit.parent, Some(parent));
        assert_eq!(commit.timestamp, 1700000000.1234567);
        assert_eq!(commit.files["kapitel/einf\u{fc}hrung.tex"], blob);
        assert!(commit.verify_id());
    }

    #[test]
    fn test_commit_json_roundtrip() {
        let c = Commit::with_timestamp(
            Some(Hash::ZERO),
            "update",
            1700000123.456789,
            files(&[("notes.md", "draft notes"), ("intro.txt", "hello v2")]),
        );

        let json = serde_json::to_string_pretty(&c).unwrap();
        let parsed: Commit = serde_json::from_str(&json).unwrap();

        assert_eq!(c, parsed);
        assert!(parsed.verify_id());
    }

    #[test]
    fn test_commit_json_field_names() {
        let c = Commit::with_timestamp(None, "initial", 5.0, FileMap::new());
        let value: serde_json::Value = serde_json::to_value(&c).unwrap();

        assert_eq!(value["id"], c.id.to_hex());
        assert!(value["parent"].is_null());
        assert_eq!(value["message"], "initial");
        assert_eq!(value["timestamp"], 5.0);
        assert!(value["files"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_empty_string_parent_is_root() {
        let json = format!(
            "{{\"id\":\"{}\",\"parent\":\"\",\"message\":\"m\",\"timestamp\":1.0,\"files\":{{}}}}",
            Hash::ZERO
        );
        let c: Commit = serde_json::from_str(&json).unwrap();
        assert!(c.is_root());
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = format!("{{\"id\":\"{}\",\"parent\":null,\"message\":\"m\"}}", Hash::ZERO);
        assert!(serde_json::from_str::<Commit>(&json).is_err());
    }

    #[test]
    fn test_title() {
        let mut c = Commit::with_timestamp(None, "Fix intro\n\nlonger text", 0.0, FileMap::new());
        assert_eq!(c.title(), "Fix intro");
        c.message = String::new();
        assert_eq!(c.title(), "(no message)");
    }

    #[test]
    fn test_now_timestamp_microsecond_precision() {
        let ts = now_timestamp();
        assert!(ts > 1_600_000_000.0);
        // formatting at six decimals and parsing back is lossless
        let formatted = format!("{:.6}", ts);
        let reparsed: f64 = formatted.parse().unwrap();
        assert_eq!(format!("{:.6}", reparsed), formatted);
    }
}
