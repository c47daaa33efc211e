//! Parsing of command output.
//!
//! Lab tools print two shapes of text that callers routinely need as data:
//! `key: value` listings (`ipmitool mc info`, `dmidecode`) and whitespace
//! aligned tables with a header row (`df`, `ps`). Both are turned into
//! ordered JSON maps so they can be compared, logged, or serialized as is.
//!
//! ```
//! use lab_ssh::output::{KeyValueOptions, key_value_outbuf_to_map};
//!
//! let map = key_value_outbuf_to_map(
//!     "Current Limit State: No Active Power Limit\nPower Limit: 0 Watts\n",
//!     &KeyValueOptions::default(),
//! );
//! assert_eq!(map["current_limit_state"], "No Active Power Limit");
//! assert_eq!(map["power_limit"], "0 Watts");
//! ```

use serde_json::{Map, Value};

use crate::types::CommandResult;

/// How `key<delim>value` lines are split and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueOptions {
    /// Separator between key and value. Only the first occurrence splits.
    pub delim: String,
    /// Characters trimmed from both ends of key and value.
    pub strip: String,
    /// Lowercase keys.
    pub to_lower: bool,
    /// Replace blanks in keys with `_`.
    pub underscores: bool,
    /// Treat indented lines under a valueless key as a nested block.
    pub process_indent: bool,
}

impl Default for KeyValueOptions {
    fn default() -> Self {
        Self {
            delim: ":".to_string(),
            strip: " ".to_string(),
            to_lower: true,
            underscores: true,
            process_indent: false,
        }
    }
}

impl KeyValueOptions {
    /// Set the delimiter.
    #[must_use]
    pub fn delim(mut self, delim: impl Into<String>) -> Self {
        self.delim = delim.into();
        self
    }

    /// Set the characters to strip.
    #[must_use]
    pub fn strip(mut self, strip: impl Into<String>) -> Self {
        self.strip = strip.into();
        self
    }

    /// Keep key case as is.
    #[must_use]
    pub const fn keep_case(mut self) -> Self {
        self.to_lower = false;
        self
    }

    /// Keep blanks in keys.
    #[must_use]
    pub const fn keep_blanks(mut self) -> Self {
        self.underscores = false;
        self
    }

    /// Enable nested block handling.
    #[must_use]
    pub const fn process_indent(mut self, on: bool) -> Self {
        self.process_indent = on;
        self
    }

    fn trim<'a>(&self, s: &'a str) -> &'a str {
        s.trim_matches(|c: char| self.strip.contains(c))
    }
}

/// Split one line into a normalized key and its value.
///
/// A line without the delimiter yields an empty value.
#[must_use]
pub fn parse_key_value(line: &str, opts: &KeyValueOptions) -> (String, String) {
    let (key, value) = if opts.delim.is_empty() {
        (line, "")
    } else {
        line.split_once(opts.delim.as_str()).unwrap_or((line, ""))
    };

    let mut key = opts.trim(key).to_string();
    if opts.to_lower {
        key = key.to_lowercase();
    }
    if opts.underscores {
        key = key.replace(' ', "_");
    }
    (key, opts.trim(value).to_string())
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn nested_block(lines: &[&str], opts: &KeyValueOptions) -> Value {
    if !opts.delim.is_empty() && lines.iter().any(|l| l.contains(opts.delim.as_str())) {
        let flat = KeyValueOptions {
            process_indent: false,
            ..opts.clone()
        };
        Value::Object(lines_to_map(lines, &flat))
    } else {
        Value::Array(
            lines
                .iter()
                .map(|l| Value::String(l.trim().to_string()))
                .collect(),
        )
    }
}

fn lines_to_map(lines: &[&str], opts: &KeyValueOptions) -> Map<String, Value> {
    let mut map = Map::new();

    if !opts.process_indent {
        for line in lines {
            let (key, value) = parse_key_value(line, opts);
            map.insert(key, Value::String(value));
        }
        return map;
    }

    let mut parent: Option<(String, bool, usize)> = None;
    let mut block: Vec<&str> = Vec::new();

    for &line in lines {
        let indent = indent_of(line);
        if let Some((_, true, parent_indent)) = &parent
            && indent > *parent_indent
        {
            block.push(line);
            continue;
        }

        if let Some((key, _, _)) = &parent
            && !block.is_empty()
        {
            map.insert(key.clone(), nested_block(&block, opts));
            block.clear();
        }

        let (key, value) = parse_key_value(line, opts);
        let empty = value.is_empty();
        map.insert(key.clone(), Value::String(value));
        parent = Some((key, empty, indent));
    }

    if let Some((key, _, _)) = parent
        && !block.is_empty()
    {
        map.insert(key, nested_block(&block, opts));
    }
    map
}

/// Turn a buffer of `key<delim>value` lines into an ordered map.
///
/// Empty lines are skipped. A repeated key keeps its position and takes the
/// last value.
#[must_use]
pub fn key_value_outbuf_to_map(buf: &str, opts: &KeyValueOptions) -> Map<String, Value> {
    let lines: Vec<&str> = buf.lines().filter(|l| !l.is_empty()).collect();
    lines_to_map(&lines, opts)
}

/// Turn a table with a header row into one map per data row.
///
/// Columns are separated by whitespace, so header names must not contain
/// blanks. Extra cells beyond the header and missing trailing cells are
/// dropped.
#[must_use]
pub fn outbuf_to_report(buf: &str, to_lower: bool) -> Vec<Map<String, Value>> {
    let mut lines = buf.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let header = if to_lower {
        header.to_lowercase()
    } else {
        header.to_string()
    };
    let columns: Vec<&str> = header.split_whitespace().collect();

    lines
        .map(|row| {
            columns
                .iter()
                .zip(row.split_whitespace())
                .map(|(column, cell)| ((*column).to_string(), Value::String(cell.to_string())))
                .collect()
        })
        .collect()
}

impl CommandResult {
    /// Parse stdout as `key: value` lines with default options.
    #[must_use]
    pub fn stdout_key_values(&self) -> Map<String, Value> {
        key_value_outbuf_to_map(&self.stdout, &KeyValueOptions::default())
    }

    /// Parse stdout as a table with a header row.
    #[must_use]
    pub fn stdout_report(&self) -> Vec<Map<String, Value>> {
        outbuf_to_report(&self.stdout, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let (k, v) = parse_key_value(
            "Current Limit State: No Active Power Limit",
            &KeyValueOptions::default(),
        );
        assert_eq!(k, "current_limit_state");
        assert_eq!(v, "No Active Power Limit");
    }

    #[test]
    fn parse_rejoins_extra_delimiters() {
        let (k, v) = parse_key_value("Time: 12:30:01", &KeyValueOptions::default());
        assert_eq!(k, "time");
        assert_eq!(v, "12:30:01");
    }

    #[test]
    fn parse_custom_options() {
        let opts = KeyValueOptions::default().delim("=").keep_case().keep_blanks();
        assert_eq!(
            parse_key_value("Full Name=Mike", &opts),
            ("Full Name".to_string(), "Mike".to_string())
        );
    }

    #[test]
    fn parse_without_delimiter() {
        let (k, v) = parse_key_value("  Sensor Device ", &KeyValueOptions::default());
        assert_eq!(k, "sensor_device");
        assert_eq!(v, "");
    }

    #[test]
    fn strip_set() {
        let opts = KeyValueOptions::default().strip(" \t\"");
        let (k, v) = parse_key_value("\t\"name\": \"bmc\"", &opts);
        assert_eq!(k, "name");
        assert_eq!(v, "bmc");
    }

    #[test]
    fn indent_ignored_by_default() {
        let buf = "Support :\n    SEL Device\n";
        let map = key_value_outbuf_to_map(buf, &KeyValueOptions::default());
        assert_eq!(map.len(), 2);
        assert_eq!(map["sel_device"], "");
    }

    #[test]
    fn report_empty() {
        assert!(outbuf_to_report("", true).is_empty());
        assert!(outbuf_to_report("PID TTY\n", true).is_empty());
    }
}
