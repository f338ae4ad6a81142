//! Version 3 source maps: decoding, position lookup, and composition.
//!
//! Cache keys embed line numbers of the stage that produced them. When an
//! earlier build stage rewrites line numbers, the stage's map is used to move
//! keys into the current coordinates; when stages are chained their maps are
//! composed into one covering the full span.

pub mod vlq;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_root: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    names: Vec<String>,
    mappings: String,
}

/// One decoded segment. All coordinates are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<u32>,
    pub original_line: u32,
    pub original_column: u32,
    pub name: Option<u32>,
}

/// An original position found by a lookup. 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: u32,
    pub line: u32,
    pub column: u32,
    pub name: Option<u32>,
}

/// A decoded source map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    pub file: Option<String>,
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    pub sources_content: Option<Vec<Option<String>>>,
    pub names: Vec<String>,
    /// Sorted by generated position.
    mappings: Vec<Mapping>,
}

impl SourceMap {
    /// Build a map from already-decoded segments.
    #[must_use]
    pub fn from_mappings(sources: Vec<String>, names: Vec<String>, mut mappings: Vec<Mapping>) -> Self {
        mappings.sort_by_key(|m| (m.generated_line, m.generated_column));
        Self {
            sources,
            names,
            mappings,
            ..Self::default()
        }
    }

    /// A map sending every line of `source` to itself.
    #[must_use]
    pub fn identity(source: &str, line_count: u32) -> Self {
        let mappings = (0..line_count)
            .map(|line| Mapping {
                generated_line: line,
                generated_column: 0,
                source: Some(0),
                original_line: line,
                original_column: 0,
                name: None,
            })
            .collect();
        Self::from_mappings(vec![source.to_string()], Vec::new(), mappings)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSourceMap =
            serde_json::from_str(json).map_err(|source| Error::SourceMapParse { source })?;
        let mappings = decode_mappings(&raw.mappings)?;
        Ok(Self {
            file: raw.file,
            source_root: raw.source_root,
            sources: raw.sources,
            sources_content: raw.sources_content,
            names: raw.names,
            mappings,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let raw = RawSourceMap {
            version: 3,
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: self.names.clone(),
            mappings: encode_mappings(&self.mappings),
        };
        serde_json::to_string(&raw).map_err(|source| Error::SourceMapParse { source })
    }

    #[must_use]
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Original position of a generated position: the closest segment on
    /// `line` at or before `column`.
    #[must_use]
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let start = self.mappings.partition_point(|m| m.generated_line < line);
        self.mappings[start..]
            .iter()
            .take_while(|m| m.generated_line == line)
            .filter(|m| m.generated_column <= column)
            .last()
            .and_then(|m| {
                m.source.map(|source| OriginalPosition {
                    source,
                    line: m.original_line,
                    column: m.original_column,
                    name: m.name,
                })
            })
    }

    /// Index of `path` in `sources`: an exact match, else the single entry
    /// naming the same file up to a directory prefix. A map with one source
    /// answers 0 for any path.
    #[must_use]
    pub fn source_index(&self, path: &str) -> Option<u32> {
        let path = path.trim_start_matches("./");
        let position = self
            .sources
            .iter()
            .position(|s| s.trim_start_matches("./") == path)
            .or_else(|| {
                let mut matches = self
                    .sources
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| same_file(s.trim_start_matches("./"), path));
                match (matches.next(), matches.next()) {
                    (Some((i, _)), None) => Some(i),
                    _ => None,
                }
            })
            .or_else(|| (self.sources.len() == 1).then_some(0));
        position.and_then(|i| u32::try_from(i).ok())
    }

    /// First generated line carrying a segment from `original_line` of
    /// `source`.
    #[must_use]
    pub fn generated_line_for(&self, source: u32, original_line: u32) -> Option<u32> {
        self.mappings
            .iter()
            .filter(|m| m.source == Some(source) && m.original_line == original_line)
            .map(|m| m.generated_line)
            .min()
    }

    /// Chain two stages: `first` maps A to B, `second` maps B to C; the
    /// result maps A to C. Segments of `second` with no origin in `first`
    /// are dropped.
    #[must_use]
    pub fn compose(first: &SourceMap, second: &SourceMap) -> SourceMap {
        let mut names: Vec<String> = Vec::new();
        let mut name_index: HashMap<String, u32> = HashMap::new();
        let mut intern = |name: &str| -> u32 {
            if let Some(&idx) = name_index.get(name) {
                return idx;
            }
            let idx = u32::try_from(names.len()).unwrap_or(u32::MAX);
            names.push(name.to_string());
            name_index.insert(name.to_string(), idx);
            idx
        };

        let mut mappings = Vec::with_capacity(second.mappings.len());
        for m in &second.mappings {
            if m.source.is_none() {
                continue;
            }
            let Some(origin) = first.original_position_for(m.original_line, m.original_column) else {
                continue;
            };
            let name = origin
                .name
                .and_then(|i| first.names.get(i as usize))
                .or_else(|| m.name.and_then(|i| second.names.get(i as usize)))
                .map(|n| intern(n));
            mappings.push(Mapping {
                generated_line: m.generated_line,
                generated_column: m.generated_column,
                source: Some(origin.source),
                original_line: origin.line,
                original_column: origin.column,
                name,
            });
        }

        SourceMap {
            file: second.file.clone(),
            source_root: first.source_root.clone(),
            sources: first.sources.clone(),
            sources_content: first.sources_content.clone(),
            names,
            mappings,
        }
    }
}

/// Whether one path is the other with leading directories removed.
fn same_file(a: &str, b: &str) -> bool {
    let ends_with_segment = |long: &str, short: &str| {
        long.strip_suffix(short).is_some_and(|rest| rest.ends_with('/'))
    };
    ends_with_segment(a, b) || ends_with_segment(b, a)
}

/// Decode a `mappings` string into segments.
pub fn decode_mappings(mappings: &str) -> Result<Vec<Mapping>> {
    let mut decoded = Vec::new();
    let mut prev_source = 0i64;
    let mut prev_original_line = 0i64;
    let mut prev_original_column = 0i64;
    let mut prev_name = 0i64;

    for (generated_line, line) in mappings.split(';').enumerate() {
        let generated_line = to_u32(generated_line as i64, line)?;
        let mut prev_generated_column = 0i64;

        for segment in line.split(',').filter(|s| !s.is_empty()) {
            let bad = || Error::SourceMapDecode {
                segment: segment.to_string(),
            };
            let mut fields = [0i64; 5];
            let mut count = 0;
            let mut rest = segment;
            while !rest.is_empty() {
                if count == fields.len() {
                    return Err(bad());
                }
                let (value, consumed) = vlq::decode(rest).ok_or_else(bad)?;
                fields[count] = value;
                count += 1;
                rest = &rest[consumed..];
            }
            if !matches!(count, 1 | 4 | 5) {
                return Err(bad());
            }

            prev_generated_column += fields[0];
            let mut mapping = Mapping {
                generated_line,
                generated_column: to_u32(prev_generated_column, segment)?,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };
            if count >= 4 {
                prev_source += fields[1];
                prev_original_line += fields[2];
                prev_original_column += fields[3];
                mapping.source = Some(to_u32(prev_source, segment)?);
                mapping.original_line = to_u32(prev_original_line, segment)?;
                mapping.original_column = to_u32(prev_original_column, segment)?;
            }
            if count == 5 {
                prev_name += fields[4];
                mapping.name = Some(to_u32(prev_name, segment)?);
            }
            decoded.push(mapping);
        }
    }

    decoded.sort_by_key(|m| (m.generated_line, m.generated_column));
    Ok(decoded)
}

fn to_u32(value: i64, segment: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::SourceMapDecode {
        segment: segment.to_string(),
    })
}

/// Encode segments (sorted by generated position) into a `mappings` string.
#[must_use]
pub fn encode_mappings(mappings: &[Mapping]) -> String {
    let mut out = String::new();
    let mut line = 0u32;
    let mut prev_generated_column = 0i64;
    let mut prev_source = 0i64;
    let mut prev_original_line = 0i64;
    let mut prev_original_column = 0i64;
    let mut prev_name = 0i64;
    let mut first_in_line = true;

    for m in mappings {
        while line < m.generated_line {
            out.push(';');
            line += 1;
            prev_generated_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;

        vlq::encode(i64::from(m.generated_column) - prev_generated_column, &mut out);
        prev_generated_column = i64::from(m.generated_column);

        if let Some(source) = m.source {
            vlq::encode(i64::from(source) - prev_source, &mut out);
            vlq::encode(i64::from(m.original_line) - prev_original_line, &mut out);
            vlq::encode(i64::from(m.original_column) - prev_original_column, &mut out);
            prev_source = i64::from(source);
            prev_original_line = i64::from(m.original_line);
            prev_original_column = i64::from(m.original_column);

            if let Some(name) = m.name {
                vlq::encode(i64::from(name) - prev_name, &mut out);
                prev_name = i64::from(name);
            }
        }
    }
    out
}
