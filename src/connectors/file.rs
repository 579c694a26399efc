use crate::connectors::{BasicExpertInfo, Document, LoadConnector, Section, INDEX_BATCH_SIZE};
use crate::domain::models::{parse_platform_datetime, DocumentSource};
use crate::error::HarnessResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const DOC_ID_PREFIX: &str = "FILE_CONNECTOR__";
const METADATA_MARKER: &str = "DANSWER_METADATA=";

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "mdx", "conf", "log", "json", "csv", "tsv", "xml", "yml", "yaml",
];

/// Keys with dedicated document fields; everything else becomes a tag.
const RESERVED_KEYS: &[&str] = &[
    "document_id",
    "time_updated",
    "doc_updated_at",
    "link",
    "primary_owners",
    "secondary_owners",
    "filename",
    "file_display_name",
    "title",
];

/// Local file connector: one document per text file.
pub struct LocalFileConnector {
    file_locations: Vec<PathBuf>,
    batch_size: usize,
}

impl LocalFileConnector {
    pub fn new(file_locations: Vec<PathBuf>) -> Self {
        Self {
            file_locations,
            batch_size: INDEX_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Expand directories into the files beneath them.
    fn expand_locations(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for location in &self.file_locations {
            if location.is_dir() {
                let mut entries: Vec<PathBuf> = WalkDir::new(location)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path())
                    .collect();
                entries.sort();
                files.extend(entries);
            } else {
                files.push(location.clone());
            }
        }
        files
    }
}

#[async_trait]
impl LoadConnector for LocalFileConnector {
    fn source(&self) -> DocumentSource {
        DocumentSource::File
    }

    async fn load_from_state(&self) -> HarnessResult<Vec<Vec<Document>>> {
        let mut batches = Vec::new();
        let mut documents = Vec::new();

        for path in self.expand_locations() {
            let now = Utc::now();
            let file_name = path.to_string_lossy().to_string();

            if !is_text_file(&path) {
                warn!("Skipping file '{}' with extension '{}'", file_name, extension(&path));
                continue;
            }

            let bytes = tokio::fs::read(&path).await?;
            let raw = String::from_utf8_lossy(&bytes);

            let mut metadata = Map::new();
            metadata.insert("time_updated".to_string(), Value::String(now.to_rfc3339()));

            documents.push(process_text_file(&file_name, &raw, metadata, now));

            if documents.len() >= self.batch_size {
                batches.push(std::mem::take(&mut documents));
            }
        }

        if !documents.is_empty() {
            batches.push(documents);
        }

        info!(
            "Loaded {} documents in {} batches",
            batches.iter().map(Vec::len).sum::<usize>(),
            batches.len()
        );
        Ok(batches)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn is_text_file(path: &Path) -> bool {
    TEXT_EXTENSIONS.contains(&extension(path).as_str())
}

/// Split off a leading `#DANSWER_METADATA={...}` or
/// `<!-- DANSWER_METADATA={...} -->` line.
pub fn read_text_with_metadata(raw: &str) -> (String, Map<String, Value>) {
    let (first_line, rest) = match raw.find('\n') {
        Some(idx) => (&raw[..idx], &raw[idx + 1..]),
        None => (raw, ""),
    };

    match extract_metadata(first_line) {
        Some(metadata) => (rest.to_string(), metadata),
        None => (raw.to_string(), Map::new()),
    }
}

fn extract_metadata(line: &str) -> Option<Map<String, Value>> {
    let marker = line.find(METADATA_MARKER)?;
    let prefix = line[..marker].trim_end();
    if !(prefix.ends_with('#') || prefix.ends_with("<!--")) {
        return None;
    }

    let json_part = &line[marker + METADATA_MARKER.len()..];
    let end = json_part.rfind('}')?;
    match serde_json::from_str::<Value>(&json_part[..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => {
            debug!("Ignoring malformed metadata line: {}", line);
            None
        }
    }
}

fn owners(value: Option<&Value>) -> Option<Vec<BasicExpertInfo>> {
    let names: Vec<BasicExpertInfo> = value?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(|name| BasicExpertInfo {
            display_name: name.to_string(),
        })
        .collect();
    (!names.is_empty()).then_some(names)
}

fn time_value(file_name: &str, key: &str, metadata: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let value = metadata.get(key).filter(|v| !v.is_null())?;
    let parsed = value.as_str().and_then(parse_platform_datetime);
    if parsed.is_none() {
        warn!("Ignoring unparsable {} {} in '{}'", key, value, file_name);
    }
    parsed
}

/// Build the document for one text file. Metadata embedded in the file
/// overrides `metadata`, except for the document id.
pub fn process_text_file(
    file_name: &str,
    raw: &str,
    mut metadata: Map<String, Value>,
    loaded_at: DateTime<Utc>,
) -> Document {
    let id = metadata
        .get("document_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("{}{}", DOC_ID_PREFIX, file_name));

    let (content, file_metadata) = read_text_with_metadata(raw);
    metadata.extend(file_metadata);

    let display_name = metadata
        .get("file_display_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .unwrap_or_else(|| {
            Path::new(file_name)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.to_string())
        });

    let title = match metadata.get("title") {
        Some(value) => value.as_str().unwrap_or("").to_string(),
        None => display_name.clone(),
    };

    let time_updated = time_value(file_name, "time_updated", &metadata).unwrap_or(loaded_at);
    let doc_updated_at = time_value(file_name, "doc_updated_at", &metadata).unwrap_or(time_updated);

    let link = metadata.get("link").and_then(Value::as_str).map(String::from);

    let tags: HashMap<String, Value> = metadata
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Document {
        id,
        sections: vec![Section {
            link,
            text: content.trim().to_string(),
        }],
        source: DocumentSource::File,
        semantic_identifier: display_name,
        title,
        doc_updated_at,
        primary_owners: owners(metadata.get("primary_owners")),
        secondary_owners: owners(metadata.get("secondary_owners")),
        metadata: tags,
    }
}
