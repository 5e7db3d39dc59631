//! Session archive and idea-history documents.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::capability::ImageFetcher;
use crate::codec;
use crate::error::ExportError;
use crate::store::{ExplorationStore, Node};
use crate::types::NodeId;

/// Name of the manifest entry inside a session archive.
pub const MANIFEST_NAME: &str = "metadata.json";

/// One exported node as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub prompt: Option<String>,
    /// Path of the image inside the archive.
    pub saved_filename: String,
}

/// A finished zip archive held in memory.
#[derive(Debug, Clone)]
pub struct SessionArchive {
    /// Suggested download name, `explorer-session-<millis>.zip`.
    pub filename: String,
    pub bytes: Vec<u8>,
    pub manifest: Vec<ManifestEntry>,
}

impl SessionArchive {
    /// Write the archive into `dir` under its suggested name.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let path = dir.as_ref().join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Bundle the images of `node_ids` plus a manifest into a zip archive.
///
/// Duplicate ids are exported once, unknown ids are skipped. Images are
/// fetched concurrently and a single failed fetch aborts the whole export.
pub async fn export_session<F>(
    store: &ExplorationStore,
    fetcher: &F,
    node_ids: &[NodeId],
) -> Result<SessionArchive, ExportError>
where
    F: ImageFetcher,
{
    let nodes = select_nodes(store, node_ids);
    if nodes.is_empty() {
        return Err(ExportError::EmptySelection);
    }

    let images = try_join_all(nodes.iter().map(|node| async move {
        codec::load_bytes(fetcher, &node.image)
            .await
            .map_err(|source| ExportError::Fetch {
                node_id: node.id.clone(),
                source,
            })
    }))
    .await?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut manifest = Vec::with_capacity(nodes.len());

    for (node, (bytes, content_type)) in nodes.iter().zip(images) {
        let saved_filename = format!(
            "images/{}.{}",
            node.id,
            codec::extension_for(content_type.as_deref())
        );
        zip.start_file(saved_filename.as_str(), options)?;
        zip.write_all(&bytes)?;

        manifest.push(ManifestEntry {
            id: node.id.clone(),
            parent_id: node.parent_id.clone(),
            prompt: node.prompt.clone(),
            saved_filename,
        });
    }

    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
    let bytes = zip.finish()?.into_inner();

    let filename = format!(
        "explorer-session-{}.zip",
        chrono::Utc::now().timestamp_millis()
    );
    info!(nodes = manifest.len(), size = bytes.len(), "session exported");

    Ok(SessionArchive {
        filename,
        bytes,
        manifest,
    })
}

/// Pretty JSON list of every exploration recorded in this session.
pub fn export_idea_history(store: &ExplorationStore) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&store.idea_history())?)
}

fn select_nodes(store: &ExplorationStore, node_ids: &[NodeId]) -> Vec<Node> {
    let mut seen: Vec<&str> = Vec::new();
    let mut nodes = Vec::new();
    for id in node_ids {
        if seen.contains(&id.as_str()) {
            continue;
        }
        seen.push(id);
        match store.node(id) {
            Some(node) => nodes.push(node),
            None => warn!(node = %id, "skipping unknown node in export"),
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageRef;

    #[test]
    fn selection_dedupes_and_skips_unknown() {
        let store = ExplorationStore::new();
        let root = store.create_root(ImageRef::Url("data:image/png;base64,AAAA".into()));
        let ids = vec![root.clone(), "ghost".to_string(), root.clone()];
        let nodes = select_nodes(&store, &ids);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, root);
    }

    #[test]
    fn manifest_entry_wire_names() {
        let entry = ManifestEntry {
            id: "a".into(),
            parent_id: None,
            prompt: None,
            saved_filename: "images/a.png".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "a", "parentId": null, "prompt": null, "savedFilename": "images/a.png"})
        );
    }
}
