//! Binary graph snapshots.
//!
//! Layout: the 4-byte magic `EREW`, one format version byte, then the
//! postcard encoding of the graph's triple list.

use super::json::GraphDocument;
use crate::error::{EngineError, Result};
use crate::graph::{Graph, SerializableGraph};
use std::path::Path;
use tracing::debug;

/// Leading bytes of every snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"EREW";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 1;

/// True if `bytes` start with the snapshot magic.
#[must_use]
pub fn is_snapshot(bytes: &[u8]) -> bool {
    bytes.starts_with(&SNAPSHOT_MAGIC)
}

/// Encode a graph as a snapshot.
pub fn encode(graph: &Graph) -> Result<Vec<u8>> {
    let body = postcard::to_allocvec(&SerializableGraph::from(graph))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&SNAPSHOT_MAGIC);
    bytes.push(SNAPSHOT_VERSION);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode a snapshot produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Graph> {
    if !is_snapshot(bytes) {
        return Err(EngineError::InvalidSnapshot("missing EREW header".into()));
    }
    match bytes.get(SNAPSHOT_MAGIC.len()) {
        Some(&SNAPSHOT_VERSION) => {}
        Some(other) => {
            return Err(EngineError::InvalidSnapshot(format!(
                "unsupported version {other} (expected {SNAPSHOT_VERSION})"
            )));
        }
        None => return Err(EngineError::InvalidSnapshot("truncated header".into())),
    }
    let body = bytes.get(HEADER_LEN..).unwrap_or_default();
    let serializable: SerializableGraph = postcard::from_bytes(body)?;
    Ok(Graph::from(serializable))
}

/// Write a snapshot file.
pub fn save_snapshot(graph: &Graph, path: &Path) -> Result<()> {
    let bytes = encode(graph)?;
    std::fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
    Ok(())
}

/// Read a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Graph> {
    decode(&std::fs::read(path)?)
}

/// Read a graph from either a snapshot or a JSON document, by content.
pub fn load_graph(path: &Path) -> Result<Graph> {
    let bytes = std::fs::read(path)?;
    if is_snapshot(&bytes) {
        debug!(path = %path.display(), "loading graph snapshot");
        return decode(&bytes);
    }
    let text = String::from_utf8(bytes)
        .map_err(|e| EngineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    Ok(GraphDocument::from_json(&text)?.to_graph())
}

// =============================================================================
// TESTS
// =============================================================================
