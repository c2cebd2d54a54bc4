use std::fs;
use std::path::Path;

use duskwatch_types::NodeId;
use uuid::Uuid;

use crate::error::{CryptoError, CryptoResult};

/// Load the node identity from `path`, creating it on first run and never
/// mutating it afterwards: a single file at a stable data-directory path
/// holds the node UUID.
pub fn load_or_create_node_identity(path: &Path) -> CryptoResult<NodeId> {
    if let Ok(contents) = fs::read_to_string(path) {
        let trimmed = contents.trim();
        let uuid = Uuid::parse_str(trimmed)
            .map_err(|e| CryptoError::Io(format!("corrupt node identity file: {e}")))?;
        return Ok(NodeId(uuid));
    }

    let node_id = NodeId::new();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CryptoError::Io(e.to_string()))?;
    }
    fs::write(path, node_id.0.to_string()).map_err(|e| CryptoError::Io(e.to_string()))?;
    tracing::info!(node_id = %node_id, path = %path.display(), "generated new node identity");
    Ok(node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identity_is_created_once_and_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node_id");

        let first = load_or_create_node_identity(&path).unwrap();
        let second = load_or_create_node_identity(&path).unwrap();
        assert_eq!(first, second);
    }
}
