//! Provenance metadata for a minted token.

use crate::domain::{MetadataTemplate, StepFailure, TokenMetadata, WorkflowStep};

/// Build the ERC-721 metadata document for `token_id`.
pub fn build_metadata(template: &MetadataTemplate, token_id: u64) -> TokenMetadata {
    let name = format!("{} #{}", template.collection, token_id);
    let description = if template.description.is_empty() {
        name.clone()
    } else {
        template.description.clone()
    };
    TokenMetadata {
        name,
        description,
        image: template.image.clone(),
        attributes: template.attributes.clone(),
    }
}

/// Serialize metadata for upload.
pub fn encode_metadata(metadata: &TokenMetadata) -> Result<Vec<u8>, StepFailure> {
    serde_json::to_vec(metadata).map_err(|e| StepFailure::new(WorkflowStep::BuildMetadata, e))
}
