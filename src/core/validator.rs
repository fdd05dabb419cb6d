use crate::core::{Block, Blockchain};
use crate::error::{BlockchainError, Result};

/// Append-time validation policy. The chain hands itself in by reference,
/// so the policy has read access to chain state without an ownership cycle.
pub trait Validate: Send + Sync {
    fn validate(&self, chain: &Blockchain, block: &Block) -> Result<()>;
}

/// The default policy applied by `Blockchain::add_block`.
pub struct BlockValidator;

impl Validate for BlockValidator {
    fn validate(&self, chain: &Blockchain, block: &Block) -> Result<()> {
        if chain.has_block(&block.get_data_hash()) {
            return Err(BlockchainError::BlockValidationFailed(format!(
                "block {} already exists",
                block.get_data_hash()
            )));
        }

        let current_height = chain.height();
        if block.get_height() != current_height + 1 {
            return Err(BlockchainError::BlockValidationFailed(format!(
                "invalid block height: {}, current height: {}",
                block.get_height(),
                current_height
            )));
        }

        let latest = chain.get_latest_block().ok_or_else(|| {
            BlockchainError::BlockValidationFailed("chain has no blocks".to_string())
        })?;
        if latest.get_data_hash() != block.get_prev_block_hash() {
            return Err(BlockchainError::BlockValidationFailed(format!(
                "invalid predecessor hash: {}, latest block: {}",
                block.get_prev_block_hash(),
                latest.get_data_hash()
            )));
        }

        if !block.verify() {
            return Err(BlockchainError::BlockValidationFailed(format!(
                "block {} failed verification",
                block.get_data_hash()
            )));
        }

        Ok(())
    }
}
