//! Text recognition engine implementations
//!
//! Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

use crate::config::Config;
use crate::error::ScanError;
use crate::recognizer::TextRecognizer;
use std::sync::Arc;

/// Initialize the default text recognition engine
pub fn init(config: &Config) -> Result<Arc<dyn TextRecognizer>, ScanError> {
    #[cfg(feature = "engine-ocrs")]
    {
        tracing::info!("Initializing ocrs engine...");
        let engine = ocrs::OcrsEngine::new(config)?;
        Ok(Arc::new(engine))
    }

    #[cfg(not(feature = "engine-ocrs"))]
    {
        let _ = config;
        Err(ScanError::InitializationError(
            "No text recognition engine available. Build with --features engine-ocrs".to_string(),
        ))
    }
}
