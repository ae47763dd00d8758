//! Identity document scanning: TD1 machine readable zone decoding, UAE
//! identity card front-text extraction and perspective rectification of
//! photographed documents, with an HTTP service on top.

pub mod config;
pub mod detection;
pub mod emirates;
pub mod engines;
pub mod error;
pub mod mrz;
pub mod recognizer;
pub mod rectify;
pub mod server;
pub mod vision;
