//! Per-extension link extractor table

use crate::crawler::parser::LinkExtractor;
use crate::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps a file extension to the extractor run on downloads with that extension
///
/// Extensions are stored lowercase without the leading dot, so `".HTML"` and
/// `"html"` name the same entry.
#[derive(Default, Clone)]
pub struct ExtensionHandlers {
    handlers: HashMap<String, Arc<dyn LinkExtractor>>,
}

impl ExtensionHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extractor for an extension
    ///
    /// Registering a second extractor for the same extension is a
    /// configuration error.
    pub fn register<E>(&mut self, extension: &str, extractor: E) -> Result<(), ConfigError>
    where
        E: LinkExtractor + 'static,
    {
        let key = normalize_extension(extension);
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "extension for a link extractor cannot be empty".to_string(),
            ));
        }
        if self.handlers.contains_key(&key) {
            return Err(ConfigError::DuplicateHandler(key));
        }

        self.handlers.insert(key, Arc::new(extractor));
        Ok(())
    }

    /// Returns the extractor registered for an extension
    pub fn get(&self, extension: &str) -> Option<Arc<dyn LinkExtractor>> {
        self.handlers.get(&normalize_extension(extension)).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for ExtensionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<&String> = self.handlers.keys().collect();
        extensions.sort();
        f.debug_struct("ExtensionHandlers")
            .field("extensions", &extensions)
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}
