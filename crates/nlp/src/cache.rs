//! Process-wide parse cache with `pipe`-style batch entry points.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::doc::ParsedDoc;
use crate::tagger::Tagger;

/// Minimum batch size for full sentences.
pub const BATCH_SIZE_LONG: usize = 64;
/// Minimum batch size for short surfaces and keywords.
pub const BATCH_SIZE_SHORT: usize = 256;

/// Number of parsed documents held in the LRU cache.
const DOC_CACHE_CAPACITY: usize = 16_384;

/// LRU-fronted parser. Cloneable handles share one cache, so a single
/// instance per run makes duplicate sentences parse exactly once.
#[derive(Clone)]
pub struct DocCache {
    tagger: Arc<dyn Tagger>,
    cache: Arc<Mutex<LruCache<String, Arc<ParsedDoc>>>>,
}

impl DocCache {
    pub fn new(tagger: Arc<dyn Tagger>) -> Self {
        Self {
            tagger,
            cache: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(DOC_CACHE_CAPACITY).unwrap(),
            ))),
        }
    }

    pub fn parse(&self, text: &str) -> Arc<ParsedDoc> {
        if let Some(doc) = self.cache.lock().unwrap().get(text) {
            return Arc::clone(doc);
        }
        let doc = Arc::new(ParsedDoc::new(text, self.tagger.tag(text)));
        self.cache
            .lock()
            .unwrap()
            .put(text.to_string(), Arc::clone(&doc));
        doc
    }

    /// Batch-parse full sentences.
    pub fn parse_sentences(&self, texts: &[&str]) -> Vec<Arc<ParsedDoc>> {
        self.parse_batch(texts, BATCH_SIZE_LONG)
    }

    /// Batch-parse short surfaces (annotation surfaces, keywords, phrases).
    pub fn parse_surfaces(&self, texts: &[&str]) -> Vec<Arc<ParsedDoc>> {
        self.parse_batch(texts, BATCH_SIZE_SHORT)
    }

    fn parse_batch(&self, texts: &[&str], batch_size: usize) -> Vec<Arc<ParsedDoc>> {
        // figure out which unique texts still need parsing
        let mut missing: Vec<&str> = Vec::new();
        {
            let mut cache = self.cache.lock().unwrap();
            for text in texts {
                if cache.get(*text).is_none() && !missing.contains(text) {
                    missing.push(text);
                }
            }
        }

        // parse misses in backend-sized chunks, outside the cache lock
        for chunk in missing.chunks(batch_size.max(1)) {
            let tagged = self.tagger.tag_batch(chunk);
            let mut cache = self.cache.lock().unwrap();
            for (text, raw) in chunk.iter().zip(tagged) {
                cache.put(text.to_string(), Arc::new(ParsedDoc::new(*text, raw)));
            }
        }

        texts.iter().map(|text| self.parse(text)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::{RawToken, RuleTagger};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTagger {
        inner: RuleTagger,
        calls: AtomicUsize,
    }

    impl Tagger for CountingTagger {
        fn tag(&self, text: &str) -> Vec<RawToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.tag(text)
        }
    }

    #[test]
    fn duplicate_texts_parse_once() {
        let tagger = Arc::new(CountingTagger {
            inner: RuleTagger::new(),
            calls: AtomicUsize::new(0),
        });
        let cache = DocCache::new(tagger.clone());

        cache.parse("The same sentence.");
        cache.parse("The same sentence.");
        let docs = cache.parse_sentences(&["The same sentence.", "A new one."]);
        assert_eq!(docs.len(), 2);
        // one call for the repeated sentence, one for the new one
        assert_eq!(tagger.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn batch_preserves_input_order() {
        let cache = DocCache::new(Arc::new(RuleTagger::new()));
        let docs = cache.parse_surfaces(&["second thought", "first draft"]);
        assert_eq!(docs[0].text, "second thought");
        assert_eq!(docs[1].text, "first draft");
    }
}
