use std::collections::HashMap;
use std::fmt;

use crate::mentions::types::ResolvedMention;

/// Filter run before mentions of one content type are stored. It receives the
/// content id and may drop or reorder entries; whatever is left is inserted.
pub type MentionFilter = Box<dyn Fn(u64, &mut Vec<ResolvedMention>) + Send + Sync>;

/// Per content type extension point for the writer.
#[derive(Default)]
pub struct MentionHooks {
    filters: HashMap<String, Vec<MentionFilter>>,
}

impl MentionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, content_type: &str, filter: F)
    where
        F: Fn(u64, &mut Vec<ResolvedMention>) + Send + Sync + 'static,
    {
        self.filters
            .entry(content_type.to_string())
            .or_default()
            .push(Box::new(filter));
    }

    /// Run the filters registered for `content_type`, in registration order.
    pub fn apply(&self, content_type: &str, content_id: u64, mentions: &mut Vec<ResolvedMention>) {
        if let Some(filters) = self.filters.get(content_type) {
            for filter in filters {
                filter(content_id, mentions);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for MentionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(&String, usize)> =
            self.filters.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("MentionHooks").field("filters", &counts).finish()
    }
}
