//! Item pipeline: an ordered chain of processors each item passes through.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CrawlError;
use crate::events::{CrawlEvent, EventBus};
use crate::item::Item;
use crate::middleware::{MiddlewareAction, parse_options, reject_options};

pub type ItemAction = MiddlewareAction<Item>;

/// A stage of the item pipeline. May transform the item or drop it.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn configure(&mut self, options: &Value) -> Result<(), CrawlError> {
        reject_options(self.name(), options)
    }

    async fn process_item(&self, item: Item) -> ItemAction;
}

pub struct ItemPipeline {
    events: EventBus,
    processors: Vec<Box<dyn ItemProcessor>>,
}

impl ItemPipeline {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            processors: Vec::new(),
        }
    }

    pub fn set_processors(&mut self, processors: Vec<Box<dyn ItemProcessor>>) {
        self.processors = processors;
    }

    pub fn clear_processors(&mut self) {
        self.processors.clear();
    }

    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run `item` through every processor.
    ///
    /// Returns the finished item after emitting `ItemScraped`, or `None` after
    /// emitting `ItemDropped`. A dropped item never reaches later processors.
    pub async fn process(&self, mut item: Item) -> Option<Item> {
        for processor in &self.processors {
            match processor.process_item(item).await {
                MiddlewareAction::Continue(next) => item = next,
                MiddlewareAction::Drop { dropped, reason } => {
                    tracing::debug!(processor = processor.name(), %reason, "Item dropped");
                    self.events.publish(CrawlEvent::ItemDropped {
                        item: &dropped,
                        reason: &reason,
                    });
                    return None;
                }
            }
        }
        self.events.publish(CrawlEvent::ItemScraped { item: &item });
        Some(item)
    }
}

impl std::fmt::Debug for ItemPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemPipeline")
            .field("processors", &self.processor_names())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemDeduplicationOptions {
    /// Fields whose combined values identify an item.
    pub fields: Vec<String>,
}

/// Drops items whose selected field values were already seen in this run.
#[derive(Debug, Default)]
pub struct ItemDeduplicationProcessor {
    fields: Vec<String>,
    seen: Mutex<HashSet<String>>,
}

impl ItemDeduplicationProcessor {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            seen: Mutex::new(HashSet::new()),
        }
    }

    fn fingerprint(&self, item: &Item) -> String {
        let values = self
            .fields
            .iter()
            .map(|field| item.get(field).cloned().unwrap_or(Value::Null))
            .collect();
        Value::Array(values).to_string()
    }
}

#[async_trait]
impl ItemProcessor for ItemDeduplicationProcessor {
    fn name(&self) -> &'static str {
        "ItemDeduplicationProcessor"
    }

    fn configure(&mut self, options: &Value) -> Result<(), CrawlError> {
        let options: ItemDeduplicationOptions = parse_options(self.name(), options)?;
        if options.fields.is_empty() {
            return Err(CrawlError::Configuration(format!(
                "{} requires a non-empty 'fields' option",
                self.name()
            )));
        }
        self.fields = options.fields;
        Ok(())
    }

    async fn process_item(&self, item: Item) -> ItemAction {
        let key = self.fingerprint(&item);
        let first = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| {
                tracing::warn!("Recovered from poisoned item dedup set");
                poisoned.into_inner()
            })
            .insert(key);
        if first {
            MiddlewareAction::Continue(item)
        } else {
            MiddlewareAction::dropped(item, "duplicate item")
        }
    }
}
