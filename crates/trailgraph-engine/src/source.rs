//! The source-record collaborator boundary.
//!
//! The engine never owns topic/item records; it reads them from
//! whatever repository the host application uses. All it needs is
//! id, label, and ownership.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use trailgraph_core::error::Result;
use trailgraph_core::types::{ItemRecord, SourceRecord, TopicRecord};

/// Read access to the source records the graph is derived from.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Look up a single topic record.
    async fn topic(&self, topic_id: i64) -> Result<Option<TopicRecord>>;

    /// All topic records.
    async fn topics(&self) -> Result<Vec<TopicRecord>>;

    /// All item records belonging to a topic.
    async fn items_for(&self, topic_id: i64) -> Result<Vec<ItemRecord>>;

    /// Every source record, for fingerprinting.
    async fn records(&self) -> Result<Vec<SourceRecord>> {
        let mut records = Vec::new();
        for topic in self.topics().await? {
            let topic_id = topic.id;
            records.push(SourceRecord::Topic(topic));
            for item in self.items_for(topic_id).await? {
                records.push(SourceRecord::Item(item));
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl<T: SourceRepository + ?Sized> SourceRepository for std::sync::Arc<T> {
    async fn topic(&self, topic_id: i64) -> Result<Option<TopicRecord>> {
        (**self).topic(topic_id).await
    }

    async fn topics(&self) -> Result<Vec<TopicRecord>> {
        (**self).topics().await
    }

    async fn items_for(&self, topic_id: i64) -> Result<Vec<ItemRecord>> {
        (**self).items_for(topic_id).await
    }

    async fn records(&self) -> Result<Vec<SourceRecord>> {
        (**self).records().await
    }
}

#[derive(Default)]
struct Inner {
    topics: BTreeMap<i64, TopicRecord>,
    items: BTreeMap<i64, ItemRecord>,
}

/// In-memory source repository, for tests and embedded use.
#[derive(Default)]
pub struct MemorySourceRepository {
    inner: RwLock<Inner>,
}

impl MemorySourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_topic(&self, topic: TopicRecord) {
        self.inner.write().unwrap().topics.insert(topic.id, topic);
    }

    pub fn insert_item(&self, item: ItemRecord) {
        self.inner.write().unwrap().items.insert(item.id, item);
    }

    /// Remove a topic and every item it owns.
    pub fn remove_topic(&self, topic_id: i64) {
        let mut inner = self.inner.write().unwrap();
        inner.topics.remove(&topic_id);
        inner.items.retain(|_, item| item.topic_id != topic_id);
    }
}

#[async_trait]
impl SourceRepository for MemorySourceRepository {
    async fn topic(&self, topic_id: i64) -> Result<Option<TopicRecord>> {
        Ok(self.inner.read().unwrap().topics.get(&topic_id).cloned())
    }

    async fn topics(&self) -> Result<Vec<TopicRecord>> {
        Ok(self.inner.read().unwrap().topics.values().cloned().collect())
    }

    async fn items_for(&self, topic_id: i64) -> Result<Vec<ItemRecord>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .items
            .values()
            .filter(|item| item.topic_id == topic_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_interleave_topics_and_their_items() {
        let repo = MemorySourceRepository::new();
        repo.insert_topic(TopicRecord::new(1, "Rust"));
        repo.insert_item(ItemRecord::new(10, 1, "Ownership"));
        repo.insert_topic(TopicRecord::new(2, "Databases"));

        let records = repo.records().await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(&records[0], SourceRecord::Topic(t) if t.id == 1));
        assert!(matches!(&records[1], SourceRecord::Item(i) if i.id == 10));
    }

    #[tokio::test]
    async fn remove_topic_drops_owned_items() {
        let repo = MemorySourceRepository::new();
        repo.insert_topic(TopicRecord::new(1, "Rust"));
        repo.insert_item(ItemRecord::new(10, 1, "Ownership"));
        repo.insert_topic(TopicRecord::new(2, "Databases"));
        repo.insert_item(ItemRecord::new(20, 2, "Indexes"));

        repo.remove_topic(1);

        assert!(repo.topic(1).await.unwrap().is_none());
        assert!(repo.items_for(1).await.unwrap().is_empty());
        assert_eq!(repo.items_for(2).await.unwrap().len(), 1);
    }
}
