use crate::widgets::model::{CreateWidgetRequest, Widget};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// In-memory widget storage. Titles are unique.
#[derive(Default)]
pub struct WidgetStore {
    widgets: DashMap<Uuid, Widget>,
    titles: DashMap<String, Uuid>,
}

impl WidgetStore {
    pub async fn insert(&self, req: CreateWidgetRequest) -> anyhow::Result<Widget> {
        // the title entry stays locked until the id is claimed
        let id = match self.titles.entry(req.title.clone()) {
            Entry::Occupied(_) => anyhow::bail!("a widget titled {:?} already exists", req.title),
            Entry::Vacant(slot) => *slot.insert(Uuid::new_v4()),
        };
        let widget = Widget {
            id,
            title: req.title,
            price: req.price,
            in_stock: req.in_stock,
        };
        self.widgets.insert(id, widget.clone());
        Ok(widget)
    }

    pub fn get(&self, id: &Uuid) -> Option<Widget> {
        self.widgets.get(id).map(|w| w.clone())
    }

    pub fn list(&self) -> Vec<Widget> {
        let mut widgets: Vec<Widget> = self.widgets.iter().map(|w| w.clone()).collect();
        widgets.sort_by(|a, b| a.title.cmp(&b.title));
        widgets
    }

    pub async fn remove(&self, id: &Uuid) -> Option<Widget> {
        let (_, widget) = self.widgets.remove(id)?;
        self.titles.remove(&widget.title);
        Some(widget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request(title: &str) -> CreateWidgetRequest {
        CreateWidgetRequest {
            title: title.to_string(),
            price: 9.5,
            in_stock: true,
        }
    }

    #[tokio::test]
    async fn test_concurrent_inserts_with_same_title() {
        let store = Arc::new(WidgetStore::default());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(request("gear")).await.is_ok() })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_frees_the_title() {
        let store = WidgetStore::default();
        let widget = store.insert(request("gear")).await.unwrap();
        assert!(store.insert(request("gear")).await.is_err());
        store.remove(&widget.id).await.unwrap();
        assert!(store.insert(request("gear")).await.is_ok());
    }
}
