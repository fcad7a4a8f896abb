use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub in_stock: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateWidgetRequest {
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub in_stock: bool,
}
