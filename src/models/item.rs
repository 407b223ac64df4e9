use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The auction item a checkout session is paying for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JewelryItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

impl JewelryItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
        }
    }
}
