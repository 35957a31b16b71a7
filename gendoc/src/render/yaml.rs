//! YAML renderer, the default output format.

use crate::asyncapi::model::AsyncApiDocument;
use crate::render::Renderer;
use anyhow::{Context, Result};

pub struct YamlRenderer;

impl Renderer for YamlRenderer {
    fn render(&self, doc: &AsyncApiDocument) -> Result<String> {
        serde_yaml::to_string(doc).context("failed to serialize document as YAML")
    }

    fn file_extension(&self) -> &str {
        "yml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asyncapi::model::{Channel, Info, Message, Operation};
    use serde_json::json;

    fn document() -> AsyncApiDocument {
        let mut doc = AsyncApiDocument {
            asyncapi: "2.6.0".to_string(),
            id: "urn:shop:checkout:orders".to_string(),
            info: Info {
                title: "Orders".to_string(),
                version: "1.0.0".to_string(),
                description: Some("Handles orders.".to_string()),
            },
            default_content_type: Some("application/json".to_string()),
            ..AsyncApiDocument::default()
        };
        doc.channels.insert(
            "orders-topic".to_string(),
            Channel {
                publish: Some(Operation {
                    operation_id: "OrderCreated".to_string(),
                    message: Some(Message {
                        message_id: "OrderCreated".to_string(),
                        name: "OrderCreated".to_string(),
                        payload: Some(json!({"type": "object"})),
                        ..Message::default()
                    }),
                    ..Operation::default()
                }),
                ..Channel::default()
            },
        );
        doc
    }

    #[test]
    fn renders_asyncapi_keys() {
        let out = YamlRenderer.render(&document()).unwrap();
        assert!(out.starts_with("asyncapi: 2.6.0\n"));
        assert!(out.contains("defaultContentType: application/json"));
        assert!(out.contains("operationId: OrderCreated"));
        assert!(out.contains("messageId: OrderCreated"));
        assert!(!out.contains("subscribe"));
    }

    #[test]
    fn yaml_round_trips() {
        let doc = document();
        let out = YamlRenderer.render(&doc).unwrap();
        let back: AsyncApiDocument = serde_yaml::from_str(&out).unwrap();
        assert_eq!(back, doc);
    }
}
