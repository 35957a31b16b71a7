//! Assembling AsyncAPI documents from a finished context tree.
//!
//! Every entity under `parented` becomes one document. Entity leaves carry
//! the content (title, description, schema, ...) and are folded into the
//! matching document node by content type.

pub mod model;

use crate::tree::{Node, NodeId, Tree};
use gendoc_syntax::{Category, ContentType, GenDocBlock};
use model::*;
use serde_json::Value;

/// One assembled document and the service it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDocument {
    pub service_id: String,
    pub document: AsyncApiDocument,
}

pub fn assemble(tree: &Tree) -> Vec<ServiceDocument> {
    tree.children(tree.parented())
        .iter()
        .filter_map(|&service| assemble_service(tree, service))
        .collect()
}

fn assemble_service(tree: &Tree, service: NodeId) -> Option<ServiceDocument> {
    let entity = tree.node(service).block.as_ref()?;
    let annotation = &entity.annotation;

    let mut doc = AsyncApiDocument {
        asyncapi: ASYNCAPI_VERSION.to_string(),
        id: annotation.service_urn.clone(),
        info: Info {
            title: annotation.id.clone(),
            version: DEFAULT_INFO_VERSION.to_string(),
            description: None,
        },
        default_content_type: Some(DEFAULT_CONTENT_TYPE.to_string()),
        channels: Default::default(),
        tags: vec![
            Tag {
                name: "repoUrl".to_string(),
                description: annotation.service_repo_url.clone(),
            },
            Tag {
                name: "repoLang".to_string(),
                description: annotation.service_repo_lang.clone(),
            },
        ],
    };

    let (leaves, channels) = tree.partition_children(service);
    for block in blocks(&leaves) {
        match block.annotation.content_type {
            Some(ContentType::Description) => doc.info.description = Some(block.value.clone()),
            Some(ContentType::Title) => doc.info.title = block.value.clone(),
            _ => {}
        }
    }

    for channel in channels {
        let node = tree.node(channel);
        doc.channels
            .insert(node.key.id.clone(), assemble_channel(tree, channel));
    }

    Some(ServiceDocument {
        service_id: annotation.id.clone(),
        document: doc,
    })
}

fn assemble_channel(tree: &Tree, channel: NodeId) -> Channel {
    let (leaves, operations) = tree.partition_children(channel);
    let mut out = Channel::default();
    for block in blocks(&leaves) {
        if block.annotation.content_type == Some(ContentType::Description) {
            out.description = Some(block.value.clone());
        }
    }

    for op in operations {
        let node = tree.node(op);
        let operation = assemble_operation(tree, op);
        match node.block.as_ref().and_then(|b| b.annotation.category) {
            Some(Category::PubOperation) => out.publish = Some(operation),
            Some(Category::SubOperation) => out.subscribe = Some(operation),
            _ => {}
        }
    }
    out
}

fn assemble_operation(tree: &Tree, op: NodeId) -> Operation {
    let (leaves, messages) = tree.partition_children(op);
    let mut out = Operation {
        operation_id: tree.node(op).key.id.clone(),
        ..Operation::default()
    };
    for block in blocks(&leaves) {
        match block.annotation.content_type {
            Some(ContentType::Summary) => out.summary = Some(block.value.clone()),
            Some(ContentType::Description) => out.description = Some(block.value.clone()),
            _ => {}
        }
    }

    // one message per operation: later message entities fold into the first
    if let Some(&first) = messages.first() {
        let message_id = tree.node(first).key.id.clone();
        let mut message = Message {
            message_id: message_id.clone(),
            name: message_id,
            ..Message::default()
        };
        for &msg in &messages {
            let (leaves, _) = tree.partition_children(msg);
            for block in blocks(&leaves) {
                fold_message_leaf(&mut message, block);
            }
        }
        out.message = Some(message);
    }
    out
}

fn fold_message_leaf(message: &mut Message, block: &GenDocBlock) {
    let Some(content_type) = block.annotation.content_type else {
        return;
    };
    match content_type {
        ContentType::Summary => message.summary = Some(block.value.clone()),
        ContentType::Description => message.description = Some(block.value.clone()),
        ContentType::Title => message.title = Some(block.value.clone()),
        ContentType::JsonSchema => message.payload = Some(payload(&block.value)),
        ContentType::Example => message.examples.push(Example {
            name: message.message_id.clone(),
            summary: example_summary(block),
            payload: Some(payload(&block.value)),
        }),
        ContentType::NameId => {}
    }
}

/// `{"file":"<file>[<begin line>-<end line>]","path":"<path>"}`
fn example_summary(block: &GenDocBlock) -> String {
    let source = &block.begin_token.source;
    let file = format!(
        "{}[{}-{}]",
        source.file, block.begin_token.line, block.end_token.line
    );
    serde_json::json!({ "file": file, "path": source.path }).to_string()
}

/// Structured JSON objects and arrays are embedded as such, anything else as
/// a plain string.
fn payload(value: &str) -> Value {
    match serde_json::from_str::<Value>(value) {
        Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
        _ => Value::String(value.to_string()),
    }
}

fn blocks<'a>(leaves: &'a [&'a Node]) -> impl Iterator<Item = &'a GenDocBlock> + 'a {
    leaves.iter().filter_map(|leaf| leaf.block.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree;
    use gendoc_syntax::{parse_source, Config};
    use serde_json::json;

    fn documents(input: &str) -> Vec<ServiceDocument> {
        let config = Config {
            service_id: "orders-svc".to_string(),
            service_repo_url: "https://git.example/orders".to_string(),
            service_repo_lang: "C#".to_string(),
            business_domain: "shop".to_string(),
            bounded_domain: "checkout".to_string(),
        };
        let (mut blocks, errors) = parse_source(input, "Order.cs", "src/Order.cs", &config, &[]);
        assert!(errors.is_empty(), "{errors:?}");
        blocks.sort_by_key(|b| b.precedence);
        assemble(&tree::build(&blocks))
    }

    const SOURCE: &str = r#"
//+gendoc category=info type=title
Orders
//-gendoc
//+gendoc category=info type=description
Handles orders.
//-gendoc
//+gendoc category=channel type=description id=orders-topic
All order events.
//-gendoc
//+gendoc category=pubOperation type=summary id=OrderCreated channelId=orders-topic
Publish order created.
//-gendoc
//+gendoc category=message type=description id=OrderCreated
An order was created.
//-gendoc
//+gendoc category=message type=json_schema id=OrderCreated
{"type": "object"}
//-gendoc
//+gendoc category=message type=example id=OrderCreated
{"orderId": 1}
//-gendoc
"#;

    #[test]
    fn assembles_full_service_document() {
        let docs = documents(SOURCE);
        assert_eq!(docs.len(), 1);
        let ServiceDocument { service_id, document } = &docs[0];
        assert_eq!(service_id, "orders-svc");
        assert_eq!(document.asyncapi, "2.6.0");
        assert_eq!(document.id, "urn:shop:checkout:orders-svc");
        assert_eq!(document.default_content_type.as_deref(), Some("application/json"));
        assert_eq!(document.info.title, "Orders");
        assert_eq!(document.info.description.as_deref(), Some("Handles orders."));
        assert_eq!(document.tags[0].name, "repoUrl");
        assert_eq!(document.tags[0].description, "https://git.example/orders");
        assert_eq!(document.tags[1].description, "C#");

        let channel = &document.channels["orders-topic"];
        assert_eq!(channel.description.as_deref(), Some("All order events."));
        assert!(channel.subscribe.is_none());
        let publish = channel.publish.as_ref().unwrap();
        assert_eq!(publish.operation_id, "OrderCreated");
        assert_eq!(publish.summary.as_deref(), Some("Publish order created."));

        let message = publish.message.as_ref().unwrap();
        assert_eq!(message.message_id, "OrderCreated");
        assert_eq!(message.name, "OrderCreated");
        assert_eq!(message.description.as_deref(), Some("An order was created."));
        assert_eq!(message.payload, Some(json!({"type": "object"})));
        assert_eq!(message.examples.len(), 1);
        assert_eq!(message.examples[0].payload, Some(json!({"orderId": 1})));
        assert_eq!(
            message.examples[0].summary,
            r#"{"file":"Order.cs[20-22]","path":"src/Order.cs"}"#
        );
    }

    #[test]
    fn title_defaults_to_service_id() {
        let docs = documents("//+gendoc category=info type=description\nd\n//-gendoc\n");
        assert_eq!(docs[0].document.info.title, "orders-svc");
    }

    #[test]
    fn channel_without_operations_keeps_known_fields() {
        let docs = documents(
            "//+gendoc category=info type=title\nT\n//-gendoc
//+gendoc category=channel type=description id=quiet\nNothing here.\n//-gendoc\n",
        );
        let channel = &docs[0].document.channels["quiet"];
        assert_eq!(channel.description.as_deref(), Some("Nothing here."));
        assert!(channel.publish.is_none() && channel.subscribe.is_none());
    }

    #[test]
    fn operation_without_message() {
        let docs = documents(
            "//+gendoc category=info type=title\nT\n//-gendoc
//+gendoc category=channel type=description id=ch\nc\n//-gendoc
//+gendoc category=subOperation type=description id=consume channelId=ch\nReads.\n//-gendoc\n",
        );
        let sub = docs[0].document.channels["ch"].subscribe.as_ref().unwrap();
        assert_eq!(sub.description.as_deref(), Some("Reads."));
        assert!(sub.message.is_none());
    }

    #[test]
    fn example_summary_escapes_paths() {
        let config = Config {
            service_id: "svc".to_string(),
            ..Config::default()
        };
        let (blocks, errors) = parse_source(
            "//+gendoc category=message type=example id=m\n{}\n//-gendoc\n",
            "say \"hi\".cs",
            r"C:\src\say.cs",
            &config,
            &[],
        );
        assert!(errors.is_empty(), "{errors:?}");
        let summary: Value = serde_json::from_str(&example_summary(&blocks[0])).unwrap();
        assert_eq!(summary["file"], "say \"hi\".cs[1-3]");
        assert_eq!(summary["path"], r"C:\src\say.cs");
    }

    #[test]
    fn non_json_payload_is_kept_as_text() {
        assert_eq!(payload("not json"), Value::String("not json".to_string()));
        assert_eq!(payload("42"), Value::String("42".to_string()));
        assert_eq!(payload("[1]"), json!([1]));
    }

    #[test]
    fn serializes_with_asyncapi_field_names() {
        let docs = documents(SOURCE);
        let json = serde_json::to_value(&docs[0].document).unwrap();
        assert_eq!(json["defaultContentType"], "application/json");
        let publish = &json["channels"]["orders-topic"]["publish"];
        assert_eq!(publish["operationId"], "OrderCreated");
        assert_eq!(publish["message"]["messageId"], "OrderCreated");
        assert!(json["channels"]["orders-topic"].get("subscribe").is_none());
    }

    #[test]
    fn one_document_per_service() {
        let docs = documents(
            "//+gendoc category=info type=title id=a\nA\n//-gendoc
//+gendoc category=server type=description id=b\nB\n//-gendoc\n",
        );
        let ids: Vec<_> = docs.iter().map(|d| d.service_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
