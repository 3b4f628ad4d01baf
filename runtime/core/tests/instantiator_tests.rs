// Copyright (c) 2026 Weft Contributors
// SPDX-License-Identifier: Apache-2.0
//! Property initialization during instantiation.

use serde_json::json;
use weft_core::application::instantiator::{
    AssemblyError, CompositeInstantiator, InstantiationContext, InstantiationError,
};
use weft_core::domain::definition::{ComponentBuilder, CompositeBuilder, PropertyValue};
use weft_core::domain::logical::LogicalComposite;
use weft_core::domain::uri::{QName, Uri};

#[test]
fn sourced_properties_resolve_against_the_composite_document() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .properties(json!({"db": {"url": "postgres://db"}}))
        .component(
            ComponentBuilder::leaf("store", "test")
                .property("url", PropertyValue::Source("/db/url".to_string()))
                .property("pool", PropertyValue::Inline(json!(8)))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let mut context = InstantiationContext::new();
    CompositeInstantiator::new()
        .instantiate(&composite, &Uri::new("domain"), &mut root, &mut context)
        .unwrap();
    assert!(!context.has_errors(), "{:?}", context.errors());

    let store = root.component(&Uri::new("domain/store")).unwrap();
    assert_eq!(store.properties["url"], json!("postgres://db"));
    assert_eq!(store.properties["pool"], json!(8));
}

#[test]
fn missing_property_source_is_a_collected_error() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .properties(json!({"db": {}}))
        .component(
            ComponentBuilder::leaf("store", "test")
                .property("url", PropertyValue::Source("/db/url".to_string()))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let mut context = InstantiationContext::new();
    CompositeInstantiator::new()
        .instantiate(&composite, &Uri::new("domain"), &mut root, &mut context)
        .unwrap();

    assert_eq!(
        context.errors(),
        &[AssemblyError::PropertySourceNotFound {
            component: Uri::new("domain/store"),
            name: "url".to_string(),
            pointer: "/db/url".to_string(),
        }]
    );
}

#[test]
fn malformed_property_pointer_fails_fast() {
    let composite = CompositeBuilder::new(QName::new("urn:test", "app"))
        .properties(json!({"db": {"url": "postgres://db"}}))
        .component(
            ComponentBuilder::leaf("store", "test")
                .property("url", PropertyValue::Source("db.url".to_string()))
                .build(),
        )
        .build();

    let mut root = LogicalComposite::new();
    let mut context = InstantiationContext::new();
    let error = CompositeInstantiator::new()
        .instantiate(&composite, &Uri::new("domain"), &mut root, &mut context)
        .unwrap_err();

    assert_eq!(
        error,
        InstantiationError::MalformedPropertySource {
            component: Uri::new("domain/store"),
            name: "url".to_string(),
            pointer: "db.url".to_string(),
        }
    );
}
