use std::sync::Arc;

use axum::{Router, routing::get};
use opbind_sdk::prelude::*;
use opbind_server::{ApiMethod, ApiRouter};

use crate::{
    api_access::{
        AddApiAccess, ApiAccessHandlers, ApiAccessResource, EditApiAccess, GetApiAccessForEditing,
    },
    attributes::{
        AddAttribute, AttributeHandlers, AttributeListResource, AttributeResource,
        DeleteAttribute, DeletedAttributeResource, EditAttribute, GetAttributeForEditing,
        GetAttributeList,
    },
    converters::IdListConverter,
    store::Store,
};

/// Built-in converters followed by the application's own.
pub fn converters() -> ConverterRegistry {
    ConverterRegistry::with_defaults().with(IdListConverter)
}

pub fn bus(store: Arc<Store>) -> OperationBus {
    let attributes = AttributeHandlers::new(store.clone());
    let api_accesses = ApiAccessHandlers::new(store);

    OperationBus::new()
        .with::<GetAttributeForEditing, _>(attributes.clone())
        .with::<GetAttributeList, _>(attributes.clone())
        .with::<AddAttribute, _>(attributes.clone())
        .with::<EditAttribute, _>(attributes.clone())
        .with::<DeleteAttribute, _>(attributes)
        .with::<GetApiAccessForEditing, _>(api_accesses.clone())
        .with::<AddApiAccess, _>(api_accesses.clone())
        .with::<EditApiAccess, _>(api_accesses)
}

/// Routes of the admin API.
///
/// Attribute deletion goes through `DELETE`, which the catalog does not
/// count as a command route.
pub fn api(store: Arc<Store>) -> ApiRouter {
    let provider = OperationProvider::new(Arc::new(converters()), Arc::new(bus(store)));

    ApiRouter::new(provider)
        .query::<GetAttributeForEditing, AttributeResource>("/attributes/{attributeId}")
        .route_for::<EditAttribute, AttributeResource>(
            ApiMethod::Patch,
            "/attributes/{attributeId}",
        )
        .route_for::<DeleteAttribute, DeletedAttributeResource>(
            ApiMethod::Delete,
            "/attributes/{attributeId}",
        )
        .query::<GetAttributeList, AttributeListResource>(
            "/attribute-groups/{attributeGroupId}/attributes",
        )
        .command::<AddAttribute, AttributeResource>(
            "/attribute-groups/{attributeGroupId}/attributes",
        )
        .query::<GetApiAccessForEditing, ApiAccessResource>("/api-accesses/{apiAccessId}")
        .command::<AddApiAccess, ApiAccessResource>("/api-accesses")
        .route_for::<EditApiAccess, ApiAccessResource>(
            ApiMethod::Patch,
            "/api-accesses/{apiAccessId}",
        )
}

/// Adds the health check to the admin API.
pub fn with_health(api: ApiRouter) -> ApiRouter {
    api.merge(Router::new().route(
        "/health",
        get(|| async { r#"{"status":"healthy","version":"0.1.0"}"# }),
    ))
}
