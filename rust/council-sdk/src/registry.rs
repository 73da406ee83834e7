//! Backend resource descriptors.
//!
//! Every resource the query layer can read is described once by a
//! [`ResourceDescriptor`] and looked up by name at query time.

use crate::error::RegistryError;
use crate::mutation::Operation;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_SERVICE: &str = "api";
pub const DEFAULT_ID_PARAM: &str = "Id";

/// Endpoints of one backend resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub resource_name: String,
    pub list_path: String,
    pub detail_path: String,
    pub id_param_name: String,
    /// Whether create/update/delete endpoints exist.
    pub mutable: bool,
}

impl ResourceDescriptor {
    /// A read-only resource with `{list_path}/details?Id=` as its detail endpoint.
    pub fn new(resource_name: impl Into<String>, list_path: impl Into<String>) -> Self {
        let list_path = list_path.into();
        Self {
            resource_name: resource_name.into(),
            detail_path: format!("{}/details", list_path),
            list_path,
            id_param_name: DEFAULT_ID_PARAM.to_string(),
            mutable: false,
        }
    }

    /// `/{service}/{segment}` layout used by the dashboard backend.
    pub fn rest(resource_name: impl Into<String>, service: &str, segment: &str) -> Self {
        let service = service.trim_matches('/');
        Self::new(resource_name, format!("/{}/{}", service, segment))
    }

    pub fn with_detail_path(mut self, detail_path: impl Into<String>) -> Self {
        self.detail_path = detail_path.into();
        self
    }

    pub fn with_id_param(mut self, id_param_name: impl Into<String>) -> Self {
        self.id_param_name = id_param_name.into();
        self
    }

    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    pub fn mutation_path(&self, operation: Operation) -> String {
        format!("{}/{}", self.list_path, operation.path_suffix())
    }
}

/// Name-indexed set of resource descriptors.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<ResourceDescriptor>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources exposed by the committee administration backend.
    pub fn dashboard(service: &str) -> Self {
        let read_only = [
            ("rooms", "Rooms"),
            ("roles", "Roles"),
            ("permissions", "Permissions"),
            ("meetingTypes", "MeetingTypes"),
        ];
        let mutable = [
            ("departments", "Departments"),
            ("committees", "Committees"),
            ("councils", "Councils"),
            ("meetings", "Meetings"),
            ("tasks", "Tasks"),
            ("members", "Members"),
        ];

        let mut registry = Self::new();
        for (name, segment) in read_only {
            registry.replace(ResourceDescriptor::rest(name, service, segment));
        }
        for (name, segment) in mutable {
            registry.replace(ResourceDescriptor::rest(name, service, segment).mutable());
        }
        registry
    }

    /// Adds a descriptor. Names are registered once.
    pub fn register(&mut self, descriptor: ResourceDescriptor) -> Result<(), RegistryError> {
        if descriptor.resource_name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.resources.contains_key(&descriptor.resource_name) {
            return Err(RegistryError::Duplicate(descriptor.resource_name));
        }
        self.resources
            .insert(descriptor.resource_name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Adds or overrides a descriptor, returning the one it replaced.
    pub fn replace(&mut self, descriptor: ResourceDescriptor) -> Option<Arc<ResourceDescriptor>> {
        self.resources
            .insert(descriptor.resource_name.clone(), Arc::new(descriptor))
    }

    pub fn get(&self, resource_name: &str) -> Option<Arc<ResourceDescriptor>> {
        self.resources.get(resource_name).cloned()
    }

    pub fn contains(&self, resource_name: &str) -> bool {
        self.resources.contains_key(resource_name)
    }

    /// Registered descriptors sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<ResourceDescriptor>> {
        let mut all: Vec<_> = self.resources.values().cloned().collect();
        all.sort_by(|a, b| a.resource_name.cmp(&b.resource_name));
        all
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
