// Copyright 2025 Cowboy AI, LLC.

//! Role contracts

use super::implementation::Implementation;
use super::signature::MethodSignature;

/// A method declared by a role, with an optional default body
#[derive(Debug, Clone)]
pub struct RoleMethod {
    /// Declared signature
    pub signature: MethodSignature,
    /// Body used when no behaviour answers (the `This` candidate)
    pub default_body: Option<Implementation>,
}

/// A named contract: a set of method signatures plus parent roles
#[derive(Debug, Clone)]
pub struct RoleDescriptor {
    /// Unique role name, also registered as an object type
    pub name: String,
    /// Stable external identifier
    pub external_id: Option<String>,
    /// Roles this role extends
    pub parents: Vec<String>,
    /// Declared methods
    pub methods: Vec<RoleMethod>,
}

impl RoleDescriptor {
    /// Start building a role
    pub fn builder(name: impl Into<String>) -> RoleBuilder {
        RoleBuilder {
            role: RoleDescriptor {
                name: name.into(),
                external_id: None,
                parents: Vec::new(),
                methods: Vec::new(),
            },
        }
    }
}

/// Builder for [`RoleDescriptor`]
pub struct RoleBuilder {
    role: RoleDescriptor,
}

impl RoleBuilder {
    /// Set the external identifier
    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.role.external_id = Some(id.into());
        self
    }

    /// Extend a parent role
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.role.parents.push(parent.into());
        self
    }

    /// Declare a method without a body
    pub fn method(mut self, signature: MethodSignature) -> Self {
        self.role.methods.push(RoleMethod {
            signature,
            default_body: None,
        });
        self
    }

    /// Declare a method with a default body
    pub fn default_method(mut self, signature: MethodSignature, body: Implementation) -> Self {
        self.role.methods.push(RoleMethod {
            signature,
            default_body: Some(body),
        });
        self
    }

    /// Finish the role
    pub fn build(self) -> RoleDescriptor {
        self.role
    }
}
