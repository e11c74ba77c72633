//! # Definition Loader
//!
//! Turns a user supplied definition file into a [`DefinitionTree`]: the packages, services and
//! operations the interactive session can offer.
//!
//! Two kinds of definition files are accepted:
//!
//! * `.proto` sources, compiled in-process with `protox`. Imports are resolved against the
//!   search root and included in the result.
//! * Binary `FileDescriptorSet`s (`.bin`, `.pb`, `.desc`, `.protoset`), as produced by
//!   `protoc --descriptor_set_out` or `tonic-prost-build`.
//!
//! Whatever the source, the resulting `DescriptorPool` goes through a single normalisation pass
//! ([`DefinitionTree::from_pool`]) that tags every node as a sub-package, a service or a plain
//! type, so later stages never have to guess the shape of a node.
use prost::Message;
use prost_reflect::{DescriptorError, DescriptorPool, MethodDescriptor, ServiceDescriptor};
use prost_types::FileDescriptorSet;
use std::path::{Path, PathBuf};

const DESCRIPTOR_SET_EXTENSIONS: &[&str] = &["bin", "pb", "desc", "protoset"];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Search root '{}' is not a directory", .0.display())]
    InvalidSearchRoot(PathBuf),
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to compile '{}': {source}", path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: protox::Error,
    },
    #[error("Failed to decode descriptor set '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: prost::DecodeError,
    },
    #[error("Invalid descriptor set: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// Loads the definition at `definition`, resolving it (and its imports) against `search_root`.
///
/// A relative `definition` is relative to `search_root`.
pub fn load(definition: &Path, search_root: &Path) -> Result<DefinitionTree, LoadError> {
    if !search_root.is_dir() {
        return Err(LoadError::InvalidSearchRoot(search_root.to_path_buf()));
    }

    let pool = if is_descriptor_set(definition) {
        read_descriptor_set(&search_root.join(definition))?
    } else {
        compile(definition, search_root)?
    };

    tracing::debug!(
        definition = %definition.display(),
        files = pool.files().count(),
        services = pool.services().count(),
        "loaded definition"
    );

    Ok(DefinitionTree::from_pool(&pool))
}

fn is_descriptor_set(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DESCRIPTOR_SET_EXTENSIONS.contains(&ext))
}

fn compile(definition: &Path, search_root: &Path) -> Result<DescriptorPool, LoadError> {
    let compile_error = |source| LoadError::Compile {
        path: definition.to_path_buf(),
        source,
    };

    let mut compiler = protox::Compiler::new([search_root]).map_err(compile_error)?;
    compiler.include_imports(true);
    compiler.open_file(definition).map_err(compile_error)?;

    pool_from_set(compiler.file_descriptor_set())
}

fn read_descriptor_set(path: &Path) -> Result<DescriptorPool, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let set = FileDescriptorSet::decode(bytes.as_slice()).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    pool_from_set(set)
}

fn pool_from_set(set: FileDescriptorSet) -> Result<DescriptorPool, LoadError> {
    Ok(DescriptorPool::from_file_descriptor_set(set)?)
}

/// The normalised content of a definition file.
///
/// The root is itself a [`Package`]: dotted package names (`acme.billing.v1`) become nested
/// packages, and definitions declared without a package sit directly at the root.
#[derive(Debug, Clone, Default)]
pub struct DefinitionTree {
    root: Package,
}

impl DefinitionTree {
    /// Normalises every file of `pool`, in pool order, into a tree.
    ///
    /// Within a file, services come first, then messages, then enums, each in declaration order.
    pub fn from_pool(pool: &DescriptorPool) -> Self {
        let mut root = Package::default();

        for file in pool.files() {
            let package = root.descend(file.package_name());

            for service in file.services() {
                let name = service.name().to_string();
                package.insert(name, Member::Service(ServiceDefinition::new(service)));
            }
            for message in file.messages() {
                let name = message.name().to_string();
                package.insert(name, Member::Message(message.full_name().to_string()));
            }
            for enum_desc in file.enums() {
                let name = enum_desc.name().to_string();
                package.insert(name, Member::Enum(enum_desc.full_name().to_string()));
            }
        }

        Self { root }
    }

    pub fn root(&self) -> &Package {
        &self.root
    }
}

/// An ordered, name-unique set of members.
#[derive(Debug, Clone, Default)]
pub struct Package {
    members: Vec<(String, Member)>,
}

impl Package {
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, member)| member)
    }

    /// Member names in display order.
    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members
            .iter()
            .map(|(name, member)| (name.as_str(), member))
    }

    /// Members that are services, skipping sub-packages and plain types.
    pub fn services(&self) -> impl Iterator<Item = (&str, &ServiceDefinition)> {
        self.members()
            .filter_map(|(name, member)| member.as_service().map(|service| (name, service)))
    }

    pub fn sub_packages(&self) -> impl Iterator<Item = (&str, &Package)> {
        self.members()
            .filter_map(|(name, member)| member.as_package().map(|package| (name, package)))
    }

    /// Whether this package, or any package nested in it, declares a service.
    pub fn has_services(&self) -> bool {
        self.services().next().is_some() || self.sub_packages().any(|(_, sub)| sub.has_services())
    }

    fn descend(&mut self, dotted: &str) -> &mut Package {
        let mut package = self;
        for segment in dotted.split('.').filter(|segment| !segment.is_empty()) {
            package = package.sub_package_mut(segment);
        }
        package
    }

    fn sub_package_mut(&mut self, name: &str) -> &mut Package {
        let position = self
            .members
            .iter()
            .position(|(member, node)| member == name && matches!(node, Member::Package(_)));

        let index = match position {
            Some(index) => index,
            None => {
                self.members
                    .push((name.to_string(), Member::Package(Package::default())));
                self.members.len() - 1
            }
        };

        match &mut self.members[index].1 {
            Member::Package(package) => package,
            _ => unreachable!("index always points at a package"),
        }
    }

    fn insert(&mut self, name: String, member: Member) {
        if self.get(&name).is_none() {
            self.members.push((name, member));
        }
    }
}

/// A node of the definition tree.
#[derive(Debug, Clone)]
pub enum Member {
    /// A nested package, which may hold services.
    Package(Package),
    /// A service, from which a client can be constructed.
    Service(ServiceDefinition),
    /// A message type, identified by its fully-qualified name.
    Message(String),
    /// An enum type, identified by its fully-qualified name.
    Enum(String),
}

impl Member {
    /// Whether this node is a single definition rather than a mapping of further members.
    pub fn is_constructible(&self) -> bool {
        !matches!(self, Member::Package(_))
    }

    pub fn as_package(&self) -> Option<&Package> {
        match self {
            Member::Package(package) => Some(package),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceDefinition> {
        match self {
            Member::Service(service) => Some(service),
            _ => None,
        }
    }
}

/// A service found in the definition, with its operations in declaration order.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    descriptor: ServiceDescriptor,
    operations: Vec<OperationDefinition>,
}

impl ServiceDefinition {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        let operations = descriptor.methods().map(OperationDefinition::new).collect();
        Self {
            descriptor,
            operations,
        }
    }

    /// Fully-qualified name, e.g. `echo.EchoService`.
    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn operations(&self) -> &[OperationDefinition] {
        &self.operations
    }

    /// Finds an operation by its declared name (`GetUser`) or its display name (`getUser`).
    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations
            .iter()
            .find(|op| op.name == name)
            .or_else(|| self.operations.iter().find(|op| op.display_name() == name))
    }
}

/// A single RPC of a service.
#[derive(Debug, Clone)]
pub struct OperationDefinition {
    pub name: String,
    pub request_type: String,
    pub response_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    method: MethodDescriptor,
}

impl OperationDefinition {
    fn new(method: MethodDescriptor) -> Self {
        Self {
            name: method.name().to_string(),
            request_type: method.input().name().to_string(),
            response_type: method.output().name().to_string(),
            client_streaming: method.is_client_streaming(),
            server_streaming: method.is_server_streaming(),
            method,
        }
    }

    /// The name shown to users: the declared name with its first character lowercased.
    pub fn display_name(&self) -> String {
        lower_first(&self.name)
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
