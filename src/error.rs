use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
#[non_exhaustive]
pub enum AddChildError {
    TooManyNodes,
}

impl Display for AddChildError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::TooManyNodes => write!(fmt, "Attempted to add too many child nodes"),
        }
    }
}

pub type AddChildResult = Result<(), AddChildError>;

impl std::error::Error for AddChildError {}

/// Errors produced while building trees from the text format.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadError {
    MissingTree,
    MissingNode(String),
    DuplicateTree(String),
    InfiniteRecursion { tree: String },
    AddChildError(AddChildError, String),
    BadProperty { node: String, prop: String, value: String },
    PropertyNotLiteral { node: String, prop: String },
    PropertyNotKeyRef { node: String, prop: String },
    MissingProperty { node: String, prop: String },
    MissingKey { node: String, key: String },
    DuplicateKey { tree: String, key: String },
    BadKeyType { key: String, ty: String },
    BadKeyInit { key: String, value: String },
}

impl Display for LoadError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::MissingTree => write!(fmt, "The source has no tree definitions"),
            Self::MissingNode(node) => {
                write!(fmt, "Node type or subtree name not found {:?}", node)
            }
            Self::DuplicateTree(tree) => {
                write!(fmt, "Tree {:?} is defined more than once", tree)
            }
            Self::InfiniteRecursion { tree } => {
                write!(fmt, "Subtree {:?} recursively references itself", tree)
            }
            Self::AddChildError(e, node) => {
                e.fmt(fmt)?;
                write!(fmt, " to {}", node)
            }
            Self::BadProperty { node, prop, value } => {
                write!(
                    fmt,
                    "Property {:?} of node {:?} cannot be parsed from {:?}",
                    prop, node, value
                )
            }
            Self::PropertyNotLiteral { node, prop } => {
                write!(
                    fmt,
                    "Property {:?} of node {:?} must be a literal, not a key reference",
                    prop, node
                )
            }
            Self::PropertyNotKeyRef { node, prop } => {
                write!(
                    fmt,
                    "Property {:?} of node {:?} must reference a blackboard key",
                    prop, node
                )
            }
            Self::MissingProperty { node, prop } => {
                write!(fmt, "Node {:?} requires a property {:?}", node, prop)
            }
            Self::MissingKey { node, key } => {
                write!(
                    fmt,
                    "Node {:?} references undeclared blackboard key {:?}",
                    node, key
                )
            }
            Self::DuplicateKey { tree, key } => {
                write!(
                    fmt,
                    "Blackboard key {:?} is declared twice in tree {:?}",
                    key, tree
                )
            }
            Self::BadKeyType { key, ty } => {
                write!(fmt, "Blackboard key {:?} has unknown type {:?}", key, ty)
            }
            Self::BadKeyInit { key, value } => {
                write!(
                    fmt,
                    "Initializer {:?} does not parse as the declared type of key {:?}",
                    value, key
                )
            }
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug)]
pub enum LoadYamlError {
    Yaml(serde_yaml::Error),
    Missing,
    Load(LoadError),
}

impl Display for LoadYamlError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Yaml(e) => e.fmt(fmt),
            Self::Missing => write!(fmt, "Missing"),
            Self::Load(e) => e.fmt(fmt),
        }
    }
}

impl std::error::Error for LoadYamlError {}

impl From<serde_yaml::Error> for LoadYamlError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}

impl From<LoadError> for LoadYamlError {
    fn from(err: LoadError) -> Self {
        Self::Load(err)
    }
}

/// Errors that make a tree template refuse to instantiate.
#[derive(Debug)]
#[non_exhaustive]
pub enum ValidateError {
    /// Following subtree references revisited a tree already on the reference
    /// stack. The path lists tree names from the template down to the repeat.
    SubtreeCycle { path: Vec<String> },
    /// A node's authoring-time validity hook complained. `node` is the title,
    /// or the guid when untitled.
    InvalidNode { node: String, message: String },
}

impl Display for ValidateError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::SubtreeCycle { path } => {
                write!(fmt, "Cyclic subtree composition: {}", path.join(" -> "))
            }
            Self::InvalidNode { node, message } => {
                write!(fmt, "Node {:?} failed validation: {}", node, message)
            }
        }
    }
}

impl std::error::Error for ValidateError {}
