//! YAML variant of the tree-asset format.
//!
//! ```yaml
//! trees:
//!   main:
//!     keys:
//!       patience: { type: float, value: "2.5" }
//!     root:
//!       type: Sequencer
//!       children:
//!         - type: Timeout
//!           properties: { duration: $patience }
//!           children:
//!             - type: Patrol
//! ```
//!
//! Property values prefixed with `$` are blackboard key references; `$$`
//! escapes a literal leading dollar. Deserialization feeds the same loader as
//! the text format.

use super::loader::load;
use super::nom_parser::{KeyDef, PropDef, PropSource, TreeDef, TreeRootDef, TreeSource};
use crate::error::LoadYamlError;
use crate::registry::Registry;
use crate::tree::Tree;
use serde::Deserialize;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Deserialize)]
struct TreeFile {
    trees: HashMap<String, TreeDoc>,
}

#[derive(Deserialize)]
struct TreeDoc {
    #[serde(default)]
    keys: HashMap<String, KeyDoc>,
    root: NodeDoc,
}

#[derive(Deserialize)]
struct KeyDoc {
    #[serde(rename = "type")]
    ty: String,
    value: String,
}

#[derive(Deserialize)]
struct NodeDoc {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    properties: HashMap<String, String>,
    #[serde(default)]
    children: Vec<NodeDoc>,
}

fn doc_to_def(doc: &NodeDoc) -> TreeDef {
    let props = doc
        .properties
        .iter()
        .map(|(name, value)| {
            let value = match value.strip_prefix('$') {
                Some(rest) if !rest.starts_with('$') => PropSource::KeyRef(rest),
                Some(rest) => PropSource::Literal(rest.to_string()),
                None => PropSource::Literal(value.clone()),
            };
            PropDef {
                name: name.as_str(),
                value,
            }
        })
        .collect();
    TreeDef {
        ty: &doc.ty,
        props,
        children: doc.children.iter().map(doc_to_def).collect(),
        keys: vec![],
    }
}

pub fn load_yaml(
    yaml: &str,
    registry: &Registry,
) -> Result<HashMap<String, Rc<Tree>>, LoadYamlError> {
    let file: TreeFile = serde_yaml::from_str(yaml)?;
    if file.trees.is_empty() {
        return Err(LoadYamlError::Missing);
    }

    let tree_defs = file
        .trees
        .iter()
        .map(|(name, doc)| {
            let mut root = doc_to_def(&doc.root);
            root.keys = doc
                .keys
                .iter()
                .map(|(name, key)| KeyDef {
                    name: name.as_str(),
                    ty: &key.ty,
                    init: key.value.clone(),
                })
                .collect();
            TreeRootDef {
                name: name.as_str(),
                root,
            }
        })
        .collect();

    let source = TreeSource { tree_defs };
    Ok(load(&source, registry)?)
}
