use std::collections::HashMap;
use std::rc::Rc;

use super::nom_parser::{KeyDef, PropSource, TreeDef, TreeSource};
use crate::blackboard::{Blackboard, BlackboardKey};
use crate::error::LoadError;
use crate::node::Node;
use crate::nodes::{SubTree, SubTreeDecorator};
use crate::registry::{Props, Registry};
use crate::symbol::Symbol;
use crate::tree::Tree;
use crate::PropValue;

/// Instantiates every tree in the parsed source, returning them by name.
///
/// Node types resolve against `registry` first; an unregistered name falls
/// back to another `tree` definition in the same source and becomes a
/// [`SubTree`] leaf. `SubTreeDecorator` is special-cased because it
/// references its subtree through a `tree <- "name"` property while keeping
/// an own child.
pub fn load(
    tree_source: &TreeSource,
    registry: &Registry,
) -> Result<HashMap<String, Rc<Tree>>, LoadError> {
    if tree_source.tree_defs.is_empty() {
        return Err(LoadError::MissingTree);
    }
    for (i, def) in tree_source.tree_defs.iter().enumerate() {
        if tree_source.tree_defs[..i].iter().any(|d| d.name == def.name) {
            return Err(LoadError::DuplicateTree(def.name.to_string()));
        }
    }

    let mut loader = Loader {
        tree_source,
        registry,
        trees: HashMap::new(),
    };
    for def in &tree_source.tree_defs {
        loader.get_or_build(def.name, None)?;
    }
    Ok(loader.trees)
}

/// A mechanism to detect infinite recursion. It is a linked list in call
/// stack: traverse the parent links to enumerate the currently-open tree
/// names and check if the tree about to be entered is already among them.
///
/// Recursive subtrees would require lazy instantiation (the node graph of a
/// self-referencing tree is infinite), so they are a load error. Without
/// this check they would be a stack overflow instead.
struct TreeStack<'a, 'src> {
    name: &'src str,
    parent: Option<&'a TreeStack<'a, 'src>>,
}

impl<'a, 'src> TreeStack<'a, 'src> {
    fn find(&self, name: &str) -> bool {
        if self.name == name {
            true
        } else if let Some(parent) = self.parent {
            parent.find(name)
        } else {
            false
        }
    }
}

struct Loader<'a, 'src> {
    tree_source: &'a TreeSource<'src>,
    registry: &'a Registry,
    trees: HashMap<String, Rc<Tree>>,
}

impl<'a, 'src> Loader<'a, 'src> {
    fn get_or_build(
        &mut self,
        name: &str,
        parent_stack: Option<&TreeStack>,
    ) -> Result<Rc<Tree>, LoadError> {
        if let Some(tree) = self.trees.get(name) {
            return Ok(tree.clone());
        }

        let def = self
            .tree_source
            .tree_defs
            .iter()
            .find(|tree| tree.name == name)
            .ok_or_else(|| LoadError::MissingNode(name.to_string()))?;

        if parent_stack.is_some_and(|stack| stack.find(name)) {
            return Err(LoadError::InfiniteRecursion {
                tree: name.to_string(),
            });
        }
        let tree_stack = TreeStack {
            name: def.name,
            parent: parent_stack,
        };

        // Key declarations may appear anywhere under the tree's root, but
        // they all land on the tree-wide blackboard, collected up front so
        // properties can reference keys declared later in the source.
        let mut blackboard = Blackboard::new();
        collect_keys(&def.root, def.name, &mut blackboard)?;

        let root_child = self.build_node(&def.root, &blackboard, &tree_stack)?;

        let mut tree = Tree::new(def.name);
        *tree.blackboard_mut() = blackboard;
        tree.set_root_child(root_child)
            .map_err(|e| LoadError::AddChildError(e, "Root".to_string()))?;

        let tree = Rc::new(tree);
        self.trees.insert(def.name.to_string(), tree.clone());
        Ok(tree)
    }

    fn build_node(
        &mut self,
        def: &TreeDef,
        blackboard: &Blackboard,
        stack: &TreeStack,
    ) -> Result<Node, LoadError> {
        let map: HashMap<Symbol, PropValue> = def
            .props
            .iter()
            .map(|prop| {
                let value = match &prop.value {
                    PropSource::Literal(s) => PropValue::Literal(s.clone()),
                    PropSource::KeyRef(name) => PropValue::KeyRef((*name).into()),
                };
                (prop.name.into(), value)
            })
            .collect();
        let props = Props {
            map: &map,
            blackboard,
            node_type: def.ty,
        };

        let mut node = if def.ty == "SubTreeDecorator" {
            let tree_name = props.required::<String>("tree")?;
            let subtree = self.get_or_build(&tree_name, Some(stack))?;
            Node::new(SubTreeDecorator::new(subtree)).with_title(def.ty)
        } else if let Some(behavior) = self.registry.build(def.ty, &props) {
            Node::from_box(behavior?).with_title(def.ty)
        } else {
            let subtree = self.get_or_build(def.ty, Some(stack))?;
            Node::new(SubTree::new(subtree)).with_title(def.ty)
        };

        for child_def in &def.children {
            let child = self.build_node(child_def, blackboard, stack)?;
            node.add_child(child)
                .map_err(|e| LoadError::AddChildError(e, def.ty.to_string()))?;
        }

        Ok(node)
    }
}

fn collect_keys(def: &TreeDef, tree: &str, blackboard: &mut Blackboard) -> Result<(), LoadError> {
    for key in &def.keys {
        declare_key(key, tree, blackboard)?;
    }
    for child in &def.children {
        collect_keys(child, tree, blackboard)?;
    }
    Ok(())
}

fn declare_key(key: &KeyDef, tree: &str, blackboard: &mut Blackboard) -> Result<(), LoadError> {
    if blackboard.find(key.name).is_some() {
        return Err(LoadError::DuplicateKey {
            tree: tree.to_string(),
            key: key.name.to_string(),
        });
    }
    let err_init = || LoadError::BadKeyInit {
        key: key.name.to_string(),
        value: key.init.clone(),
    };
    let entry = match key.ty {
        "bool" => BlackboardKey::new_parseable(
            key.name,
            key.init.parse::<bool>().map_err(|_| err_init())?,
        ),
        "int" => BlackboardKey::new_parseable(
            key.name,
            key.init.parse::<i64>().map_err(|_| err_init())?,
        ),
        "float" => BlackboardKey::new_parseable(
            key.name,
            key.init.parse::<f32>().map_err(|_| err_init())?,
        ),
        "string" => BlackboardKey::new_parseable(key.name, key.init.clone()),
        _ => {
            return Err(LoadError::BadKeyType {
                key: key.name.to_string(),
                ty: key.ty.to_string(),
            })
        }
    };
    blackboard.add_key(entry);
    Ok(())
}
