//! # Handler Tree — the Fingerprinter's Input Shape
//!
//! A minimal, polymorphic tree-walk representation of a single opcode
//! handler's body (or, with a `Block` root, the whole dispatch table).
//! It models exactly the constructs the feature extractor looks for and
//! nothing else — there is deliberately no general-purpose expression
//! grammar here. [`serde::Deserialize`] is derived so a real parser never
//! has to exist for this module to be exercised: tests and the CLI manifest
//! both supply trees as plain JSON.

use serde::Deserialize;

/// A literal value appearing in a handler body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

/// One node of a handler's structural tree. Tagged by `kind` in JSON so
/// fixtures read naturally, e.g. `{"kind": "call", "callee": ..., "args": []}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerNode {
    Block {
        body: Vec<HandlerNode>,
    },
    ExprStmt {
        expr: Box<HandlerNode>,
    },
    If {
        test: Box<HandlerNode>,
        consequent: Box<HandlerNode>,
        #[serde(default)]
        alternate: Option<Box<HandlerNode>>,
    },
    For {
        body: Box<HandlerNode>,
    },
    While {
        body: Box<HandlerNode>,
    },
    Try {
        block: Box<HandlerNode>,
        #[serde(default)]
        finalizer: Option<Box<HandlerNode>>,
    },
    Throw {
        argument: Box<HandlerNode>,
    },
    Debugger,
    Return {
        #[serde(default)]
        argument: Option<Box<HandlerNode>>,
    },
    VarDecl {
        name: String,
        #[serde(default)]
        init: Option<Box<HandlerNode>>,
    },
    Call {
        callee: Box<HandlerNode>,
        #[serde(default)]
        args: Vec<HandlerNode>,
    },
    New {
        callee: Box<HandlerNode>,
        #[serde(default)]
        args: Vec<HandlerNode>,
    },
    /// `object.property` (computed = false) or `object[property]` (computed
    /// = true). Nested computed member access (`a[b[c]]`) is just a
    /// `Member` whose `object` or `property` is itself a computed `Member`.
    Member {
        object: Box<HandlerNode>,
        property: Box<HandlerNode>,
        computed: bool,
    },
    Identifier {
        name: String,
    },
    Literal {
        value: LiteralValue,
    },
    Binary {
        operator: String,
        left: Box<HandlerNode>,
        right: Box<HandlerNode>,
    },
    Logical {
        operator: String,
        left: Box<HandlerNode>,
        right: Box<HandlerNode>,
    },
    Unary {
        operator: String,
        argument: Box<HandlerNode>,
    },
    Update {
        operator: String,
        prefix: bool,
        argument: Box<HandlerNode>,
    },
    Assign {
        operator: String,
        left: Box<HandlerNode>,
        right: Box<HandlerNode>,
    },
    ArrayLiteral {
        #[serde(default)]
        elements: Vec<HandlerNode>,
    },
    ObjectLiteral {
        #[serde(default)]
        properties: Vec<HandlerNode>,
    },
    Spread {
        argument: Box<HandlerNode>,
    },
    FunctionLiteral {
        body: Box<HandlerNode>,
    },
}

impl HandlerNode {
    /// `true` if this node is a call to an identifier with the given name,
    /// e.g. `is_call_to("push")` matches `push(x)`.
    pub fn is_call_to(&self, name: &str) -> bool {
        matches!(self, HandlerNode::Call { callee, .. } if matches!(callee.as_ref(), HandlerNode::Identifier { name: n } if n == name))
    }

    /// For a call node, the callee's identifier name, if any.
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            HandlerNode::Call { callee, .. } => match callee.as_ref() {
                HandlerNode::Identifier { name } => Some(name.as_str()),
                HandlerNode::Member { property, computed: false, .. } => match property.as_ref() {
                    HandlerNode::Identifier { name } => Some(name.as_str()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }

    /// Depth-first pre-order visit of every node in the subtree rooted here.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a HandlerNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    fn children(&self) -> Vec<&HandlerNode> {
        match self {
            HandlerNode::Block { body } => body.iter().collect(),
            HandlerNode::ExprStmt { expr } => vec![expr],
            HandlerNode::If {
                test,
                consequent,
                alternate,
            } => {
                let mut v = vec![test.as_ref(), consequent.as_ref()];
                if let Some(a) = alternate {
                    v.push(a);
                }
                v
            }
            HandlerNode::For { body } | HandlerNode::While { body } => vec![body],
            HandlerNode::Try { block, finalizer } => {
                let mut v = vec![block.as_ref()];
                if let Some(f) = finalizer {
                    v.push(f);
                }
                v
            }
            HandlerNode::Throw { argument } => vec![argument],
            HandlerNode::Debugger => vec![],
            HandlerNode::Return { argument } => argument.iter().map(|b| b.as_ref()).collect(),
            HandlerNode::VarDecl { init, .. } => init.iter().map(|b| b.as_ref()).collect(),
            HandlerNode::Call { callee, args } | HandlerNode::New { callee, args } => {
                let mut v = vec![callee.as_ref()];
                v.extend(args.iter());
                v
            }
            HandlerNode::Member { object, property, .. } => vec![object.as_ref(), property.as_ref()],
            HandlerNode::Identifier { .. } | HandlerNode::Literal { .. } => vec![],
            HandlerNode::Binary { left, right, .. } | HandlerNode::Logical { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
            HandlerNode::Unary { argument, .. }
            | HandlerNode::Update { argument, .. }
            | HandlerNode::Spread { argument } => vec![argument],
            HandlerNode::Assign { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            HandlerNode::ArrayLiteral { elements } => elements.iter().collect(),
            HandlerNode::ObjectLiteral { properties } => properties.iter().collect(),
            HandlerNode::FunctionLiteral { body } => vec![body],
        }
    }
}
