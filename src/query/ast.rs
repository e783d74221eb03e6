/// Node kinds of the logical predicate tree handed down by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    // logical connectives
    And,
    Or,
    AndNot,
    Not,
    // comparisons
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEquals,
    LessThan,
    LessThanEquals,
    EqualsToNull,
    Like,
    // full-text operators
    Contains,
    FreeText,
    WordList,
    Word,
    Pattern,
    Within,
    Head,
    Tail,
    ExactWord,
    SimpleWord,
    StringMode,
    WordHead,
    WordTail,
    Weight,
    Synonym,
    ExpandSynonym,
    // leaves
    Field,
    ConstantValue,
    Variable,
    List,
    // options
    Expand,
    Calculator,
    Combiner,
    AverageLength,
    Df,
    Extractor,
    ScoreFunction,
    ClusteredLimit,
    ScoreCombiner,
    ClusteredCombiner,
    Language,
    ScaleParameter,
    WordLimit,
    Category,
    Scale,
    Upper,
    Lower,
    Symmetric,
    Limit,
    SortKey,
    OrderBy,
    GroupBy,
    All,
    Escape,
}

/// Typed literal carried by a value node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    None,
    Null,
    Int(i64),
    Double(f64),
    /// String literal; `no_pad` carries the collation of the comparison
    Str { text: String, no_pad: bool },
}

impl NodeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, NodeValue::Null)
    }
}

/// One node of the read-only predicate tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub node_type: NodeType,
    pub value: String,
    pub data: NodeValue,
    pub operands: Vec<TreeNode>,
    pub options: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(node_type: NodeType) -> TreeNode {
        TreeNode {
            node_type,
            value: String::new(),
            data: NodeValue::None,
            operands: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_value(node_type: NodeType, value: impl Into<String>) -> TreeNode {
        let value = value.into();
        TreeNode {
            node_type,
            value,
            data: NodeValue::None,
            operands: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn field(number: i32) -> TreeNode {
        let mut n = TreeNode::with_value(NodeType::Field, number.to_string());
        n.data = NodeValue::Int(number as i64);
        n
    }

    pub fn constant(text: impl Into<String>) -> TreeNode {
        let text = text.into();
        let mut n = TreeNode::with_value(NodeType::ConstantValue, text.clone());
        n.data = NodeValue::Str { text, no_pad: false };
        n
    }

    pub fn constant_no_pad(text: impl Into<String>) -> TreeNode {
        let text = text.into();
        let mut n = TreeNode::with_value(NodeType::ConstantValue, text.clone());
        n.data = NodeValue::Str { text, no_pad: true };
        n
    }

    pub fn null() -> TreeNode {
        let mut n = TreeNode::new(NodeType::ConstantValue);
        n.data = NodeValue::Null;
        n
    }

    pub fn int(value: i64) -> TreeNode {
        let mut n = TreeNode::with_value(NodeType::ConstantValue, value.to_string());
        n.data = NodeValue::Int(value);
        n
    }

    pub fn double(value: f64) -> TreeNode {
        let mut n = TreeNode::with_value(NodeType::ConstantValue, value.to_string());
        n.data = NodeValue::Double(value);
        n
    }

    pub fn pattern(text: impl Into<String>) -> TreeNode {
        TreeNode::new(NodeType::Pattern).operand(TreeNode::constant(text))
    }

    pub fn operand(mut self, node: TreeNode) -> TreeNode {
        self.operands.push(node);
        self
    }

    pub fn option(mut self, node: TreeNode) -> TreeNode {
        self.options.push(node);
        self
    }

    /// Integer interpretation of the node's value
    pub fn as_int(&self) -> Option<i64> {
        match &self.data {
            NodeValue::Int(v) => Some(*v),
            NodeValue::Double(v) => Some(*v as i64),
            _ => self.value.parse().ok(),
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match &self.data {
            NodeValue::Double(v) => Some(*v),
            NodeValue::Int(v) => Some(*v as f64),
            _ => self.value.parse().ok(),
        }
    }
}
