//! You can also export AIGs and miters to the Graphviz dot format using their `to_dot` methods: [`Aig::to_dot`], [`Miter::to_dot`].
//!
//! The outputs of the adders of a box can be highlighted with [`AdderBox::to_dot`].
//!
//! ```rust
//! use acec::Aig;
//! use acec::miter::Miter;
//! use acec::dot::GraphvizStyle;
//!
//! let mut aig = Aig::with_inputs(2);
//! let a = aig.get_input(0).unwrap();
//! let b = aig.get_input(1).unwrap();
//! let sum = aig.new_xor(a, b).unwrap();
//! let carry = aig.new_and(a, b).unwrap();
//! aig.add_output(sum).unwrap();
//! aig.add_output(carry).unwrap();
//! println!("{}", aig.to_dot(GraphvizStyle::default()));
//!
//! // Creating a miter between two copies of the circuit
//! let miter = Miter::new(&aig, &aig).unwrap();
//! println!("{}", miter.to_dot(GraphvizStyle::default()));
//! ```
//!
//! You can then render the graphs using the DOT engine.

use std::{collections::HashSet, fmt::Display, ops::Add};

use crate::{Aig, AigEdge, AigNode, NodeId, acec::tree::AdderBox, dfs::Dfs, miter::Miter};

// Definining default global style.
const DEFAULT_RANKDIR: &str = "BT";
const DEFAULT_OUTPUT_PREFIX: &str = "o";
const DEFAULT_MITER_OUTPUT_PREFIX: &str = "z";

// Defining default style for nodes.
const DEFAULT_FALSE_NODE_FORMAT: &str = "[shape=point, label=\"GND\", width=1.5]";
const DEFAULT_INPUT_NODE_FORMAT: &str = "[shape=box]";
const DEFAULT_AND_NODE_FORMAT: &str = "[shape=circle]";
const DEFAULT_XOR_NODE_FORMAT: &str = "[shape=circle, label=\"⊕\"]";
const DEFAULT_HIGHLIGHT_NODE_FORMAT: &str = "[style=filled, fillcolor=\"lightblue\"]";
/// See https://stackoverflow.com/questions/50822798/how-to-use-graphviz-to-draw-a-node-pointed-by-an-arrow.
const DEFAULT_OUTPUT_NODE_FORMAT: &str = "[shape=none, height=.0, width=.0]";

// Defining default style for edges.
const DEFAULT_EDGE_ALL_FORMAT: &str = "[arrowsize=0.3]";
const DEFAULT_EDGE_COMPLEMENT_FORMAT: &str = "[headlabel=\"●\", labelangle=.0, labeldistance=1.5]";
const DEFAULT_EDGE_OUTPUT_FORMAT: &str = "[arrowhead=none]";

/// String containing the graphviz node style (you must manually include square brackets).
///
/// See [`GraphvizStyle`] for what kind of nodes can be described.
#[derive(Debug, Clone)]
pub struct GraphvizNodeStyle(String);

impl Display for GraphvizNodeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GraphvizNodeStyle {
    fn from(style: &str) -> Self {
        GraphvizNodeStyle(style.to_string())
    }
}

/// String containing the graphviz edge style (you must manually include square brackets).
///
/// See [`GraphvizStyle`] for what kind of edges can be described.
#[derive(Debug, Clone, Default)]
pub struct GraphvizEdgeStyle(String);

impl Display for GraphvizEdgeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GraphvizEdgeStyle {
    fn from(style: &str) -> Self {
        GraphvizEdgeStyle(style.to_string())
    }
}

impl Add for GraphvizEdgeStyle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        GraphvizEdgeStyle(format!("{}{}", self.0, rhs.0))
    }
}

/// Parameters for Graphviz rendering.
///
/// ### Global parameters
/// - `rankdir`
/// - `output_prefix`, the label of output `i` being the prefix followed by `i + 1`.
///
/// ### Nodes
/// The following nodes can be rendered using [`GraphvizNodeStyle`]:
/// - [`AigNode::False`]
/// - [`AigNode::Input`]
/// - [`AigNode::And`]
/// - [`AigNode::Xor`]
/// - output (by default, invisible node just to get an arrow)
/// - highlighted gates, whose style is appended to the one of their kind.
///
/// ### Edges
/// Edge styles are additive. All edges implement the `edge_all` style. To that can be added:
/// - `edge_complement` if the edge is complemented
/// - `edge_output` if the edge is directed to an output.
#[derive(Debug, Clone)]
pub struct GraphvizStyle {
    // Global
    pub rankdir: String,
    pub output_prefix: String,

    // Nodes
    pub cst_false: GraphvizNodeStyle,
    pub input: GraphvizNodeStyle,
    pub and: GraphvizNodeStyle,
    pub xor: GraphvizNodeStyle,
    pub output: GraphvizNodeStyle,
    pub highlight: GraphvizNodeStyle,

    // Edges
    pub edge_all: GraphvizEdgeStyle,
    pub edge_complement: GraphvizEdgeStyle,
    pub edge_output: GraphvizEdgeStyle,
}

impl Default for GraphvizStyle {
    fn default() -> Self {
        GraphvizStyle {
            rankdir: DEFAULT_RANKDIR.to_string(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),

            cst_false: DEFAULT_FALSE_NODE_FORMAT.into(),
            input: DEFAULT_INPUT_NODE_FORMAT.into(),
            and: DEFAULT_AND_NODE_FORMAT.into(),
            xor: DEFAULT_XOR_NODE_FORMAT.into(),
            output: DEFAULT_OUTPUT_NODE_FORMAT.into(),
            highlight: DEFAULT_HIGHLIGHT_NODE_FORMAT.into(),

            edge_all: DEFAULT_EDGE_ALL_FORMAT.into(),
            edge_complement: DEFAULT_EDGE_COMPLEMENT_FORMAT.into(),
            edge_output: DEFAULT_EDGE_OUTPUT_FORMAT.into(),
        }
    }
}

fn graphviz_id(aig: &Aig, id: NodeId) -> String {
    match aig.get_node(id) {
        Some(AigNode::Input(index)) => format!("i{}", index),
        _ => format!("n{}", id),
    }
}

fn node_decl(aig: &Aig, id: NodeId) -> String {
    let label = match aig.get_node(id) {
        Some(AigNode::Input(index)) => format!(" [label=\"i{}\"]", index),
        Some(AigNode::And { .. }) => " [label=\"\"]".to_string(),
        _ => String::new(),
    };
    format!("{}{}\n", graphviz_id(aig, id), label)
}

fn edge_decl(
    aig: &Aig,
    edge: AigEdge,
    to: &str,
    to_output: bool,
    style: &GraphvizStyle,
) -> String {
    let mut edge_style = GraphvizEdgeStyle::default();
    if edge.get_complement() {
        edge_style = edge_style + style.edge_complement.clone();
    }
    if to_output {
        edge_style = edge_style + style.edge_output.clone();
    }
    format!(
        "{} -> {} {}\n",
        graphviz_id(aig, edge.get_node_id()),
        to,
        edge_style
    )
}

impl Aig {
    /// Returns a DOT representation of the AIG.
    pub fn to_dot(&self, graphviz_style: GraphvizStyle) -> String {
        self.to_dot_highlighted(graphviz_style, &[])
    }

    /// Returns a DOT representation of the AIG, where the gates of `highlighted` get the
    /// `highlight` style.
    pub fn to_dot_highlighted(
        &self,
        graphviz_style: GraphvizStyle,
        highlighted: &[NodeId],
    ) -> String {
        let highlighted: HashSet<NodeId> = highlighted.iter().copied().collect();
        let mut decl_edges = String::new();

        // Creating different subgraphs for node declarations
        let mut decl_false_node_optional = String::new();
        let mut decl_inputs = format!("subgraph inputs {{\n node {}\n", graphviz_style.input);
        let mut decl_outputs = format!("subgraph outputs {{\n node {}\n", graphviz_style.output);
        let mut decl_ands = format!("subgraph ands {{\n node {}\n", graphviz_style.and);
        let mut decl_xors = format!("subgraph xors {{\n node {}\n", graphviz_style.xor);
        let mut decl_highlighted = String::new();

        // Adding artificial outputs to point to
        for (i, &output) in self.get_outputs().iter().enumerate() {
            let output_id = format!("out{}", i);
            decl_outputs.push_str(&format!(
                "{} [label=\"{}{}\"]\n",
                output_id,
                graphviz_style.output_prefix,
                1 + i
            ));
            decl_edges.push_str(&edge_decl(self, output, &output_id, true, &graphviz_style));
        }

        // DFS from outputs
        let mut dfs = Dfs::from_outputs(self);
        while let Some(id) = dfs.next(self) {
            match self.get_node(id) {
                Some(AigNode::False) => decl_false_node_optional.push_str(&format!(
                    "{} {}\n",
                    graphviz_id(self, id),
                    graphviz_style.cst_false
                )),
                Some(AigNode::Input(_)) => decl_inputs.push_str(&node_decl(self, id)),
                Some(AigNode::And { .. }) => decl_ands.push_str(&node_decl(self, id)),
                Some(AigNode::Xor { .. }) => decl_xors.push_str(&node_decl(self, id)),
                None => continue,
            }
            if highlighted.contains(&id) {
                decl_highlighted.push_str(&format!(
                    "{} {}\n",
                    graphviz_id(self, id),
                    graphviz_style.highlight
                ));
            }
            if let Some(fanins) = self.fanins(id) {
                let to = graphviz_id(self, id);
                for fanin in fanins {
                    decl_edges.push_str(&edge_decl(self, fanin, &to, false, &graphviz_style));
                }
            }
        }

        // Concatenating everything together
        format!(
            "
strict digraph {{
    rankdir=\"{}\"
    edge {}
    {}
    {}
    }}
    {}
    }}
    {}
    }}
    {}
    }}
    {}
    {}
}}",
            graphviz_style.rankdir,
            graphviz_style.edge_all,
            decl_false_node_optional,
            decl_inputs,
            decl_ands,
            decl_xors,
            decl_outputs,
            decl_highlighted,
            decl_edges
        )
    }
}

impl Miter {
    /// Returns a DOT representation of the miter, outputs being labelled with the
    /// `z` prefix unless the style says otherwise.
    pub fn to_dot(&self, mut graphviz_style: GraphvizStyle) -> String {
        if graphviz_style.output_prefix == DEFAULT_OUTPUT_PREFIX {
            graphviz_style.output_prefix = DEFAULT_MITER_OUTPUT_PREFIX.to_string();
        }
        self.get_aig().to_dot(graphviz_style)
    }
}

impl AdderBox {
    /// Returns a DOT representation of `aig`, the graph the box was derived from, with the sum
    /// and carry nodes of every adder of the box highlighted.
    pub fn to_dot(&self, aig: &Aig, graphviz_style: GraphvizStyle) -> String {
        let outputs: Vec<NodeId> = self
            .adders
            .iter()
            .flatten()
            .flat_map(|adder| [adder.sum, adder.carry])
            .collect();
        aig.to_dot_highlighted(graphviz_style, &outputs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::acec::{adder::AdderSet, cuts::CutParams, testing};

    fn half_adder() -> Aig {
        let mut aig = Aig::with_inputs(2);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();
        let sum = aig.new_xor(a, b).unwrap();
        let carry = aig.new_and(a, !b).unwrap();
        aig.add_output(sum).unwrap();
        aig.add_output(!carry).unwrap();
        aig
    }

    #[test]
    fn half_adder_to_dot_test() {
        let dot = half_adder().to_dot(GraphvizStyle::default());
        assert!(dot.contains("strict digraph"));
        assert!(dot.contains("i0 [label=\"i0\"]"));
        assert!(dot.contains("out1 [label=\"o2\"]"));
        assert!(dot.contains(DEFAULT_EDGE_COMPLEMENT_FORMAT));
        assert!(!dot.contains(DEFAULT_HIGHLIGHT_NODE_FORMAT));
    }

    #[test]
    fn miter_to_dot_test() {
        let aig = half_adder();
        let miter = Miter::new(&aig, &aig).unwrap();
        let dot = miter.to_dot(GraphvizStyle::default());
        assert!(dot.contains("out0 [label=\"z1\"]"));
    }

    #[test]
    fn box_to_dot_test() {
        let aig = testing::ripple_carry_adder(3, true);
        let set = AdderSet::detect(&aig, CutParams::default()).unwrap();
        let b = AdderBox::derive(&aig, &set, None).unwrap().unwrap();
        let dot = b.to_dot(&aig, GraphvizStyle::default());
        let sum = b.adders.iter().flatten().next().unwrap().sum;
        assert!(dot.contains(&format!("n{} {}", sum, DEFAULT_HIGHLIGHT_NODE_FORMAT)));
    }
}
