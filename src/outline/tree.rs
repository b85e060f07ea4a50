//! The nested outline: headings with their content, images and children.

use super::tracker::PATH_SEPARATOR;
use serde::{Deserialize, Serialize};

/// Inferred outline of one SOP document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// SOP identifier
    pub sop_id: String,
    /// SOP display name
    pub sop_name: String,
    /// Top-level sections
    pub sections: Vec<HeadingNode>,
}

/// One heading in the outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingNode {
    /// Numbered title
    pub title: String,
    /// Heading level
    pub level: u8,
    /// Title followed by the paragraphs and tables under it
    #[serde(default)]
    pub content: Vec<String>,
    /// Image files bound to this heading
    #[serde(default)]
    pub images: Vec<String>,
    /// Nested headings
    #[serde(default)]
    pub subsections: Vec<HeadingNode>,
}

/// One retrieval record produced by flattening an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    /// Non-empty node content joined by newlines
    pub text: String,
    /// SOP identifier
    pub sop_id: String,
    /// SOP display name
    pub sop_name: String,
    /// Titles from the root to the node
    pub section_path: String,
    /// Image files of the node
    pub image_filenames: Vec<String>,
}

impl Outline {
    /// Total number of headings.
    pub fn heading_count(&self) -> usize {
        fn count(nodes: &[HeadingNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.subsections)).sum()
        }
        count(&self.sections)
    }

    /// Depth-first list of nodes with their section paths.
    pub fn walk(&self) -> Vec<(String, &HeadingNode)> {
        fn visit<'n>(nodes: &'n [HeadingNode], parent: &str, out: &mut Vec<(String, &'n HeadingNode)>) {
            for node in nodes {
                let path = if parent.is_empty() {
                    node.title.clone()
                } else {
                    format!("{}{}{}", parent, PATH_SEPARATOR, node.title)
                };
                out.push((path.clone(), node));
                visit(&node.subsections, &path, out);
            }
        }
        let mut out = Vec::new();
        visit(&self.sections, "", &mut out);
        out
    }

    /// One record per node that has content, depth-first.
    pub fn flatten(&self) -> Vec<FlatRecord> {
        self.walk()
            .into_iter()
            .filter_map(|(path, node)| {
                let text = node
                    .content
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    return None;
                }
                Some(FlatRecord {
                    text,
                    sop_id: self.sop_id.trim().to_string(),
                    sop_name: self.sop_name.trim().to_string(),
                    section_path: path,
                    image_filenames: node.images.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct ArenaNode {
    node: HeadingNode,
    children: Vec<usize>,
}

/// Flat storage for headings while the outline is being built.
///
/// Children are always added after their parent, so indices only grow
/// from root to leaf.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutlineArena {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
}

impl OutlineArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a heading under `parent`; returns its index.
    pub(crate) fn add(&mut self, parent: Option<usize>, title: &str, level: u8) -> usize {
        let index = self.nodes.len();
        self.nodes.push(ArenaNode {
            node: HeadingNode {
                title: title.to_string(),
                level,
                ..HeadingNode::default()
            },
            children: Vec::new(),
        });
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    pub(crate) fn push_content(&mut self, index: usize, text: &str) {
        if let Some(n) = self.nodes.get_mut(index) {
            n.node.content.push(text.to_string());
        }
    }

    pub(crate) fn push_image(&mut self, index: usize, filename: &str) {
        if let Some(n) = self.nodes.get_mut(index) {
            n.node.images.push(filename.to_string());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Assemble the nested sections.
    pub(crate) fn into_sections(self) -> Vec<HeadingNode> {
        let mut built: Vec<Option<HeadingNode>> = vec![None; self.nodes.len()];
        for (index, arena) in self.nodes.into_iter().enumerate().rev() {
            let mut node = arena.node;
            node.subsections = arena
                .children
                .iter()
                .filter_map(|c| built.get_mut(*c).and_then(Option::take))
                .collect();
            built[index] = Some(node);
        }
        self.roots
            .iter()
            .filter_map(|r| built.get_mut(*r).and_then(Option::take))
            .collect()
    }
}
