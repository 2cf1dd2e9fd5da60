//! Populate paths (`"Members.User.Profile"`) merged into a forest of named
//! nodes. Paths sharing a prefix share the prefix nodes; first-seen order is
//! kept at every level.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateNode {
    /// Declared relationship field name as written by the caller
    pub name: String,
    pub children: Vec<PopulateNode>,
}

impl PopulateNode {
    pub fn new(name: impl Into<String>) -> Self {
        PopulateNode {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Populate names match field names case-insensitively
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Deepest chain below and including this node
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(PopulateNode::depth).max().unwrap_or(0)
    }
}

pub fn build_populate_tree<I, S>(paths: I) -> Vec<PopulateNode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut roots = Vec::new();

    for path in paths {
        let mut level = &mut roots;
        for segment in path.as_ref().split('.').map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            level = &mut find_or_insert(level, segment).children;
        }
    }

    roots
}

fn find_or_insert<'a>(level: &'a mut Vec<PopulateNode>, segment: &str) -> &'a mut PopulateNode {
    let position = match level.iter().position(|node| node.matches(segment)) {
        Some(position) => position,
        None => {
            level.push(PopulateNode::new(segment));
            level.len() - 1
        }
    };
    &mut level[position]
}
