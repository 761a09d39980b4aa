//! Read-only lookup over the country → province → county hierarchy.

use serde::Serialize;
use shared::{
    domain::{find_by_name, LocationNode, SelectionPath, MAX_PATH_DEPTH},
    protocol::LocationData,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationTree {
    countries: Vec<LocationNode>,
}

/// The part of a path that still names locations in the tree, with the
/// matching node for each level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath<'a> {
    pub path: SelectionPath,
    pub nodes: Vec<&'a LocationNode>,
}

impl<'a> ResolvedPath<'a> {
    pub fn leaf(&self) -> Option<&'a LocationNode> {
        self.nodes.last().copied()
    }
}

/// Options offered at each level. `None` hides the picker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pickers {
    pub countries: Vec<String>,
    pub provinces: Option<Vec<String>>,
    pub counties: Option<Vec<String>>,
}

impl LocationTree {
    pub fn new(countries: Vec<LocationNode>) -> Self {
        Self { countries }
    }

    pub fn countries(&self) -> &[LocationNode] {
        &self.countries
    }

    pub fn find_country(&self, name: &str) -> Option<&LocationNode> {
        find_by_name(&self.countries, name)
    }

    /// Walks `path` by name. The first name missing at its level ends the
    /// walk and deeper names are dropped.
    pub fn resolve(&self, path: &SelectionPath) -> ResolvedPath<'_> {
        let mut nodes: Vec<&LocationNode> = Vec::with_capacity(MAX_PATH_DEPTH);
        for name in path.segments() {
            let candidates = match nodes.last() {
                Some(parent) => parent.children(),
                None => self.countries.as_slice(),
            };
            match find_by_name(candidates, name) {
                Some(node) => nodes.push(node),
                None => break,
            }
        }
        ResolvedPath {
            path: path.truncated(nodes.len()),
            nodes,
        }
    }

    pub fn pickers(&self, path: &SelectionPath) -> Pickers {
        let resolved = self.resolve(path);
        let options_under = |depth: usize| {
            resolved
                .nodes
                .get(depth)
                .filter(|node| node.has_children())
                .map(|node| names(node.children()))
        };
        Pickers {
            countries: names(&self.countries),
            provinces: options_under(0),
            counties: options_under(1),
        }
    }
}

impl From<LocationData> for LocationTree {
    fn from(data: LocationData) -> Self {
        Self::new(data.countries)
    }
}

fn names(nodes: &[LocationNode]) -> Vec<String> {
    nodes.iter().map(|node| node.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> LocationTree {
        LocationTree::new(vec![
            LocationNode::leaf("Alpha"),
            LocationNode::with_children(
                "US",
                vec![
                    LocationNode::with_children(
                        "New York",
                        vec![LocationNode::leaf("Kings"), LocationNode::leaf("Queens")],
                    ),
                    LocationNode::leaf("Guam"),
                ],
            ),
        ])
    }

    fn path(names: &[&str]) -> SelectionPath {
        SelectionPath::new(names.iter().copied()).expect("path")
    }

    #[test]
    fn resolves_full_path_by_name() {
        let tree = sample_tree();
        let resolved = tree.resolve(&path(&["US", "New York", "Queens"]));
        assert_eq!(resolved.path.len(), 3);
        assert_eq!(resolved.leaf().map(|n| n.name.as_str()), Some("Queens"));
    }

    #[test]
    fn unknown_name_truncates_walk() {
        let tree = sample_tree();
        let resolved = tree.resolve(&path(&["US", "Ohio", "Kings"]));
        assert_eq!(resolved.path.segments(), ["US"]);
        assert!(tree.resolve(&path(&["Nowhere"])).path.is_empty());
    }

    #[test]
    fn resolution_ignores_list_position() {
        let mut tree = sample_tree();
        tree.countries.insert(0, LocationNode::leaf("Aardvark"));
        let resolved = tree.resolve(&path(&["US", "Guam"]));
        assert_eq!(resolved.path.segments(), ["US", "Guam"]);
    }

    #[test]
    fn pickers_hide_levels_without_children() {
        let tree = sample_tree();
        let pickers = tree.pickers(&path(&["Alpha"]));
        assert_eq!(pickers.countries, ["Alpha", "US"]);
        assert_eq!(pickers.provinces, None);
        assert_eq!(pickers.counties, None);

        let pickers = tree.pickers(&path(&["US", "New York"]));
        assert_eq!(
            pickers.provinces,
            Some(vec!["New York".to_string(), "Guam".to_string()])
        );
        assert_eq!(
            pickers.counties,
            Some(vec!["Kings".to_string(), "Queens".to_string()])
        );

        assert_eq!(tree.pickers(&path(&["US", "Guam"])).counties, None);
    }
}
