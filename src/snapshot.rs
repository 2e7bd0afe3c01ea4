//! Serializable view of the anchor graph, for inspection and debugging.

use serde::Serialize;

use crate::anchor::AnchorId;
use crate::link::{Link, LinkResult, LinkType, Method};
use crate::registry::Registry;

#[derive(Clone, Debug, Serialize)]
pub struct GraphSnapshot {
    pub anchors: Vec<ParentSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParentSnapshot {
    pub id: String,
    pub address: String,
    pub loaded: bool,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildSnapshot>,
    /// Addresses of the anchors linking here, one per edge.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChildSnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LinkSnapshot {
    pub dest: String,
    pub main: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    pub method: Method,
    pub result: LinkResult,
}

impl<D> Registry<D> {
    /// Capture every parent, its children and their edges, ordered by address.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut anchors: Vec<ParentSnapshot> = self
            .parents()
            .filter_map(|id| self.parent_snapshot(id))
            .collect();
        anchors.sort_by(|a, b| a.address.cmp(&b.address));
        GraphSnapshot { anchors }
    }

    fn parent_snapshot(&self, id: AnchorId) -> Option<ParentSnapshot> {
        let meta = self.meta(id)?;
        Some(ParentSnapshot {
            id: id.to_string(),
            address: self.address(id)?,
            loaded: self.document(id).is_some(),
            content_type: meta.content_type().to_string(),
            title: meta.title().map(str::to_string),
            links: self.link_snapshots(id),
            children: self
                .children(id)
                .map(|child| ChildSnapshot {
                    id: child.to_string(),
                    tag: self.tag(child).map(str::to_string),
                    links: self.link_snapshots(child),
                })
                .collect(),
            sources: self
                .sources(id)
                .iter()
                .map(|src| self.address(*src).unwrap_or_else(|| src.to_string()))
                .collect(),
        })
    }

    fn link_snapshots(&self, id: AnchorId) -> Vec<LinkSnapshot> {
        let main = self.main_link(id).map(|l| self.link_snapshot(l, true));
        main.into_iter()
            .chain(self.secondary_links(id).map(|l| self.link_snapshot(l, false)))
            .collect()
    }

    fn link_snapshot(&self, link: &Link, main: bool) -> LinkSnapshot {
        LinkSnapshot {
            dest: self
                .address(link.dest)
                .unwrap_or_else(|| link.dest.to_string()),
            main,
            link_type: link.link_type.clone(),
            method: link.method,
            result: link.result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn snapshot_lists_edges_and_sources() -> Result<()> {
        let mut reg: Registry<()> = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b#s");
        reg.link(a, b, Some("next".into()), Method::Get);
        reg.set_document(a, ());

        let snap = reg.snapshot();
        assert_eq!(snap.anchors.len(), 2);
        assert_eq!(snap.anchors[0].address, "http://h/a");
        assert!(snap.anchors[0].loaded);
        assert_eq!(snap.anchors[0].links[0].dest, "http://h/b#s");
        assert_eq!(snap.anchors[1].sources, vec!["http://h/a".to_string()]);
        assert_eq!(snap.anchors[1].children[0].tag.as_deref(), Some("s"));

        let json = serde_json::to_value(&snap)?;
        assert_eq!(json["anchors"][0]["links"][0]["type"], "next");
        assert_eq!(json["anchors"][0]["links"][0]["method"], "GET");
        assert_eq!(json["anchors"][0]["links"][0]["result"], "invalid");
        Ok(())
    }
}
