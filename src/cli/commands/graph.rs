use anyhow::{Result, bail};

use anchornet::{LinkType, Method, Registry};

pub(crate) struct GraphPlan<'a> {
    pub(crate) links: &'a [String],
    pub(crate) link_type: Option<&'a str>,
    pub(crate) method: &'a str,
    pub(crate) loaded: &'a [String],
    pub(crate) delete: &'a [String],
    pub(crate) delete_all: bool,
}

pub(crate) fn cmd_graph(plan: &GraphPlan<'_>) -> Result<()> {
    let method = Method::from_atom(plan.method)?;
    let edges = parse_edges(plan.links)?;

    let mut registry: Registry<String> = Registry::new();
    for (src, dest) in &edges {
        let src_id = registry.find_address(src);
        let dest_id = registry.find_address(dest);
        registry.link(src_id, dest_id, plan.link_type.map(LinkType::from), method);
    }
    for addr in plan.loaded {
        let id = registry.find_address(addr);
        registry.set_document(id, format!("document for {addr}"));
    }
    for addr in plan.delete {
        let id = registry.find_address(addr);
        if registry.delete(id) {
            eprintln!("deleted `{addr}`");
        } else {
            eprintln!("kept `{addr}`");
        }
    }
    if plan.delete_all {
        let documents = registry.delete_all();
        eprintln!("cleared registry, released {} document(s)", documents.len());
    }

    let snapshot = registry.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn parse_edges(entries: &[String]) -> Result<Vec<(&str, &str)>> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some((src, dest)) = entry.split_once('=') else {
            bail!("invalid link `{entry}`; expected SRC=DEST");
        };
        let (src, dest) = (src.trim(), dest.trim());
        if src.is_empty() || dest.is_empty() {
            bail!("link endpoints cannot be empty in `{entry}`");
        }
        out.push((src, dest));
    }
    Ok(out)
}
