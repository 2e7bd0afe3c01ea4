use std::collections::HashMap;

use anyhow::Result;

use anchornet::{AnchorId, Registry, address};

pub(crate) fn cmd_resolve(addresses: &[String], base: Option<&str>) -> Result<()> {
    let mut registry: Registry = Registry::new();
    let mut first_seen: HashMap<AnchorId, &str> = HashMap::new();
    for input in addresses {
        let absolute = match base {
            Some(base) => address::resolve_relative(input, base),
            None => input.clone(),
        };
        let id = registry.find_address(&absolute);
        let normalized = registry.address(id).unwrap_or_default();
        match first_seen.get(&id) {
            Some(earlier) => println!("{id}\t{normalized}\t(same as `{earlier}`)"),
            None => {
                println!("{id}\t{normalized}");
                first_seen.insert(id, input.as_str());
            }
        }
    }
    Ok(())
}
