//! Flattens the parser's per-interface implementation records into the
//! report list, attaching the owning interface as a back-reference on a
//! defensive copy.

use srcgraph_core::{Implementation, ParseResult};

pub fn collect_implementations(result: &ParseResult) -> Vec<Implementation> {
    let mut collected = Vec::new();
    for iface in &result.interfaces {
        for implementation in &iface.implementations {
            let mut copy = implementation.clone();
            copy.interface = Some(iface.interface_ref());
            collected.push(copy);
        }
    }
    collected
}
