//! Network equalization - carries gas along pipe networks.

use pipeworks_logic::transfer::equalize;

use crate::pipe_net::PipeGraph;

/// Pool the owned air of every network with two or more owned nodes and
/// share it back by volume. Environmental nodes take no part. Returns the
/// number of networks pooled.
pub fn equalize_networks(graph: &mut PipeGraph) -> usize {
    let mut pooled = 0;
    for (_, mut mixtures) in graph.owned_airs_by_net() {
        if mixtures.len() < 2 {
            continue;
        }
        equalize(&mut mixtures);
        pooled += 1;
    }
    pooled
}
