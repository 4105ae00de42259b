//! Random ranking for novelty browsing

use crate::Scored;
use rand::seq::SliceRandom;
use rand::Rng;
use sanity_common::models::PaperMeta;
use std::collections::HashMap;

/// Every document in a uniformly shuffled order, each scored 0.
///
/// Ids are sorted before shuffling so a seeded generator reproduces the
/// same order regardless of map iteration order.
pub fn random_rank<R: Rng + ?Sized>(metas: &HashMap<String, PaperMeta>, rng: &mut R) -> Vec<Scored> {
    let mut pids: Vec<&String> = metas.keys().collect();
    pids.sort();
    pids.shuffle(rng);
    pids.into_iter().map(|pid| Scored::new(pid.clone(), 0.0)).collect()
}
