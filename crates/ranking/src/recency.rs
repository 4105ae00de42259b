//! Recency ranking

use crate::Scored;
use sanity_common::models::PaperMeta;
use std::collections::HashMap;

/// All documents, newest first, scored by age in days at `now`.
///
/// Equal timestamps are ordered by ascending pid. Documents dated in the
/// future score 0.
pub fn time_rank(metas: &HashMap<String, PaperMeta>, now: i64) -> Vec<Scored> {
    let mut entries: Vec<(&String, &PaperMeta)> = metas.iter().collect();
    entries.sort_by(|(pa, ma), (pb, mb)| mb.time.cmp(&ma.time).then_with(|| pa.cmp(pb)));

    entries
        .into_iter()
        .map(|(pid, meta)| Scored::new(pid.clone(), meta.age_days(now).max(0.0)))
        .collect()
}
