use std::collections::BTreeMap;

/// Batch-local encoder tables built from sorted, unique, lowercased values
/// of the batch itself. Indices are stable across re-runs on the same
/// batch but not across batches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncoderTables {
    pub sources: BTreeMap<String, usize>,
    pub event_types: BTreeMap<String, usize>,
}

impl EncoderTables {
    pub fn build<'a>(
        sources: impl Iterator<Item = &'a str>,
        event_types: impl Iterator<Item = &'a str>,
    ) -> Self {
        Self {
            sources: index_sorted_unique(sources),
            event_types: index_sorted_unique(event_types),
        }
    }
}

fn index_sorted_unique<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let unique: std::collections::BTreeSet<String> = values.map(|v| v.to_string()).collect();
    unique
        .into_iter()
        .enumerate()
        .map(|(idx, value)| (value, idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_sorted_and_zero_based() {
        let tables = EncoderTables::build(["zeta", "alpha", "alpha"].into_iter(), std::iter::empty());
        assert_eq!(tables.sources.get("alpha"), Some(&0));
        assert_eq!(tables.sources.get("zeta"), Some(&1));
    }
}
