//! Property-based test generators using proptest.
//!
//! Provides strategies for part sets that satisfy (or deliberately break)
//! the constraints a segment enforces.

use objstore_segment::{Part, PartPolicy};
use proptest::prelude::*;

/// Strategy for small policies that keep generated objects cheap.
pub fn policy_strategy() -> impl Strategy<Value = PartPolicy> {
    (1u64..64, 0u64..64, 0u32..3).prop_map(|(min, extra, first)| {
        PartPolicy::new()
            .min_size(min)
            .max_size(min + extra)
            .first_index(first)
    })
}

/// Strategy for the parts of one complete object under `policy`, in index
/// order: full-sized parts followed by a tail of any valid size.
pub fn complete_parts_strategy(
    policy: PartPolicy,
    max_parts: usize,
) -> impl Strategy<Value = Vec<Part>> {
    let body_size = policy.min_size..=policy.max_size;
    let tail_size = 1..=policy.max_size;

    (0..max_parts.max(1)).prop_flat_map(move |body_len| {
        (
            prop::collection::vec(body_size.clone(), body_len),
            tail_size.clone(),
        )
            .prop_map(move |(body, tail)| {
                let mut parts: Vec<Part> = body
                    .into_iter()
                    .chain(std::iter::once(tail))
                    .enumerate()
                    .map(|(n, size)| Part::new(policy.first_index + n as u32, size))
                    .collect();
                parts.sort_by_key(|p| p.index);
                parts
            })
    })
}

/// Strategy for a complete object's parts in arbitrary arrival order.
pub fn shuffled_parts_strategy(
    policy: PartPolicy,
    max_parts: usize,
) -> impl Strategy<Value = Vec<Part>> {
    complete_parts_strategy(policy, max_parts).prop_shuffle()
}

/// Strategy for a policy together with a shuffled complete object.
pub fn upload_strategy(max_parts: usize) -> impl Strategy<Value = (PartPolicy, Vec<Part>)> {
    policy_strategy().prop_flat_map(move |policy| {
        (Just(policy), shuffled_parts_strategy(policy, max_parts))
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_segment::Segment;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_parts_respect_policy((policy, parts) in upload_strategy(12)) {
            let mut sorted = parts.clone();
            sorted.sort_by_key(|p| p.index);

            prop_assert_eq!(sorted[0].index, policy.first_index);
            for (n, part) in sorted.iter().enumerate() {
                prop_assert!(part.size >= 1 && part.size <= policy.max_size);
                if n + 1 < sorted.len() {
                    prop_assert!(part.size >= policy.min_size);
                }
            }
        }

        #[test]
        fn generated_uploads_fulfill_segments((policy, parts) in upload_strategy(12)) {
            let segment = Segment::new("gen", policy);
            segment.initiate("gen").unwrap();
            for part in parts {
                segment.insert_part(part).unwrap();
            }
            prop_assert!(segment.fulfilled().unwrap());
        }
    }
}
