//! Clips and clip groups
//!
//! A clip group is a set of interchangeable clip alternatives. Each call to
//! [`ClipGroup::next_clip`] picks one according to the group's
//! [`SequenceMode`] and remembers the pick for the next call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reference to a preloaded clip
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipRef {
    name: Arc<str>,
    length: Duration,
}

impl ClipRef {
    pub fn new(name: impl Into<Arc<str>>, length: Duration) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nominal length at pitch 1.0
    pub fn length(&self) -> Duration {
        self.length
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// How a clip group picks its next clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceMode {
    /// Uniform pick, repeats allowed
    Random,

    /// Uniform pick that never repeats the previous clip
    #[default]
    RandomNoImmediateRepeat,

    /// In order, wrapping around
    Sequential,
}

#[derive(Debug, Clone)]
pub struct ClipGroup {
    sequence_mode: SequenceMode,
    clips: Vec<ClipRef>,
    last_selected: Option<usize>,
}

impl ClipGroup {
    /// Create a group. Emptiness is rejected when the owning cue is built.
    pub fn new(sequence_mode: SequenceMode, clips: Vec<ClipRef>) -> Self {
        Self {
            sequence_mode,
            clips,
            last_selected: None,
        }
    }

    pub fn sequence_mode(&self) -> SequenceMode {
        self.sequence_mode
    }

    pub fn clips(&self) -> &[ClipRef] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Index picked by the previous call, if any
    pub fn last_selected(&self) -> Option<usize> {
        self.last_selected
    }

    /// Choose the next clip and advance the selection cursor.
    ///
    /// The group must not be empty.
    pub fn next_clip<R: Rng>(&mut self, rng: &mut R) -> ClipRef {
        let index = self.next_index(rng);
        self.clips[index].clone()
    }

    fn next_index<R: Rng>(&mut self, rng: &mut R) -> usize {
        let len = self.clips.len();

        // Single clip: nothing to choose
        if len == 1 {
            return 0;
        }

        let index = match (self.last_selected, self.sequence_mode) {
            (None, SequenceMode::Sequential) => 0,
            (None, _) => rng.gen_range(0..len),
            (Some(_), SequenceMode::Random) => rng.gen_range(0..len),
            (Some(last), SequenceMode::RandomNoImmediateRepeat) => loop {
                let candidate = rng.gen_range(0..len);
                if candidate != last {
                    break candidate;
                }
            },
            (Some(last), SequenceMode::Sequential) => (last + 1) % len,
        };

        self.last_selected = Some(index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clips(names: &[&str]) -> Vec<ClipRef> {
        names
            .iter()
            .map(|n| ClipRef::new(*n, Duration::from_millis(500)))
            .collect()
    }

    #[test]
    fn test_single_clip_always_selected() {
        let mut rng = StdRng::seed_from_u64(7);
        for mode in [
            SequenceMode::Random,
            SequenceMode::RandomNoImmediateRepeat,
            SequenceMode::Sequential,
        ] {
            let mut group = ClipGroup::new(mode, clips(&["only"]));
            for _ in 0..5 {
                assert_eq!(group.next_clip(&mut rng).name(), "only");
            }
        }
    }

    #[test]
    fn test_sequential_cycles_from_first() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut group = ClipGroup::new(SequenceMode::Sequential, clips(&["a", "b", "c"]));

        let picked: Vec<String> = (0..7)
            .map(|_| group.next_clip(&mut rng).name().to_string())
            .collect();

        assert_eq!(picked, ["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_no_immediate_repeat() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut group = ClipGroup::new(
            SequenceMode::RandomNoImmediateRepeat,
            clips(&["a", "b"]),
        );

        let mut previous = group.next_clip(&mut rng);
        for _ in 0..200 {
            let next = group.next_clip(&mut rng);
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_random_covers_all_clips() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut group = ClipGroup::new(SequenceMode::Random, clips(&["a", "b", "c", "d"]));

        let mut seen = [false; 4];
        for _ in 0..500 {
            group.next_clip(&mut rng);
            seen[group.last_selected().unwrap()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_random_first_pick_sets_cursor() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut group = ClipGroup::new(SequenceMode::Random, clips(&["a", "b", "c"]));
        assert_eq!(group.last_selected(), None);

        group.next_clip(&mut rng);
        assert!(group.last_selected().is_some());
    }

    #[test]
    fn test_sequence_mode_serde_names() {
        let mode: SequenceMode = serde_json::from_str("\"random_no_immediate_repeat\"").unwrap();
        assert_eq!(mode, SequenceMode::RandomNoImmediateRepeat);
        assert_eq!(
            serde_json::to_string(&SequenceMode::Sequential).unwrap(),
            "\"sequential\""
        );
    }
}
