//! Fixed-size bit-vector over tag ids.

use super::tags::TagId;
use std::fmt;

const WORDS: usize = TagId::COUNT.div_ceil(64);

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TagSet {
    bits: [u64; WORDS],
}

impl TagSet {
    pub const EMPTY: TagSet = TagSet { bits: [0; WORDS] };

    pub fn from_tags(tags: &[TagId]) -> Self {
        let mut set = Self::EMPTY;
        for &tag in tags {
            set.insert(tag);
        }
        set
    }

    #[inline]
    pub fn insert(&mut self, tag: TagId) {
        let idx = tag.index();
        self.bits[idx / 64] |= 1 << (idx % 64);
    }

    #[inline]
    pub fn contains(&self, tag: TagId) -> bool {
        let idx = tag.index();
        self.bits[idx / 64] & (1 << (idx % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        TagId::ALL.iter().copied().filter(|tag| self.contains(*tag))
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(TagId::name)).finish()
    }
}

/// Opaque handle to a set registered in the [`Dtd`](super::Dtd).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagSetId(pub(crate) u16);

impl TagSetId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}
