//! Append-only character accumulator.
//!
//! The decoder copies field characters out of its working buffer whenever a
//! field cannot be referenced in place: it spans a refill, or it contains a
//! decoded escape. Raw-record capture uses a second accumulator the same way.
//! Capacity grows explicitly: by the current capacity, or by the requested
//! delta when that is larger, so long fields cost amortized constant time per
//! character.

/// Growable buffer of `char`s.
#[derive(Debug, Clone, Default)]
pub struct GrowableBuffer {
    chars: Vec<char>,
}

impl GrowableBuffer {
    /// Create an empty buffer without allocating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` characters.
    pub fn with_capacity(capacity: usize) -> Self {
        GrowableBuffer {
            chars: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.chars.capacity()
    }

    /// Append one character.
    #[inline]
    pub fn push(&mut self, c: char) {
        self.reserve(1);
        self.chars.push(c);
    }

    /// Append a run of characters.
    pub fn extend_from_slice(&mut self, chars: &[char]) {
        self.reserve(chars.len());
        self.chars.extend_from_slice(chars);
    }

    /// Remove and return the last character.
    #[inline]
    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop()
    }

    /// Forget the contents but keep the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.chars.clear();
    }

    /// Forget the contents and give the allocation back.
    pub fn release(&mut self) {
        self.chars = Vec::new();
    }

    #[inline]
    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }

    /// Iterate over the buffered characters.
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    fn reserve(&mut self, additional: usize) {
        let capacity = self.chars.capacity();
        if capacity - self.chars.len() >= additional {
            return;
        }
        let target = capacity + capacity.max(additional);
        self.chars.reserve_exact(target - self.chars.len());
    }
}
