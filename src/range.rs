use std::fmt;

/// An inclusive span of byte offsets, `first..=last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub first: u64,
    pub last: u64,
}

impl ByteRange {
    pub fn new(first: u64, last: u64) -> Self {
        debug_assert!(last >= first, "ByteRange last ({last}) < first ({first})");
        Self { first, last }
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    /// Wire form of the `Range` request header, e.g. `bytes=0-99`.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}", self.first, self.last)
    }
}

/// Split `content_length` bytes into at most `parallelism` contiguous ranges.
///
/// The effective parallelism is clamped to `1..=content_length`, every range
/// gets `content_length / p` bytes and the remainder is folded entirely into
/// the last range.
///
/// A zero-length resource yields an empty plan rather than a single
/// partition: an inclusive `ByteRange` cannot be empty, and there is nothing
/// to request. Callers create an empty file without issuing any GET.
pub fn partition(content_length: u64, parallelism: usize) -> Vec<ByteRange> {
    if content_length == 0 {
        return Vec::new();
    }

    let p = (parallelism as u64).min(content_length).max(1);
    let base = content_length / p;

    let mut ranges = Vec::with_capacity(p as usize);
    for i in 0..p {
        let first = i * base;
        let last = (i + 1) * base - 1;
        ranges.push(ByteRange::new(first, last));
    }

    let remainder = content_length % p;
    if let Some(tail) = ranges.last_mut() {
        tail.last += remainder;
    }

    ranges
}
