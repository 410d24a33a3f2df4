//! Selection of the uploaded file among multipart fields.
//!
//! Clients disagree on the field name they use for the payload, so a fixed
//! priority list of accepted names is consulted. The first entry wins over
//! later ones regardless of the order fields arrive in.

/// Accepted file field names, highest priority first.
pub const DEFAULT_FILE_FIELDS: [&str; 2] = ["file", "image"];

/// Priority list of accepted file field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    accepted: Vec<String>,
}

impl FieldSelector {
    /// Create a selector from names ordered by decreasing priority.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Accepted names, highest priority first.
    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    /// Priority rank of `name` (0 is best), or `None` if it is not accepted.
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.accepted.iter().position(|accepted| accepted == name)
    }

    /// Pick the highest-priority accepted name out of `present`.
    pub fn select<'a, I>(&self, present: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        present
            .into_iter()
            .filter_map(|name| self.rank(name).map(|rank| (rank, name)))
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, name)| name)
    }
}

impl Default for FieldSelector {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_FIELDS)
    }
}

/// Best candidate seen so far while fields stream in.
///
/// Offering a better-ranked value displaces the current one, which is handed
/// back so the caller can discard it.
#[derive(Debug)]
pub struct Selection<T> {
    best: Option<(usize, T)>,
}

impl<T> Selection<T> {
    pub fn new() -> Self {
        Self { best: None }
    }

    /// Whether a value of this rank would replace the current one.
    pub fn wants(&self, rank: usize) -> bool {
        self.best.as_ref().map_or(true, |(current, _)| rank < *current)
    }

    /// Offer a value. Returns whichever value lost.
    pub fn offer(&mut self, rank: usize, value: T) -> Option<T> {
        if self.wants(rank) {
            self.best.replace((rank, value)).map(|(_, old)| old)
        } else {
            Some(value)
        }
    }

    /// True once the top-priority field has been taken; nothing can beat it.
    pub fn is_settled(&self) -> bool {
        matches!(self.best, Some((0, _)))
    }

    pub fn into_inner(self) -> Option<T> {
        self.best.map(|(_, value)| value)
    }
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::new()
    }
}
