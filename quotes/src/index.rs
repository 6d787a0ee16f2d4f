use crate::domain::Quote;

/// In-memory quotes kept strictly ascending by id, without duplicates.
///
/// Lookups and insertion points both come from a binary search over the
/// backing `Vec`, so a single upsert never re-sorts the collection.
#[derive(Clone, Debug, Default)]
pub struct SortedQuoteIndex {
    quotes: Vec<Quote>,
}

impl SortedQuoteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted snapshot. The input is re-upserted, so an
    /// unordered or duplicated snapshot still yields a valid index.
    pub fn from_snapshot(quotes: Vec<Quote>) -> Self {
        let mut index = Self::new();
        index.bulk_upsert(quotes);
        index
    }

    /// `Ok(pos)` when `id` is present, `Err(pos)` with the insertion point otherwise.
    fn position(&self, id: u64) -> Result<usize, usize> {
        self.quotes.binary_search_by_key(&id, |quote| quote.id)
    }

    pub fn find(&self, id: u64) -> Option<&Quote> {
        self.position(id).ok().map(|pos| &self.quotes[pos])
    }

    /// Replace the entry with the same id, or insert at its sorted position.
    /// Returns `true` when a new entry was inserted.
    pub fn upsert(&mut self, quote: Quote) -> bool {
        match self.position(quote.id) {
            Ok(pos) => {
                self.quotes[pos] = quote;
                false
            }
            Err(pos) => {
                self.quotes.insert(pos, quote);
                true
            }
        }
    }

    /// Upsert every quote in order; for repeated ids the last one wins.
    pub fn bulk_upsert(&mut self, quotes: impl IntoIterator<Item = Quote>) {
        for quote in quotes {
            self.upsert(quote);
        }
    }

    pub fn snapshot(&self) -> Vec<Quote> {
        self.quotes.clone()
    }

    pub fn clear(&mut self) {
        self.quotes.clear();
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
