//! Single-or-many values produced by the markup tree.

/// A field that appeared once or several times under the same parent.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collapse into a sequence, preserving document order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> OneOrMany<U> {
        match self {
            OneOrMany::One(item) => OneOrMany::One(f(item)),
            OneOrMany::Many(items) => OneOrMany::Many(items.into_iter().map(&mut f).collect()),
        }
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        value.into_vec()
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_into_vec() {
        assert_eq!(OneOrMany::One(7).into_vec(), vec![7]);
    }

    #[test]
    fn test_many_preserves_order() {
        let many = OneOrMany::Many(vec!["a", "b", "c"]);
        assert_eq!(many.len(), 3);
        assert_eq!(many.first(), Some(&"a"));
        assert_eq!(many.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_map() {
        let doubled = OneOrMany::Many(vec![1, 2]).map(|x| x * 2);
        assert_eq!(doubled, OneOrMany::Many(vec![2, 4]));
        assert_eq!(OneOrMany::One(3).map(|x| x + 1), OneOrMany::One(4));
    }
}
